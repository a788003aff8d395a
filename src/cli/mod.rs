//! Command-line interface for learnshelf.
//!
//! Provides commands for adding, editing, listing and organizing the
//! content library, plus the theme preference and a config dump.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{self, LibrarySettings};
use crate::library::validate::field;
use crate::library::{
    extract, prefill, BlobDir, ContentId, ContentItem, ContentStore, ContentType, DataUrlReader,
    EditingContext, ExternalKind, FileReader, FilterSpec, LibraryError, Payload, PdfStorage,
    RawFields, SortSpec, Theme, Validator,
};
use crate::storage::FileStorage;

/// learnshelf - Organize videos, playlists, PDFs and notes for studying
#[derive(Parser, Debug)]
#[command(name = "learnshelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add an item to the library
    Add {
        #[command(subcommand)]
        item: AddCommands,
    },

    /// Edit an existing item (unspecified fields keep their values)
    Edit {
        /// Content ID
        id: ContentId,

        /// New YouTube URL (videos and playlists)
        #[arg(long)]
        url: Option<String>,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        /// Replacement PDF file (required when editing a PDF)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// New article body
        #[arg(long)]
        content: Option<String>,
    },

    /// List items in the library
    List {
        /// Case-insensitive title search
        #[arg(short, long)]
        search: Option<String>,

        /// Exact category
        #[arg(short, long)]
        category: Option<String>,

        /// Only favorites
        #[arg(short, long)]
        favorites: bool,

        /// Sort order (defaults to the configured one)
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Maximum number of items to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show details of an item
    Show {
        /// Content ID
        id: ContentId,
    },

    /// Delete an item
    Delete {
        /// Content ID
        id: ContentId,
    },

    /// Toggle the favorite flag of an item
    Fav {
        /// Content ID
        id: ContentId,
    },

    /// Move items to the front, in the given order
    Reorder {
        /// Content IDs in their new order
        #[arg(required = true)]
        ids: Vec<ContentId>,
    },

    /// Show library counters
    Stats,

    /// List categories in use
    Categories,

    /// Show or change the theme
    Theme {
        #[arg(value_enum)]
        action: Option<ThemeArg>,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Subcommand, Debug)]
pub enum AddCommands {
    /// YouTube video or playlist
    Video {
        /// YouTube URL
        url: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// PDF document
    Pdf {
        /// Path to the PDF
        file: PathBuf,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Text article
    Article {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        category: String,

        /// Article body
        #[arg(long)]
        content: String,
    },
}

/// Sort order for CLI (maps to SortSpec)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Newest,
    Oldest,
    FavoriteFirst,
}

impl From<SortArg> for SortSpec {
    fn from(s: SortArg) -> Self {
        match s {
            SortArg::Newest => SortSpec::Newest,
            SortArg::Oldest => SortSpec::Oldest,
            SortArg::FavoriteFirst => SortSpec::FavoriteFirst,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
    Toggle,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Add { item } => add_content(item).await,
            Commands::Edit {
                id,
                url,
                title,
                category,
                file,
                content,
            } => {
                let overrides = RawFields::new();
                let overrides = set_opt(overrides, field::URL, url);
                let overrides = set_opt(overrides, field::TITLE, title);
                let overrides = set_opt(overrides, field::CATEGORY, category);
                let overrides = set_opt(
                    overrides,
                    field::FILE,
                    file.map(|p| p.display().to_string()),
                );
                let overrides = set_opt(overrides, field::CONTENT, content);
                edit_content(id, overrides).await
            }
            Commands::List {
                search,
                category,
                favorites,
                sort,
                limit,
            } => {
                let filter = FilterSpec::new()
                    .with_search(search.unwrap_or_default())
                    .with_category(category.unwrap_or_default())
                    .favorites_only(favorites);
                list_content(filter, sort.map(SortSpec::from), limit)
            }
            Commands::Show { id } => show_content(id),
            Commands::Delete { id } => delete_content(id),
            Commands::Fav { id } => toggle_favorite(id),
            Commands::Reorder { ids } => reorder_content(&ids),
            Commands::Stats => show_stats(),
            Commands::Categories => list_categories(),
            Commands::Theme { action } => change_theme(action),
            Commands::Config => show_config(),
        }
    }
}

fn set_opt(fields: RawFields, key: &str, value: Option<String>) -> RawFields {
    match value {
        Some(v) => fields.with(key, v),
        None => fields,
    }
}

fn settings() -> Result<LibrarySettings> {
    Ok(config::config()?.library)
}

/// Open the library at the configured location
fn open_store() -> Result<ContentStore<FileStorage>> {
    let cfg = config::config()?;
    let storage = FileStorage::open(cfg.storage_dir()).with_context(|| {
        format!("Failed to open storage at {}", cfg.storage_dir().display())
    })?;
    Ok(ContentStore::new(storage).with_releaser(BlobDir::new(cfg.blob_dir())))
}

fn file_reader() -> Result<Box<dyn FileReader>> {
    let cfg = config::config()?;
    Ok(match cfg.library.pdf_storage {
        PdfStorage::Inline => Box::new(DataUrlReader),
        PdfStorage::Blob => Box::new(BlobDir::new(cfg.blob_dir())),
    })
}

/// Validate, read any selected file, then persist
async fn save(ctx: &EditingContext, fields: &RawFields) -> Result<ContentItem> {
    let validator = Validator::new(settings()?.schema);
    let valid = validator.validate(ctx, fields)?;

    let reader = file_reader()?;
    let draft = valid
        .materialize(reader.as_ref())
        .await
        .context("Failed to read selected file")?;

    let mut store = open_store()?;
    Ok(store.submit(ctx, draft)?)
}

async fn add_content(item: AddCommands) -> Result<()> {
    let (ctx, fields) = match item {
        AddCommands::Video {
            url,
            title,
            category,
        } => {
            // Playlist vs video is decided by the URL; validation checks it again
            let content_type = match extract(&url) {
                Some(r) if r.kind == ExternalKind::Playlist => ContentType::Playlist,
                _ => ContentType::Video,
            };
            let fields = RawFields::new().with(field::URL, url);
            let fields = set_opt(fields, field::TITLE, title);
            let fields = set_opt(fields, field::CATEGORY, category);
            (EditingContext::create(content_type), fields)
        }
        AddCommands::Pdf {
            file,
            title,
            category,
        } => {
            let fields = RawFields::new().with(field::FILE, file.display().to_string());
            let fields = set_opt(fields, field::TITLE, title);
            let fields = set_opt(fields, field::CATEGORY, category);
            (EditingContext::create(ContentType::Pdf), fields)
        }
        AddCommands::Article {
            title,
            category,
            content,
        } => (
            EditingContext::create(ContentType::Article),
            RawFields::new()
                .with(field::TITLE, title)
                .with(field::CATEGORY, category)
                .with(field::CONTENT, content),
        ),
    };

    let item = save(&ctx, &fields).await?;
    println!("Added {} {}: {}", item.content_type(), item.id, item.title);
    Ok(())
}

async fn edit_content(id: ContentId, overrides: RawFields) -> Result<()> {
    let existing = match open_store()?.get(id) {
        Ok(item) => item,
        Err(e) if e.is_not_found() => {
            println!("No item with ID {}", id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let (ctx, mut fields) = prefill(&existing);
    fields.merge(&overrides);

    match save(&ctx, &fields).await {
        Ok(item) => {
            println!("Updated {} {}: {}", item.content_type(), item.id, item.title);
            Ok(())
        }
        Err(e) => match e.downcast_ref::<LibraryError>() {
            Some(LibraryError::NotFound(_)) => {
                println!("No item with ID {}", id);
                Ok(())
            }
            _ => Err(e),
        },
    }
}

/// Truncate to `max` characters, marking the cut with "..."
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}

fn list_content(filter: FilterSpec, sort: Option<SortSpec>, limit: usize) -> Result<()> {
    let sort = match sort {
        Some(s) => s,
        None => settings()?.default_sort,
    };
    let store = open_store()?;
    let items = store.view(&filter, sort);

    if items.is_empty() {
        if store.stats().total == 0 {
            println!("Library is empty. Use 'learnshelf add' to add content.");
        } else {
            println!("No items match.");
        }
        return Ok(());
    }

    println!(
        "{:<15} {:<9} {:<2} {:<20} {:<40}",
        "ID", "TYPE", "", "CATEGORY", "TITLE"
    );
    println!("{}", "-".repeat(90));

    for item in items.iter().take(limit) {
        println!(
            "{:<15} {:<9} {:<2} {:<20} {:<40}",
            item.id.to_string(),
            item.content_type().to_string(),
            if item.favorite { "*" } else { "" },
            truncate(&item.category, 20),
            truncate(&item.title, 40)
        );
    }

    if items.len() > limit {
        println!("\nShowing {} of {} items", limit, items.len());
    } else {
        println!("\nTotal: {} items", items.len());
    }

    Ok(())
}

fn show_content(id: ContentId) -> Result<()> {
    let item = match open_store()?.get(id) {
        Ok(item) => item,
        Err(e) if e.is_not_found() => {
            println!("No item with ID {}", id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("ID:       {}", item.id);
    println!("Type:     {}", item.content_type());
    println!("Title:    {}", item.title);
    println!("Category: {}", item.category);
    println!("Favorite: {}", if item.favorite { "yes" } else { "no" });
    println!("Created:  {}", item.created_at.format("%Y-%m-%d %H:%M:%S UTC"));

    if let Some(url) = item.source_url() {
        println!("URL:      {}", url);
    }
    if let Some(embed) = item.embed_url() {
        println!("Embed:    {}", embed);
    }

    match &item.payload {
        Payload::Pdf { data } => match item.payload.transient_reference() {
            Some(reference) => {
                let blob = BlobDir::new(config::config()?.blob_dir());
                match blob.resolve(reference) {
                    Ok(path) => println!("File:     {}", path.display()),
                    Err(_) => println!("File:     {} (unresolvable)", reference),
                }
            }
            None => println!("File:     inline ({} bytes encoded)", data.len()),
        },
        Payload::Article { content } => {
            println!();
            println!("{}", content);
        }
        Payload::Video { .. } | Payload::Playlist { .. } => {}
    }

    Ok(())
}

fn delete_content(id: ContentId) -> Result<()> {
    match open_store()?.delete(id) {
        Ok(item) => println!("Deleted {} {}: {}", item.content_type(), item.id, item.title),
        Err(e) if e.is_not_found() => println!("No item with ID {}", id),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn toggle_favorite(id: ContentId) -> Result<()> {
    match open_store()?.toggle_favorite(id) {
        Ok(item) if item.favorite => println!("Favorited: {}", item.title),
        Ok(item) => println!("Unfavorited: {}", item.title),
        Err(e) if e.is_not_found() => println!("No item with ID {}", id),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn reorder_content(ids: &[ContentId]) -> Result<()> {
    let items = open_store()?.reorder(ids)?;
    for (pos, item) in items.iter().enumerate() {
        println!("{:>3}. {:<15} {}", pos + 1, item.id.to_string(), item.title);
    }
    Ok(())
}

fn show_stats() -> Result<()> {
    let store = open_store()?;
    let stats = store.stats();
    println!("Total:      {}", stats.total);
    println!("Favorites:  {}", stats.favorites);
    println!("Categories: {}", store.categories().len());
    Ok(())
}

fn list_categories() -> Result<()> {
    let categories = open_store()?.categories();
    if categories.is_empty() {
        println!("No categories yet.");
    }
    for category in categories {
        println!("{}", category);
    }
    Ok(())
}

fn change_theme(action: Option<ThemeArg>) -> Result<()> {
    let mut store = open_store()?;
    let theme = match action {
        None => store.theme(),
        Some(ThemeArg::Toggle) => store.toggle_theme()?,
        Some(ThemeArg::Light) => {
            store.set_theme(Theme::Light)?;
            Theme::Light
        }
        Some(ThemeArg::Dark) => {
            store.set_theme(Theme::Dark)?;
            Theme::Dark
        }
    };
    println!("Theme: {}", theme);
    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("learnshelf configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:    {}", cfg.home.display());
    println!("  Storage: {}", cfg.storage_dir().display());
    println!("  Blobs:   {}", cfg.blob_dir().display());
    println!();
    println!("Library:");
    println!("  Schema:       {:?}", cfg.library.schema);
    println!("  PDF storage:  {:?}", cfg.library.pdf_storage);
    println!("  Default sort: {}", cfg.library.default_sort);

    Ok(())
}
