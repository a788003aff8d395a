//! Filtering, sorting and summaries over a content collection.
//!
//! Everything here is pure: inputs are borrowed or consumed, outputs are new
//! vectors, and storage is never touched.

use serde::{Deserialize, Serialize};

use super::content::ContentItem;

/// Which items are visible
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Case-insensitive title substring; empty matches everything
    pub search: String,

    /// Exact category; empty matches everything
    pub category: String,

    pub favorites_only: bool,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn favorites_only(mut self, favorites_only: bool) -> Self {
        self.favorites_only = favorites_only;
        self
    }

    /// All three predicates must hold
    pub fn matches(&self, item: &ContentItem) -> bool {
        (self.search.is_empty()
            || item
                .title
                .to_lowercase()
                .contains(&self.search.to_lowercase()))
            && (self.category.is_empty() || item.category == self.category)
            && (!self.favorites_only || item.favorite)
    }
}

/// Display order of the view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortSpec {
    #[default]
    Newest,
    Oldest,
    /// Favorites first, newest first within each group
    FavoriteFirst,
}

impl std::fmt::Display for SortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortSpec::Newest => write!(f, "newest"),
            SortSpec::Oldest => write!(f, "oldest"),
            SortSpec::FavoriteFirst => write!(f, "favorite-first"),
        }
    }
}

impl std::str::FromStr for SortSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Ok(SortSpec::Newest),
            "oldest" => Ok(SortSpec::Oldest),
            "favorite-first" | "favorites" | "favorite" => Ok(SortSpec::FavoriteFirst),
            _ => anyhow::bail!("Unknown sort order: {}", s),
        }
    }
}

/// Keep the items matching `spec`, in their stored order
pub fn filter(items: &[ContentItem], spec: &FilterSpec) -> Vec<ContentItem> {
    items.iter().filter(|item| spec.matches(item)).cloned().collect()
}

/// Stable sort; ties keep their input order
pub fn sort(mut items: Vec<ContentItem>, spec: SortSpec) -> Vec<ContentItem> {
    match spec {
        SortSpec::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortSpec::Oldest => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortSpec::FavoriteFirst => items.sort_by(|a, b| {
            b.favorite
                .cmp(&a.favorite)
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
    }
    items
}

/// Filter, then sort what is left
pub fn view(items: &[ContentItem], filter_spec: &FilterSpec, sort_spec: SortSpec) -> Vec<ContentItem> {
    sort(filter(items, filter_spec), sort_spec)
}

/// Collection counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub favorites: usize,
}

impl Stats {
    pub fn from_items(items: &[ContentItem]) -> Self {
        Self {
            total: items.len(),
            favorites: items.iter().filter(|i| i.favorite).count(),
        }
    }
}

/// Distinct categories in order of first appearance
pub fn categories(items: &[ContentItem]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for item in items {
        if !seen.contains(&item.category) {
            seen.push(item.category.clone());
        }
    }
    seen
}
