//! learnshelf - A personal library of learning material
//!
//! Keeps YouTube videos and playlists, PDFs and text articles in one
//! ordered, persisted collection that can be searched, filtered by
//! category, favorited and reordered.
//!
//! # Modules
//!
//! - `storage`: String key-value persistence (files or memory)
//! - `library`: Content model, URL extraction, validation, store and queries
//! - `config`: Layered configuration (env, config file, defaults)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Add a video and an article
//! learnshelf add video https://youtu.be/dQw4w9WgXcQ --category music
//! learnshelf add article --title "Borrowing" --category rust --content "..."
//!
//! # Favorites first, filtered by title
//! learnshelf list --search borrow --sort favorite-first
//! ```

pub mod cli;
pub mod config;
pub mod library;
pub mod storage;

// Re-export main types at crate root for convenience
pub use library::{
    ContentId, ContentItem, ContentStore, ContentType, Draft, EditingContext, FilterSpec,
    LibraryError, Payload, RawFields, SortSpec, ValidationErrors, Validator,
};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
