//! Content repository for the learning library.
//!
//! The library keeps videos, playlists, PDFs and articles as one ordered
//! collection under the `content` storage key.
//!
//! # Flow
//!
//! ```text
//! RawFields ──validate──▶ ValidDraft ──materialize (async)──▶ Draft
//!                                                               │
//!                           ContentStore::create / update ◀─────┘
//!                                         │
//!                           load_all ──▶ query::view ──▶ renderer
//! ```
//!
//! - `extract`: YouTube URL → (kind, external id)
//! - `validate`: per-type form rules, editing context, edit prefill
//! - `payload`: PDF files → data URLs or releasable blobs
//! - `store`: the persisted collection and its mutations
//! - `query`: filter, sort, stats and categories
//! - `schema`: tolerant reader for both stored record shapes

pub mod content;
pub mod extract;
pub mod payload;
pub mod query;
pub mod schema;
pub mod store;
pub mod theme;
pub mod validate;

pub use content::{ContentId, ContentItem, ContentType, Payload};
pub use extract::{extract, ExternalKind, ExternalRef};
pub use payload::{
    BlobDir, DataUrlReader, FileReadError, FileReader, FileRef, PdfStorage, ResourceReleaser,
};
pub use query::{FilterSpec, SortSpec, Stats};
pub use store::{ContentStore, LibraryError};
pub use theme::Theme;
pub use validate::{
    prefill, Draft, EditingContext, RawFields, SchemaVariant, ValidDraft, ValidationError,
    ValidationErrors, Validator,
};
