//! The content store: the persisted, ordered collection and its mutations.
//!
//! Every operation loads the whole collection, applies one change and writes
//! the whole collection back. Nothing is cached between calls, so the stored
//! value is always the single source of truth.

use std::io::ErrorKind;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::storage::{Storage, StorageError};

use super::content::{ContentId, ContentItem, ContentType, Payload};
use super::payload::ResourceReleaser;
use super::query::{self, FilterSpec, SortSpec, Stats};
use super::schema::{decode_collection, encode_collection, CONTENT_KEY};
use super::theme::{Theme, THEME_KEY};
use super::validate::{Draft, EditingContext};

/// Errors from store operations
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Content not found: {0}")]
    NotFound(ContentId),

    #[error("Content {id} is a {existing}, cannot store a {requested} in its place")]
    TypeMismatch {
        id: ContentId,
        existing: ContentType,
        requested: ContentType,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No content id left above {0}")]
    IdsExhausted(ContentId),
}

impl LibraryError {
    /// Stale ids are expected after a concurrent delete; callers refresh and move on
    pub fn is_not_found(&self) -> bool {
        matches!(self, LibraryError::NotFound(_))
    }
}

/// Persisted content collection
pub struct ContentStore<S: Storage> {
    storage: S,
    releaser: Option<Box<dyn ResourceReleaser>>,
}

impl<S: Storage> ContentStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            releaser: None,
        }
    }

    /// Release transient payload references through `releaser`
    pub fn with_releaser(mut self, releaser: impl ResourceReleaser + 'static) -> Self {
        self.releaser = Some(Box::new(releaser));
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read the collection; a corrupt value reads as empty
    fn read(&self) -> Result<Vec<ContentItem>, LibraryError> {
        let raw = match self.storage.get(CONTENT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(Vec::new()),
            Err(StorageError::Io { source, .. }) if source.kind() == ErrorKind::InvalidData => {
                warn!(error = %source, "Discarding undecodable content collection");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        match decode_collection(&raw) {
            Ok(decoded) => {
                if decoded.migrated > 0 || decoded.skipped > 0 {
                    debug!(
                        migrated = decoded.migrated,
                        skipped = decoded.skipped,
                        "Normalized stored records"
                    );
                }
                Ok(decoded.items)
            }
            Err(e) => {
                warn!(error = %e, "Discarding corrupt content collection");
                Ok(Vec::new())
            }
        }
    }

    fn write(&mut self, items: &[ContentItem]) -> Result<(), LibraryError> {
        let raw = encode_collection(items)?;
        self.storage.set(CONTENT_KEY, &raw)?;
        Ok(())
    }

    /// All items in stored order; never fails
    pub fn load_all(&self) -> Vec<ContentItem> {
        self.read().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read content collection");
            Vec::new()
        })
    }

    /// Look up a single item
    pub fn get(&self, id: ContentId) -> Result<ContentItem, LibraryError> {
        self.read()?
            .into_iter()
            .find(|item| item.id == id)
            .ok_or(LibraryError::NotFound(id))
    }

    /// Append a new item built from `draft`
    #[instrument(skip(self, draft), fields(content_type = %draft.content_type()))]
    pub fn create(&mut self, draft: Draft) -> Result<ContentItem, LibraryError> {
        let mut items = self.read()?;

        let now = Utc::now();
        let id = next_id(&items, now.timestamp_millis()).ok_or_else(|| {
            let max = items.iter().map(|i| i.id).max();
            LibraryError::IdsExhausted(max.unwrap_or(ContentId::new(i64::MAX)))
        })?;
        let item = ContentItem {
            id,
            title: draft.title,
            category: draft.category,
            favorite: false,
            created_at: now,
            payload: draft.payload,
        };

        items.push(item.clone());
        self.write(&items)?;

        info!(id = %item.id, "Content added");
        Ok(item)
    }

    /// Replace the mutable fields of an existing item, keeping its position
    #[instrument(skip(self, draft))]
    pub fn update(&mut self, id: ContentId, draft: Draft) -> Result<ContentItem, LibraryError> {
        let mut items = self.read()?;
        let pos = items
            .iter()
            .position(|item| item.id == id)
            .ok_or(LibraryError::NotFound(id))?;

        let existing = items[pos].content_type();
        if existing != draft.content_type() {
            return Err(LibraryError::TypeMismatch {
                id,
                existing,
                requested: draft.content_type(),
            });
        }

        let item = &mut items[pos];
        item.title = draft.title;
        item.category = draft.category;
        let old_payload = std::mem::replace(&mut item.payload, draft.payload);
        let updated = item.clone();

        self.write(&items)?;
        info!(%id, "Content updated");

        if old_payload.transient_reference() != updated.payload.transient_reference() {
            self.release_unused(&old_payload, &items);
        }
        Ok(updated)
    }

    /// Create or update, depending on what the form was opened for.
    ///
    /// When the draft carries a freshly materialized transient reference and
    /// the write fails, the reference is released unless a stored item uses it.
    pub fn submit(&mut self, ctx: &EditingContext, draft: Draft) -> Result<ContentItem, LibraryError> {
        let pending = draft
            .payload
            .transient_reference()
            .map(|_| draft.payload.clone());

        let result = match ctx.target_id {
            Some(id) => self.update(id, draft),
            None => self.create(draft),
        };

        if let (Err(e), Some(payload)) = (&result, pending) {
            match self.read() {
                Ok(items) => {
                    debug!(error = %e, "Submit failed, releasing its payload");
                    self.release_unused(&payload, &items);
                }
                Err(read_err) => {
                    warn!(error = %read_err, "Cannot check payload references, keeping it");
                }
            }
        }
        result
    }

    /// Remove an item and release whatever its payload holds
    #[instrument(skip(self))]
    pub fn delete(&mut self, id: ContentId) -> Result<ContentItem, LibraryError> {
        let mut items = self.read()?;
        let pos = items
            .iter()
            .position(|item| item.id == id)
            .ok_or(LibraryError::NotFound(id))?;

        let removed = items.remove(pos);
        self.write(&items)?;
        info!(%id, "Content deleted");

        self.release_unused(&removed.payload, &items);
        Ok(removed)
    }

    /// Flip the favorite flag
    pub fn toggle_favorite(&mut self, id: ContentId) -> Result<ContentItem, LibraryError> {
        let mut items = self.read()?;
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(LibraryError::NotFound(id))?;

        item.favorite = !item.favorite;
        let toggled = item.clone();

        self.write(&items)?;
        debug!(%id, favorite = toggled.favorite, "Favorite toggled");
        Ok(toggled)
    }

    /// Persist a new display order; returns the stored order
    pub fn reorder(&mut self, order: &[ContentId]) -> Result<Vec<ContentItem>, LibraryError> {
        let items = reorder_items(self.read()?, order);
        self.write(&items)?;
        debug!(count = items.len(), "Content reordered");
        Ok(items)
    }

    /// Filtered and sorted view of the stored collection
    pub fn view(&self, filter: &FilterSpec, sort: SortSpec) -> Vec<ContentItem> {
        query::view(&self.load_all(), filter, sort)
    }

    pub fn stats(&self) -> Stats {
        Stats::from_items(&self.load_all())
    }

    pub fn categories(&self) -> Vec<String> {
        query::categories(&self.load_all())
    }

    /// Stored theme, light when unset or unreadable
    pub fn theme(&self) -> Theme {
        match self.storage.get(THEME_KEY) {
            Ok(Some(raw)) => raw.parse::<Theme>().unwrap_or_else(|_| {
                warn!(value = %raw, "Ignoring unknown theme");
                Theme::default()
            }),
            Ok(None) => Theme::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read theme");
                Theme::default()
            }
        }
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), LibraryError> {
        self.storage.set(THEME_KEY, theme.as_str())?;
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, LibraryError> {
        let theme = self.theme().toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    /// Release a discarded payload unless another item still points at it
    fn release_unused(&self, payload: &Payload, remaining: &[ContentItem]) {
        let Some(reference) = payload.transient_reference() else {
            return;
        };
        if remaining
            .iter()
            .any(|item| item.payload.transient_reference() == Some(reference))
        {
            debug!(reference, "Payload still referenced, keeping it");
            return;
        }

        match &self.releaser {
            Some(releaser) => {
                if let Err(e) = releaser.release(reference) {
                    warn!(reference, error = %e, "Failed to release payload");
                }
            }
            None => warn!(reference, "No releaser configured, payload left in place"),
        }
    }
}

/// Fresh id: the current time in ms, bumped past every existing id.
/// `None` once the largest id is `i64::MAX`.
pub fn next_id(items: &[ContentItem], now_ms: i64) -> Option<ContentId> {
    let after_max = match items.iter().map(|i| i.id.get()).max() {
        Some(max) => max.checked_add(1)?,
        None => 1,
    };
    Some(ContentId::new(now_ms.max(after_max)))
}

/// Put the items named in `order` first, in that order, and keep the rest after
/// them in their current relative order. Unknown and repeated ids are ignored.
pub fn reorder_items(mut items: Vec<ContentItem>, order: &[ContentId]) -> Vec<ContentItem> {
    let mut ordered = Vec::with_capacity(items.len());
    for id in order {
        if let Some(pos) = items.iter().position(|item| item.id == *id) {
            ordered.push(items.remove(pos));
        }
    }
    ordered.extend(items);
    ordered
}
