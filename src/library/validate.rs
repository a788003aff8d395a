//! Form validation for content drafts.
//!
//! Raw form values arrive as [`RawFields`] keyed by logical field name and are
//! checked against the rules for the content type named in the
//! [`EditingContext`]. Validation is pure: reading a selected PDF happens
//! afterwards, in [`ValidDraft::materialize`], and always before anything is
//! persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::content::{ContentId, ContentItem, ContentType, Payload};
use super::extract::{extract, ExternalKind, ExternalRef};
use super::payload::{FileReadError, FileReader, FileRef};

/// Logical form field names
pub mod field {
    pub const URL: &str = "url";
    pub const TITLE: &str = "title";
    pub const CATEGORY: &str = "category";
    pub const FILE: &str = "file";
    pub const CONTENT: &str = "content";
}

pub const DEFAULT_VIDEO_TITLE: &str = "Untitled Video";
pub const DEFAULT_PDF_TITLE: &str = "Untitled PDF";
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Which record shape the form collects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Category required for every type
    #[default]
    Rich,

    /// Category optional for videos and PDFs
    Minimal,
}

impl std::str::FromStr for SchemaVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rich" => Ok(SchemaVariant::Rich),
            "minimal" => Ok(SchemaVariant::Minimal),
            _ => anyhow::bail!("Unknown schema variant: {}", s),
        }
    }
}

/// Which form is open and which item, if any, is being edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditingContext {
    pub content_type: ContentType,
    pub target_id: Option<ContentId>,

    /// Identifier the edited item already has. Its source URL is accepted
    /// unchanged even when it would not pass extraction today.
    pub current: Option<ExternalRef>,
}

impl EditingContext {
    /// Context for adding a new item
    pub fn create(content_type: ContentType) -> Self {
        Self {
            content_type,
            target_id: None,
            current: None,
        }
    }

    /// Context for editing an existing item
    pub fn edit(content_type: ContentType, id: ContentId) -> Self {
        Self {
            content_type,
            target_id: Some(id),
            current: None,
        }
    }

    pub fn with_current(mut self, current: ExternalRef) -> Self {
        self.current = Some(current);
        self
    }

    pub fn is_editing(&self) -> bool {
        self.target_id.is_some()
    }
}

/// Raw form values keyed by logical field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields(BTreeMap<String, String>);

impl RawFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Trimmed value, `None` when absent or blank
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Copy every value of `other` over this one
    pub fn merge(&mut self, other: &RawFields) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

/// A single field-level failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    fn required(field: &'static str) -> Self {
        Self::new(field, format!("{} is required", field))
    }
}

/// All field failures of one submission, in form order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_errors(.0))]
pub struct ValidationErrors(Vec<ValidationError>);

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// First failure, for fail-fast callers
    pub fn first(&self) -> &ValidationError {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Failure for a given field, if any
    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.field == field)
    }
}

/// Validated payload, before the file (if any) has been read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftPayload {
    Video { external_id: String },
    Playlist { external_id: String },
    Pdf { file: FileRef },
    Article { content: String },
}

/// A validated draft awaiting payload materialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    pub title: String,
    pub category: String,
    pub payload: DraftPayload,
}

impl ValidDraft {
    /// Read the selected file, if any, into an embeddable payload
    pub async fn materialize(self, reader: &dyn FileReader) -> Result<Draft, FileReadError> {
        let payload = match self.payload {
            DraftPayload::Video { external_id } => Payload::Video { external_id },
            DraftPayload::Playlist { external_id } => Payload::Playlist { external_id },
            DraftPayload::Pdf { file } => Payload::Pdf {
                data: reader.read_embeddable(&file).await?,
            },
            DraftPayload::Article { content } => Payload::Article { content },
        };

        Ok(Draft {
            title: self.title,
            category: self.category,
            payload,
        })
    }
}

/// A draft ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub category: String,
    pub payload: Payload,
}

impl Draft {
    pub fn new(title: impl Into<String>, category: impl Into<String>, payload: Payload) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            payload,
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.payload.content_type()
    }
}

/// Per-type form validator
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    schema: SchemaVariant,
}

impl Validator {
    pub fn new(schema: SchemaVariant) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    /// Check raw form values for the form named by `ctx`
    pub fn validate(
        &self,
        ctx: &EditingContext,
        fields: &RawFields,
    ) -> Result<ValidDraft, ValidationErrors> {
        let mut errors = Vec::new();

        let draft = match ctx.content_type {
            ContentType::Video | ContentType::Playlist => {
                self.validate_youtube(ctx, fields, &mut errors)
            }
            ContentType::Pdf => self.validate_pdf(fields, &mut errors),
            ContentType::Article => validate_article(fields, &mut errors),
        };

        match draft {
            Some(draft) if errors.is_empty() => Ok(draft),
            _ => Err(ValidationErrors(errors)),
        }
    }

    fn category(&self, fields: &RawFields, errors: &mut Vec<ValidationError>) -> Option<String> {
        match (fields.get(field::CATEGORY), self.schema) {
            (Some(category), _) => Some(category.to_string()),
            (None, SchemaVariant::Minimal) => Some(DEFAULT_CATEGORY.to_string()),
            (None, SchemaVariant::Rich) => {
                errors.push(ValidationError::required(field::CATEGORY));
                None
            }
        }
    }

    fn validate_youtube(
        &self,
        ctx: &EditingContext,
        fields: &RawFields,
        errors: &mut Vec<ValidationError>,
    ) -> Option<ValidDraft> {
        let payload = match fields.get(field::URL) {
            None => {
                errors.push(ValidationError::required(field::URL));
                None
            }
            Some(url) => match current_if_unchanged(ctx, url).or_else(|| extract(url)) {
                None => {
                    errors.push(ValidationError::new(field::URL, "invalid URL"));
                    None
                }
                Some(found) => {
                    let payload = match found.kind {
                        ExternalKind::Video => DraftPayload::Video {
                            external_id: found.external_id,
                        },
                        ExternalKind::Playlist => DraftPayload::Playlist {
                            external_id: found.external_id,
                        },
                    };
                    let kind = match found.kind {
                        ExternalKind::Video => ContentType::Video,
                        ExternalKind::Playlist => ContentType::Playlist,
                    };
                    // An item's type is fixed once created
                    if ctx.is_editing() && kind != ctx.content_type {
                        errors.push(ValidationError::new(
                            field::URL,
                            format!("URL points at a {}, expected a {}", kind, ctx.content_type),
                        ));
                        None
                    } else {
                        Some(payload)
                    }
                }
            },
        };

        let title = fields
            .get(field::TITLE)
            .unwrap_or(DEFAULT_VIDEO_TITLE)
            .to_string();
        let category = self.category(fields, errors);

        Some(ValidDraft {
            title,
            category: category?,
            payload: payload?,
        })
    }

    fn validate_pdf(
        &self,
        fields: &RawFields,
        errors: &mut Vec<ValidationError>,
    ) -> Option<ValidDraft> {
        let file = match fields.get(field::FILE) {
            Some(path) => Some(FileRef::new(path)),
            None => {
                errors.push(ValidationError::new(field::FILE, "no file selected"));
                None
            }
        };

        let title = fields
            .get(field::TITLE)
            .map(str::to_string)
            .or_else(|| file.as_ref().and_then(FileRef::name))
            .unwrap_or_else(|| DEFAULT_PDF_TITLE.to_string());
        let category = self.category(fields, errors);

        Some(ValidDraft {
            title,
            category: category?,
            payload: DraftPayload::Pdf { file: file? },
        })
    }
}

/// The edited item's own identifier, when the form still shows its URL
fn current_if_unchanged(ctx: &EditingContext, url: &str) -> Option<ExternalRef> {
    ctx.current
        .as_ref()
        .filter(|current| ctx.is_editing() && current.source_url() == url)
        .cloned()
}

fn validate_article(fields: &RawFields, errors: &mut Vec<ValidationError>) -> Option<ValidDraft> {
    let mut require = |key: &'static str| {
        let value = fields.get(key).map(str::to_string);
        if value.is_none() {
            errors.push(ValidationError::required(key));
        }
        value
    };

    let title = require(field::TITLE);
    let category = require(field::CATEGORY);
    let content = require(field::CONTENT);

    Some(ValidDraft {
        title: title?,
        category: category?,
        payload: DraftPayload::Article { content: content? },
    })
}

/// Load an item back into form fields for editing
pub fn prefill(item: &ContentItem) -> (EditingContext, RawFields) {
    let mut ctx = EditingContext::edit(item.content_type(), item.id);
    if let Some(current) = item.payload.external_ref() {
        ctx = ctx.with_current(current);
    }
    let mut fields = RawFields::new()
        .with(field::TITLE, item.title.as_str())
        .with(field::CATEGORY, item.category.as_str());

    match &item.payload {
        Payload::Video { .. } | Payload::Playlist { .. } => {
            if let Some(url) = item.source_url() {
                fields.set(field::URL, url);
            }
        }
        // A file input cannot be pre-populated
        Payload::Pdf { .. } => {}
        Payload::Article { content } => fields.set(field::CONTENT, content.as_str()),
    }

    (ctx, fields)
}
