//! Encoding and decoding of the persisted `content` collection.
//!
//! Two record shapes exist in storage with no version field between them:
//!
//! - rich: `id`, `type`, `title`, `category`, `favorite`, `createdAt` and the
//!   payload field (`externalId`, `data` or `content`)
//! - minimal: `type` and `title` with an `id` and/or an external id, sometimes
//!   under the legacy `videoId` name with an `isPlaylist` flag
//!
//! Records are normalized into [`ContentItem`] on load. Anything missing gets a
//! default, ids that are missing or duplicated are reassigned above the
//! current maximum, and records that cannot carry a payload are dropped. The
//! next write stores everything in the rich shape.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::content::{ContentId, ContentItem, ContentType, Payload};
use super::validate::{DEFAULT_CATEGORY, DEFAULT_PDF_TITLE, DEFAULT_VIDEO_TITLE};

/// Storage key of the content collection
pub const CONTENT_KEY: &str = "content";

pub const DEFAULT_ARTICLE_TITLE: &str = "Untitled Article";

/// The stored value is not a JSON array of records
#[derive(Debug, Error)]
#[error("Stored collection is corrupt: {0}")]
pub struct CorruptCollection(#[from] serde_json::Error);

/// Result of decoding a stored collection
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub items: Vec<ContentItem>,

    /// Records that were not already in the rich shape
    pub migrated: usize,

    /// Records that could not be read at all
    pub skipped: usize,
}

/// Any record shape ever written under the `content` key
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: Option<Value>,
    #[serde(rename = "type")]
    content_type: Option<String>,
    title: Option<String>,
    category: Option<String>,
    favorite: Option<bool>,
    created_at: Option<String>,
    external_id: Option<String>,
    video_id: Option<String>,
    is_playlist: Option<bool>,
    data: Option<String>,
    content: Option<String>,
}

/// Serialize a collection in display order
pub fn encode_collection(items: &[ContentItem]) -> serde_json::Result<String> {
    serde_json::to_string(items)
}

/// Decode a stored collection, normalizing every record to the rich shape
pub fn decode_collection(raw: &str) -> Result<Decoded, CorruptCollection> {
    // `null` is what an emptied slot reads back as
    let values: Option<Vec<Value>> = serde_json::from_str(raw)?;
    let values = values.unwrap_or_default();

    let mut decoded = Decoded::default();
    let mut seen: HashSet<i64> = HashSet::new();
    let mut needs_id: Vec<usize> = Vec::new();

    for (index, value) in values.into_iter().enumerate() {
        let record: StoredRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping unreadable content record");
                decoded.skipped += 1;
                continue;
            }
        };

        let raw_id = record.id.as_ref().and_then(parse_id);
        let (item, migrated) = match normalize(record, raw_id) {
            Ok(normalized) => normalized,
            Err(reason) => {
                tracing::warn!(index, reason, "Skipping content record");
                decoded.skipped += 1;
                continue;
            }
        };

        let has_unique_id = raw_id.is_some_and(|id| seen.insert(id));
        if !has_unique_id {
            needs_id.push(decoded.items.len());
        }
        if migrated || !has_unique_id {
            decoded.migrated += 1;
        }
        decoded.items.push(item);
    }

    let mut next = seen.iter().max().map_or(Some(1), |max| max.checked_add(1));
    let mut unassigned = Vec::new();
    for index in needs_id {
        let Some(id) = next.or_else(|| lowest_free_id(&seen)) else {
            unassigned.push(index);
            continue;
        };
        decoded.items[index].id = ContentId::new(id);
        seen.insert(id);
        next = next.and_then(|id| id.checked_add(1));
    }

    // Only reachable once every positive id is taken
    for index in unassigned.into_iter().rev() {
        tracing::warn!(index, "No free id left, skipping content record");
        decoded.items.remove(index);
        decoded.skipped += 1;
    }

    Ok(decoded)
}

/// Smallest positive id not in use, for when `max + 1` would overflow
fn lowest_free_id(seen: &HashSet<i64>) -> Option<i64> {
    (1..=i64::MAX).find(|id| !seen.contains(id))
}

/// Integer ids, also accepted as integral floats or numeric strings
fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build an item (id still unassigned) and report whether anything was defaulted
fn normalize(record: StoredRecord, raw_id: Option<i64>) -> Result<(ContentItem, bool), &'static str> {
    let mut migrated = record.video_id.is_some() || record.is_playlist.is_some();

    let external_id = non_blank(record.external_id).or_else(|| non_blank(record.video_id));
    let is_playlist = record.is_playlist.unwrap_or(false);

    let content_type = match record.content_type.as_deref().map(str::to_lowercase) {
        Some(t) => match t.as_str() {
            "video" if is_playlist => ContentType::Playlist,
            "video" => ContentType::Video,
            "playlist" => ContentType::Playlist,
            "pdf" => ContentType::Pdf,
            "article" => ContentType::Article,
            _ => return Err("unknown content type"),
        },
        None if external_id.is_some() => {
            migrated = true;
            if is_playlist {
                ContentType::Playlist
            } else {
                ContentType::Video
            }
        }
        None => return Err("missing content type"),
    };

    let payload = match content_type {
        ContentType::Video => Payload::Video {
            external_id: external_id.ok_or("missing external id")?,
        },
        ContentType::Playlist => Payload::Playlist {
            external_id: external_id.ok_or("missing external id")?,
        },
        ContentType::Pdf => Payload::Pdf {
            data: non_blank(record.data).ok_or("missing file data")?,
        },
        ContentType::Article => Payload::Article {
            content: non_blank(record.content).ok_or("missing article body")?,
        },
    };

    let title = non_blank(record.title).unwrap_or_else(|| {
        migrated = true;
        default_title(content_type).to_string()
    });
    let category = non_blank(record.category).unwrap_or_else(|| {
        migrated = true;
        DEFAULT_CATEGORY.to_string()
    });
    let favorite = record.favorite.unwrap_or_else(|| {
        migrated = true;
        false
    });
    let created_at = record
        .created_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| {
            migrated = true;
            fallback_created_at(raw_id)
        });

    let item = ContentItem {
        id: ContentId::new(raw_id.unwrap_or_default()),
        title,
        category,
        favorite,
        created_at,
        payload,
    };
    Ok((item, migrated))
}

fn default_title(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Video | ContentType::Playlist => DEFAULT_VIDEO_TITLE,
        ContentType::Pdf => DEFAULT_PDF_TITLE,
        ContentType::Article => DEFAULT_ARTICLE_TITLE,
    }
}

/// Legacy ids were creation times in milliseconds
fn fallback_created_at(raw_id: Option<i64>) -> DateTime<Utc> {
    raw_id
        .filter(|id| *id > 0)
        .and_then(|id| Utc.timestamp_millis_opt(id).single())
        .unwrap_or_default()
}
