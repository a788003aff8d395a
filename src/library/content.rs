//! Content items and their type-specific payloads.
//!
//! A [`ContentItem`] carries exactly one [`Payload`], and the payload variant
//! is the item's type. Serialized records keep the flat JSON shape used by the
//! `content` storage key: `{"id", "title", "category", "favorite", "createdAt",
//! "type", <payload field>}`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::extract::ExternalRef;

/// Prefix of payload references that point at a releasable blob
pub const BLOB_SCHEME: &str = "blob:";

/// Content identifier (integer, unique within the collection)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(i64);

impl ContentId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw integer value
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ContentId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ContentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s
            .trim()
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("Invalid content id: {}", s))?;
        Ok(Self(raw))
    }
}

/// Type of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Single YouTube video
    Video,

    /// YouTube playlist
    Playlist,

    /// Uploaded PDF document
    Pdf,

    /// Free-text article
    Article,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Video,
        ContentType::Playlist,
        ContentType::Pdf,
        ContentType::Article,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Playlist => "playlist",
            ContentType::Pdf => "pdf",
            ContentType::Article => "article",
        }
    }

    /// Video and playlist share one form and one URL field
    pub fn is_youtube(self) -> bool {
        matches!(self, ContentType::Video | ContentType::Playlist)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "video" | "youtube" | "yt" => Ok(ContentType::Video),
            "playlist" => Ok(ContentType::Playlist),
            "pdf" => Ok(ContentType::Pdf),
            "article" | "text" => Ok(ContentType::Article),
            _ => anyhow::bail!("Unknown content type: {}", s),
        }
    }
}

/// Type-specific payload; the variant is the item's type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Payload {
    Video {
        #[serde(rename = "externalId")]
        external_id: String,
    },

    Playlist {
        #[serde(rename = "externalId")]
        external_id: String,
    },

    /// Embeddable file content: a data URL or a `blob:` reference
    Pdf { data: String },

    Article { content: String },
}

impl Payload {
    pub fn content_type(&self) -> ContentType {
        match self {
            Payload::Video { .. } => ContentType::Video,
            Payload::Playlist { .. } => ContentType::Playlist,
            Payload::Pdf { .. } => ContentType::Pdf,
            Payload::Article { .. } => ContentType::Article,
        }
    }

    /// YouTube identifier for video and playlist payloads
    pub fn external_id(&self) -> Option<&str> {
        match self {
            Payload::Video { external_id } | Payload::Playlist { external_id } => {
                Some(external_id)
            }
            Payload::Pdf { .. } | Payload::Article { .. } => None,
        }
    }

    pub fn external_ref(&self) -> Option<ExternalRef> {
        match self {
            Payload::Video { external_id } => Some(ExternalRef::video(external_id)),
            Payload::Playlist { external_id } => Some(ExternalRef::playlist(external_id)),
            Payload::Pdf { .. } | Payload::Article { .. } => None,
        }
    }

    /// Reference that must be released when the payload is discarded
    pub fn transient_reference(&self) -> Option<&str> {
        match self {
            Payload::Pdf { data } if data.starts_with(BLOB_SCHEME) => Some(data),
            _ => None,
        }
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// Unique identifier, assigned at creation
    pub id: ContentId,

    pub title: String,

    /// Free-form category used for filtering
    pub category: String,

    #[serde(default)]
    pub favorite: bool,

    /// Set once at creation
    pub created_at: DateTime<Utc>,

    #[serde(flatten)]
    pub payload: Payload,
}

impl ContentItem {
    pub fn content_type(&self) -> ContentType {
        self.payload.content_type()
    }

    /// Embeddable player URL for videos and playlists
    pub fn embed_url(&self) -> Option<String> {
        match &self.payload {
            Payload::Video { external_id } => {
                Some(format!("https://www.youtube.com/embed/{}", external_id))
            }
            Payload::Playlist { external_id } => Some(format!(
                "https://www.youtube.com/embed/videoseries?list={}",
                external_id
            )),
            Payload::Pdf { .. } | Payload::Article { .. } => None,
        }
    }

    /// Canonical watch URL for videos and playlists
    pub fn source_url(&self) -> Option<String> {
        self.payload.external_ref().map(|r| r.source_url())
    }
}
