//! YouTube identifier extraction from pasted URLs.
//!
//! Pure string matching; nothing here touches the network or checks that
//! the identifier actually exists.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// YouTube video ids are always this long
pub const VIDEO_ID_LEN: usize = 11;

// Any `v=` query parameter counts, not only `watch?v=`: `watch?list=PL123&v=abc`
// must not come out as a playlist, and neither does `playlist?list=..&v=..`.
static VIDEO_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]v=").expect("video param pattern"));

static LIST_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]list=([A-Za-z0-9_-]+)").expect("list param pattern"));

static VIDEO_SHAPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtu\.be/|/v/|/u/\w+/|/embed/|watch\?v=|&v=)([^#&?]*)")
        .expect("video shape pattern")
});

/// Kind of YouTube resource a URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalKind {
    Video,
    Playlist,
}

/// Canonical (kind, id) pair extracted from a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRef {
    pub kind: ExternalKind,
    pub external_id: String,
}

impl ExternalRef {
    pub fn video(id: &str) -> Self {
        Self {
            kind: ExternalKind::Video,
            external_id: id.to_string(),
        }
    }

    pub fn playlist(id: &str) -> Self {
        Self {
            kind: ExternalKind::Playlist,
            external_id: id.to_string(),
        }
    }

    /// Canonical watch URL, as loaded back into the edit form
    pub fn source_url(&self) -> String {
        match self.kind {
            ExternalKind::Video => format!("https://youtu.be/{}", self.external_id),
            ExternalKind::Playlist => format!(
                "https://www.youtube.com/playlist?list={}",
                self.external_id
            ),
        }
    }
}

/// Extract the video or playlist identifier from a YouTube URL.
///
/// A URL with a `list=` parameter and no `v=` parameter is a playlist.
/// Anything else must match one of the known video URL shapes with an
/// 11-character id; otherwise `None`.
pub fn extract(url: &str) -> Option<ExternalRef> {
    let url = url.trim();

    if !VIDEO_PARAM.is_match(url) {
        if let Some(caps) = LIST_PARAM.captures(url) {
            return Some(ExternalRef::playlist(&caps[1]));
        }
    }

    let caps = VIDEO_SHAPES.captures(url)?;
    let id = &caps[1];
    if id.chars().count() == VIDEO_ID_LEN {
        Some(ExternalRef::video(id))
    } else {
        None
    }
}
