use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaAssetId(String);

impl MediaAssetId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MediaAssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MediaAssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for MediaAssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }

    /// Guesses the kind from a file extension; anything unrecognised is audio.
    pub fn from_location(location: &str) -> Self {
        let ext = Path::new(location)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mp4" | "m4v" | "mov" | "mkv" | "webm" | "avi") => MediaKind::Video,
            _ => MediaKind::Audio,
        }
    }
}

/// A user-imported file usable as ambient playback.
///
/// Serialized as `{id, name, uri, type}` so the persisted `userMedia` list
/// stays readable by older builds of the app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaAsset {
    pub id: MediaAssetId,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "uri")]
    pub source_location: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

impl MediaAsset {
    /// Builds an asset for a freshly imported file. The display name is the
    /// file name without its extension.
    pub fn imported(source_location: impl Into<String>, kind: MediaKind) -> Self {
        let source_location = source_location.into();
        let display_name = Path::new(&source_location)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Custom {}", kind.as_str()));

        Self {
            id: MediaAssetId::generate(),
            display_name,
            source_location,
            kind,
        }
    }
}
