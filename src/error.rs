use thiserror::Error;

use crate::models::MediaAssetId;

/// Failures surfaced by the focus, playback and preference components.
///
/// None of these ever reach the countdown: the timer keeps ticking whatever
/// happens to media or storage.
#[derive(Debug, Error)]
pub enum StudyflowError {
    /// Out-of-range duration or cycle value. Callers clamp and log it.
    #[error("invalid {field}: {value} (clamped to {clamped})")]
    Configuration {
        field: &'static str,
        value: String,
        clamped: u32,
    },

    #[error("media {asset} unavailable: {reason}")]
    MediaUnavailable { asset: MediaAssetId, reason: String },

    #[error("preference storage failed: {0}")]
    Persistence(#[source] anyhow::Error),

    #[error("unknown media asset {0}")]
    UnknownAsset(MediaAssetId),

    #[error("unknown theme '{0}'")]
    UnknownTheme(String),
}

impl StudyflowError {
    pub fn persistence(err: impl Into<anyhow::Error>) -> Self {
        StudyflowError::Persistence(err.into())
    }
}

pub type Result<T, E = StudyflowError> = std::result::Result<T, E>;
