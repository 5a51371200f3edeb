pub mod engine;
pub mod guard;

use anyhow::Result;
use async_trait::async_trait;

pub use engine::{AudioEngine, EngineHandle};
pub use guard::{PlaybackGuard, PlaybackStatus};

pub const DEFAULT_VOLUME: f32 = 0.7;

/// Opens and controls playback handles for media files.
///
/// Implementations own whatever device or decoder state a handle needs;
/// callers only hold the opaque handle and must give it back to `release`.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    type Handle: Send + Sync;

    /// Opens `uri` and starts looping playback at `volume`.
    async fn open(&self, uri: &str, volume: f32) -> Result<Self::Handle>;

    async fn set_volume(&self, handle: &Self::Handle, volume: f32) -> Result<()>;

    async fn release(&self, handle: Self::Handle) -> Result<()>;
}

/// Clamps to `[0, 1]`; NaN is treated as silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
