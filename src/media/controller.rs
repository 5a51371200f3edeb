use std::sync::Arc;

use log::info;
use tokio::sync::Mutex;

use crate::{
    audio::{MediaProvider, PlaybackGuard, PlaybackStatus},
    error::StudyflowError,
    models::{MediaAsset, MediaAssetId, MediaKind},
};

use super::MediaLibrary;

/// Media actions as the focus screen issues them.
///
/// Each action runs to completion before the next starts, so the toggle
/// decision and the removal ordering can't be interleaved by another tap.
pub struct MediaController<P: MediaProvider> {
    library: MediaLibrary,
    guard: Arc<PlaybackGuard<P>>,
    actions: Mutex<()>,
}

impl<P: MediaProvider> MediaController<P> {
    pub fn new(library: MediaLibrary, guard: Arc<PlaybackGuard<P>>) -> Self {
        Self {
            library,
            guard,
            actions: Mutex::new(()),
        }
    }

    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }

    pub async fn assets(&self) -> Vec<MediaAsset> {
        self.library.list().await
    }

    pub async fn status(&self) -> PlaybackStatus {
        self.guard.status().await
    }

    /// Tapping the playing asset stops it; tapping any other asset switches.
    pub async fn play(&self, id: &MediaAssetId) -> Result<PlaybackStatus, StudyflowError> {
        let _action = self.actions.lock().await;

        let asset = self
            .library
            .get(id)
            .await
            .ok_or_else(|| StudyflowError::UnknownAsset(id.clone()))?;

        let status = self.guard.status().await;
        if status.is_playing && status.active_media_id.as_ref() == Some(id) {
            return Ok(self.guard.close().await);
        }

        self.guard.open(&asset).await
    }

    pub async fn stop(&self) -> PlaybackStatus {
        let _action = self.actions.lock().await;
        self.guard.close().await
    }

    pub async fn set_volume(&self, volume: f32) -> PlaybackStatus {
        let _action = self.actions.lock().await;
        self.guard.set_volume(volume).await
    }

    pub async fn import(&self, source_location: &str, kind: MediaKind) -> MediaAsset {
        let _action = self.actions.lock().await;
        self.library.import(source_location, kind).await
    }

    /// Stops playback of `id` if it is active, then forgets the asset.
    pub async fn remove_asset(&self, id: &MediaAssetId) -> Result<PlaybackStatus, StudyflowError> {
        let _action = self.actions.lock().await;

        if self.guard.active_id().await.as_ref() == Some(id) {
            self.guard.close().await;
        }

        let removed = self
            .library
            .remove(id)
            .await
            .ok_or_else(|| StudyflowError::UnknownAsset(id.clone()))?;
        info!("Removed media '{}'", removed.display_name);

        Ok(self.guard.status().await)
    }
}
