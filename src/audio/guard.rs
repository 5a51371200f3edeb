use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    error::StudyflowError,
    models::{MediaAsset, MediaAssetId},
};

use super::{clamp_volume, MediaProvider};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub active_media_id: Option<MediaAssetId>,
    pub volume: f32,
    pub is_playing: bool,
}

struct Slot<H> {
    /// Holding the handle is what "playing" means; there is no half-open state.
    active: Option<(MediaAssetId, H)>,
    volume: f32,
}

impl<H> Slot<H> {
    fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            active_media_id: self.active.as_ref().map(|(id, _)| id.clone()),
            volume: self.volume,
            is_playing: self.active.is_some(),
        }
    }
}

/// The single playback slot.
///
/// Every operation holds the slot lock until it finishes, so a switch
/// requested while another asset is still opening waits its turn. The old
/// handle is always released before the new one is acquired.
pub struct PlaybackGuard<P: MediaProvider> {
    provider: P,
    slot: Mutex<Slot<P::Handle>>,
}

impl<P: MediaProvider> PlaybackGuard<P> {
    pub fn new(provider: P, volume: f32) -> Self {
        Self {
            provider,
            slot: Mutex::new(Slot {
                active: None,
                volume: clamp_volume(volume),
            }),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn status(&self) -> PlaybackStatus {
        self.slot.lock().await.status()
    }

    pub async fn active_id(&self) -> Option<MediaAssetId> {
        self.slot
            .lock()
            .await
            .active
            .as_ref()
            .map(|(id, _)| id.clone())
    }

    /// Releases whatever is playing, then opens `asset`.
    ///
    /// On failure the slot is left empty and the error names the asset.
    pub async fn open(&self, asset: &MediaAsset) -> Result<PlaybackStatus, StudyflowError> {
        let mut slot = self.slot.lock().await;

        if let Some((previous, handle)) = slot.active.take() {
            self.release_handle(&previous, handle).await;
        }

        match self.provider.open(&asset.source_location, slot.volume).await {
            Ok(handle) => {
                info!("Playing {} ({})", asset.display_name, asset.id);
                slot.active = Some((asset.id.clone(), handle));
                Ok(slot.status())
            }
            Err(err) => {
                warn!("Failed to play {}: {err:#}", asset.display_name);
                Err(StudyflowError::MediaUnavailable {
                    asset: asset.id.clone(),
                    reason: format!("{err:#}"),
                })
            }
        }
    }

    /// Stops playback. Calling it with nothing playing is a no-op.
    pub async fn close(&self) -> PlaybackStatus {
        let mut slot = self.slot.lock().await;
        if let Some((previous, handle)) = slot.active.take() {
            self.release_handle(&previous, handle).await;
        }
        slot.status()
    }

    /// Stores the clamped volume and applies it to the open handle, if any.
    pub async fn set_volume(&self, volume: f32) -> PlaybackStatus {
        let mut slot = self.slot.lock().await;
        slot.volume = clamp_volume(volume);
        if let Some((id, handle)) = slot.active.as_ref() {
            if let Err(err) = self.provider.set_volume(handle, slot.volume).await {
                warn!("Failed to apply volume to {id}: {err:#}");
            }
        }
        slot.status()
    }

    async fn release_handle(&self, id: &MediaAssetId, handle: P::Handle) {
        // The handle is consumed either way; a failed release is only logged.
        if let Err(err) = self.provider.release(handle).await {
            error!("Failed to release playback handle for {id}: {err:#}");
        }
    }
}
