use std::sync::Arc;

use log::{error, info};
use tokio::sync::RwLock;

use crate::{
    models::{MediaAsset, MediaAssetId, MediaKind},
    settings::Preferences,
};

/// The user's imported media, mirrored to the `userMedia` preference.
///
/// Save failures are logged; the in-memory list stays authoritative for the
/// rest of the run.
#[derive(Clone)]
pub struct MediaLibrary {
    prefs: Preferences,
    assets: Arc<RwLock<Vec<MediaAsset>>>,
}

impl MediaLibrary {
    pub async fn load(prefs: Preferences) -> Self {
        let assets = prefs.user_media().await;
        info!("Loaded {} media assets", assets.len());
        Self {
            prefs,
            assets: Arc::new(RwLock::new(assets)),
        }
    }

    pub async fn list(&self) -> Vec<MediaAsset> {
        self.assets.read().await.clone()
    }

    pub async fn get(&self, id: &MediaAssetId) -> Option<MediaAsset> {
        self.assets
            .read()
            .await
            .iter()
            .find(|asset| &asset.id == id)
            .cloned()
    }

    pub async fn import(&self, source_location: &str, kind: MediaKind) -> MediaAsset {
        let asset = MediaAsset::imported(source_location, kind);
        let mut assets = self.assets.write().await;
        assets.push(asset.clone());
        self.persist(&assets).await;
        info!("Imported {} '{}'", kind.as_str(), asset.display_name);
        asset
    }

    /// Drops the asset from the list. Callers must stop its playback first.
    pub(crate) async fn remove(&self, id: &MediaAssetId) -> Option<MediaAsset> {
        let mut assets = self.assets.write().await;
        let index = assets.iter().position(|asset| &asset.id == id)?;
        let removed = assets.remove(index);
        self.persist(&assets).await;
        Some(removed)
    }

    async fn persist(&self, assets: &[MediaAsset]) {
        if let Err(err) = self.prefs.save_user_media(assets).await {
            error!("Error saving user media: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn import_persists_and_reloads() {
        let prefs = Preferences::in_memory();
        let library = MediaLibrary::load(prefs.clone()).await;

        let rain = library.import("/sounds/rain.mp3", MediaKind::Audio).await;
        let fire = library.import("/clips/fireplace.mp4", MediaKind::Video).await;
        assert_eq!(fire.display_name, "fireplace");

        let reloaded = MediaLibrary::load(prefs).await;
        let ids: Vec<_> = reloaded.list().await.into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![rain.id, fire.id]);
    }

    #[tokio::test]
    async fn remove_updates_persisted_list() {
        let prefs = Preferences::in_memory();
        let library = MediaLibrary::load(prefs.clone()).await;
        let rain = library.import("/sounds/rain.mp3", MediaKind::Audio).await;

        assert_eq!(library.remove(&rain.id).await, Some(rain.clone()));
        assert_eq!(library.remove(&rain.id).await, None);
        assert!(prefs.user_media().await.is_empty());
        assert!(library.get(&rain.id).await.is_none());
    }
}
