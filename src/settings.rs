use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use log::{error, warn};
use tokio::sync::RwLock;

use crate::{error::StudyflowError, models::MediaAsset};

pub const SELECTED_THEME_KEY: &str = "selectedTheme";
pub const USER_MEDIA_KEY: &str = "userMedia";

/// Local string key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile store for tests and runs without a data directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.data.write().await.remove(key);
        Ok(())
    }
}

/// Typed access to the two persisted preferences.
///
/// Loads never fail: unreadable or malformed values are logged and the
/// caller gets the default.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    pub async fn selected_theme(&self) -> Option<String> {
        match self.store.get(SELECTED_THEME_KEY).await {
            Ok(value) => value,
            Err(err) => {
                error!("Error loading theme: {err:#}");
                None
            }
        }
    }

    pub async fn save_selected_theme(&self, theme_id: &str) -> Result<(), StudyflowError> {
        self.store
            .set(SELECTED_THEME_KEY, theme_id)
            .await
            .map_err(StudyflowError::persistence)
    }

    pub async fn clear_selected_theme(&self) -> Result<(), StudyflowError> {
        self.store
            .remove(SELECTED_THEME_KEY)
            .await
            .map_err(StudyflowError::persistence)
    }

    pub async fn user_media(&self) -> Vec<MediaAsset> {
        let raw = match self.store.get(USER_MEDIA_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                error!("Error loading user media: {err:#}");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("Discarding malformed {USER_MEDIA_KEY} value: {err}");
            Vec::new()
        })
    }

    pub async fn save_user_media(&self, media: &[MediaAsset]) -> Result<(), StudyflowError> {
        let serialized = serde_json::to_string(media).map_err(StudyflowError::persistence)?;
        self.store
            .set(USER_MEDIA_KEY, &serialized)
            .await
            .map_err(StudyflowError::persistence)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::models::MediaKind;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("disk unplugged"))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("disk unplugged"))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow!("disk unplugged"))
        }
    }

    #[tokio::test]
    async fn media_list_round_trips_through_store() {
        let prefs = Preferences::in_memory();
        assert!(prefs.user_media().await.is_empty());

        let media = vec![
            MediaAsset::imported("/a/rain.mp3", MediaKind::Audio),
            MediaAsset::imported("/a/fire.mp4", MediaKind::Video),
        ];
        prefs.save_user_media(&media).await.unwrap();
        assert_eq!(prefs.user_media().await, media);
    }

    #[tokio::test]
    async fn malformed_media_falls_back_to_empty() {
        let store = Arc::new(MemoryStore::default());
        store.set(USER_MEDIA_KEY, "{not json").await.unwrap();
        let prefs = Preferences::new(store);
        assert!(prefs.user_media().await.is_empty());
    }

    #[tokio::test]
    async fn store_failures_use_defaults_on_load_and_surface_on_save() {
        let prefs = Preferences::new(Arc::new(BrokenStore));
        assert_eq!(prefs.selected_theme().await, None);
        assert!(prefs.user_media().await.is_empty());

        let err = prefs.save_selected_theme("warm").await.unwrap_err();
        assert!(matches!(err, StudyflowError::Persistence(_)));
    }
}
