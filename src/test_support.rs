//! Test doubles shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::{
    audio::MediaProvider,
    models::{MediaAsset, MediaKind},
};

pub fn asset(id: &str, uri: &str) -> MediaAsset {
    MediaAsset {
        id: id.into(),
        display_name: id.to_string(),
        source_location: uri.to_string(),
        kind: MediaKind::Audio,
    }
}

#[derive(Default)]
struct LogInner {
    opened: Vec<String>,
    opened_volumes: Vec<f32>,
    released: Vec<String>,
    volumes: Vec<f32>,
    live: usize,
    max_live: usize,
    failing: HashSet<String>,
    fail_release: bool,
}

/// Everything a [`RecordingProvider`] was asked to do.
#[derive(Default)]
pub struct ProviderLog {
    inner: Mutex<LogInner>,
}

impl ProviderLog {
    fn with<T>(&self, f: impl FnOnce(&mut LogInner) -> T) -> T {
        f(&mut self.inner.lock().unwrap())
    }

    pub fn fail_on(&self, uri: &str) {
        self.with(|log| log.failing.insert(uri.to_string()));
    }

    pub fn fail_release(&self) {
        self.with(|log| log.fail_release = true);
    }

    pub fn opened(&self) -> Vec<String> {
        self.with(|log| log.opened.clone())
    }

    pub fn opened_volumes(&self) -> Vec<f32> {
        self.with(|log| log.opened_volumes.clone())
    }

    pub fn released(&self) -> Vec<String> {
        self.with(|log| log.released.clone())
    }

    pub fn volumes(&self) -> Vec<f32> {
        self.with(|log| log.volumes.clone())
    }

    /// Handles currently alive.
    pub fn live(&self) -> usize {
        self.with(|log| log.live)
    }

    pub fn max_live(&self) -> usize {
        self.with(|log| log.max_live)
    }
}

pub struct FakeHandle {
    uri: String,
    log: Arc<ProviderLog>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.log.with(|log| log.live -= 1);
    }
}

/// In-memory provider that records calls and counts live handles.
#[derive(Default)]
pub struct RecordingProvider {
    log: Arc<ProviderLog>,
}

impl RecordingProvider {
    pub fn log(&self) -> Arc<ProviderLog> {
        self.log.clone()
    }
}

#[async_trait]
impl MediaProvider for RecordingProvider {
    type Handle = FakeHandle;

    async fn open(&self, uri: &str, volume: f32) -> Result<FakeHandle> {
        // Let other tasks run while "opening" so overlapping requests show up.
        tokio::task::yield_now().await;

        self.log.with(|log| {
            if log.failing.contains(uri) {
                return Err(anyhow!("cannot decode {uri}"));
            }
            log.opened.push(uri.to_string());
            log.opened_volumes.push(volume);
            log.live += 1;
            log.max_live = log.max_live.max(log.live);
            Ok(())
        })?;

        Ok(FakeHandle {
            uri: uri.to_string(),
            log: self.log.clone(),
        })
    }

    async fn set_volume(&self, _handle: &FakeHandle, volume: f32) -> Result<()> {
        self.log.with(|log| log.volumes.push(volume));
        Ok(())
    }

    async fn release(&self, handle: FakeHandle) -> Result<()> {
        tokio::task::yield_now().await;
        let fail = self.log.with(|log| {
            log.released.push(handle.uri.clone());
            log.fail_release
        });
        drop(handle);
        if fail {
            Err(anyhow!("release failed"))
        } else {
            Ok(())
        }
    }
}
