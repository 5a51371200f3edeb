pub mod audio;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod notify;
pub mod settings;
pub mod theme;
pub mod timer;
pub mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::broadcast::error::RecvError;

use audio::{AudioEngine, MediaProvider, PlaybackGuard};
use config::AppConfig;
use db::Database;
use media::{MediaController, MediaLibrary};
use models::MediaKind;
use notify::{LogNotifier, Notifier};
use settings::Preferences;
use theme::ThemeStore;
use timer::{TimerController, TimerEvent};

pub use error::{Result, StudyflowError};

/// Everything the app shares, built once at startup and handed out by
/// reference. Clones of the inner handles all point at the same state.
pub struct AppState<P: MediaProvider = AudioEngine> {
    pub config: AppConfig,
    pub prefs: Preferences,
    pub theme: ThemeStore,
    pub timer: TimerController,
    pub media: Arc<MediaController<P>>,
}

impl AppState<AudioEngine> {
    /// Opens the preference database under `config.data_dir` and wires the
    /// rodio engine. A database that can't be opened degrades to in-memory
    /// preferences rather than failing startup.
    pub async fn bootstrap(config: AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        let prefs = match Database::new(config.database_path()) {
            Ok(database) => Preferences::new(Arc::new(database)),
            Err(err) => {
                error!("Preferences unavailable, using in-memory defaults: {err:#}");
                Preferences::in_memory()
            }
        };

        Self::assemble(config, prefs, AudioEngine::new(), notifier).await
    }
}

impl<P: MediaProvider> AppState<P> {
    pub async fn assemble(
        config: AppConfig,
        prefs: Preferences,
        provider: P,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let theme = ThemeStore::load(prefs.clone()).await;
        let library = MediaLibrary::load(prefs.clone()).await;
        let guard = Arc::new(PlaybackGuard::new(provider, config.default_volume));
        let timer = TimerController::from_config(&config, notifier);

        Self {
            config,
            prefs,
            theme,
            timer,
            media: Arc::new(MediaController::new(library, guard)),
        }
    }

    /// Cancels the ticker and releases any playback handle.
    pub async fn shutdown(&self) {
        self.timer.shutdown().await;
        self.media.stop().await;
    }
}

/// Headless runner: one focus phase (or continuous cycles with
/// `STUDYFLOW_AUTO_CONTINUE`), optional ambient loop, exit on Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    utils::logging::init_logging(config.debug);

    info!("StudyFlow starting up...");

    let app = AppState::bootstrap(config, Arc::new(LogNotifier)).await;
    info!("Theme: {}", app.theme.current().await.name);

    if let Some(location) = app.config.ambient.clone() {
        start_ambient(&app, &location).await;
    }

    let mut events = app.timer.subscribe();
    let snapshot = app.timer.get_snapshot().await;
    info!("{} {} ({})", snapshot.label, snapshot.display, snapshot.cycle_display);
    app.timer.start().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(TimerEvent::Heartbeat(snapshot)) => {
                    info!("{} {} ({})", snapshot.label, snapshot.display, snapshot.cycle_display);
                }
                Ok(TimerEvent::PhaseCompleted { .. }) if !app.config.auto_continue => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {skipped} timer events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    app.shutdown().await;
    info!("StudyFlow stopped");
    Ok(())
}

async fn start_ambient<P: MediaProvider>(app: &AppState<P>, location: &str) {
    let existing = app
        .media
        .assets()
        .await
        .into_iter()
        .find(|asset| asset.source_location == location);
    let asset = match existing {
        Some(asset) => asset,
        None => {
            app.media
                .import(location, MediaKind::from_location(location))
                .await
        }
    };

    if let Err(err) = app.media.play(&asset.id).await {
        warn!("Continuing without ambient sound: {err}");
    }
}
