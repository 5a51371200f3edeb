use std::path::PathBuf;

use log::warn;

use crate::{audio::DEFAULT_VOLUME, timer::TimerSettings};

const APP_DIR_NAME: &str = "studyflow";

/// Process-level configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub timer: TimerSettings,
    pub auto_continue: bool,
    pub debug: bool,
    pub default_volume: f32,
    /// File to loop as ambient sound in the headless runner.
    pub ambient: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            timer: TimerSettings::default(),
            auto_continue: false,
            debug: false,
            default_volume: DEFAULT_VOLUME,
            ambient: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlays `STUDYFLOW_*` values onto the defaults. Bad values are logged
    /// and ignored; out-of-range durations are clamped.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("STUDYFLOW_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        let defaults = config.timer;
        config.timer = TimerSettings {
            work_minutes: number(&lookup, "STUDYFLOW_WORK_MINUTES", defaults.work_minutes),
            break_minutes: number(&lookup, "STUDYFLOW_BREAK_MINUTES", defaults.break_minutes),
            long_break_minutes: number(
                &lookup,
                "STUDYFLOW_LONG_BREAK_MINUTES",
                defaults.long_break_minutes,
            ),
            cycles_before_long_break: number(
                &lookup,
                "STUDYFLOW_CYCLES",
                defaults.cycles_before_long_break,
            ),
        }
        .clamped();

        config.auto_continue = flag(&lookup, "STUDYFLOW_AUTO_CONTINUE");
        config.debug = flag(&lookup, "STUDYFLOW_DEBUG");
        config.ambient = lookup("STUDYFLOW_AMBIENT").filter(|path| !path.trim().is_empty());
        config
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("studyflow.sqlite3")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

fn number(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(value) => value,
            Err(err) => {
                warn!("Ignoring {key}={raw:?}: {err}");
                default
            }
        },
        None => default,
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
