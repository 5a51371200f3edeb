use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    error::StudyflowError,
    settings::{Preferences, SELECTED_THEME_KEY},
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: &'static str,
    pub name: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub background: &'static str,
    pub text: &'static str,
}

pub const THEMES: [Theme; 3] = [
    Theme {
        id: "aesthetic",
        name: "Aesthetic",
        primary: "#FF6B9D",
        secondary: "#A8E6CF",
        background: "#FFF8F0",
        text: "#2D3748",
    },
    Theme {
        id: "minimalist",
        name: "Minimalist",
        primary: "#667EEA",
        secondary: "#764BA2",
        background: "#F7FAFC",
        text: "#1A202C",
    },
    Theme {
        id: "warm",
        name: "Warm",
        primary: "#F6AD55",
        secondary: "#FC8181",
        background: "#FFFAF0",
        text: "#2D3748",
    },
];

pub const DEFAULT_THEME: Theme = THEMES[0];

pub fn find_theme(id: &str) -> Option<Theme> {
    THEMES.iter().copied().find(|theme| theme.id == id)
}

pub fn available_themes() -> impl Iterator<Item = &'static str> {
    THEMES.iter().map(|theme| theme.id)
}

#[derive(Clone)]
pub struct ThemeStore {
    prefs: Preferences,
    current: Arc<RwLock<Theme>>,
}

impl ThemeStore {
    /// Restores the saved theme; absent or unknown ids mean the default.
    pub async fn load(prefs: Preferences) -> Self {
        let current = match prefs.selected_theme().await {
            Some(id) => find_theme(&id).unwrap_or_else(|| {
                warn!("Saved {SELECTED_THEME_KEY} '{id}' is not a known theme");
                DEFAULT_THEME
            }),
            None => DEFAULT_THEME,
        };

        Self {
            prefs,
            current: Arc::new(RwLock::new(current)),
        }
    }

    pub async fn current(&self) -> Theme {
        *self.current.read().await
    }

    /// Switches theme. The in-memory choice sticks even if saving fails.
    pub async fn set_theme(&self, id: &str) -> Result<Theme, StudyflowError> {
        let theme = find_theme(id).ok_or_else(|| StudyflowError::UnknownTheme(id.to_string()))?;
        *self.current.write().await = theme;
        info!("Theme set to {}", theme.name);
        self.prefs.save_selected_theme(theme.id).await?;
        Ok(theme)
    }

    /// Forgets the saved choice and returns to the default theme.
    pub async fn reset(&self) -> Result<Theme, StudyflowError> {
        *self.current.write().await = DEFAULT_THEME;
        self.prefs.clear_selected_theme().await?;
        Ok(DEFAULT_THEME)
    }
}
