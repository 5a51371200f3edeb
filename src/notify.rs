use log::{info, warn};
use serde::Serialize;

use crate::timer::{PhaseTransition, SessionPhase};

/// "Session complete" message shown when a countdown rolls over.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub title: String,
    pub body: String,
    pub next_phase: SessionPhase,
}

impl From<&PhaseTransition> for Announcement {
    fn from(transition: &PhaseTransition) -> Self {
        Self {
            title: "Session Complete!".to_string(),
            body: transition.to.announcement().to_string(),
            next_phase: transition.to,
        }
    }
}

/// Surface that displays announcements to the user.
pub trait Notifier: Send + Sync {
    fn announce(&self, announcement: &Announcement) -> anyhow::Result<()>;
}

/// Writes announcements to the log. Used by the headless runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn announce(&self, announcement: &Announcement) -> anyhow::Result<()> {
        info!("{} {}", announcement.title, announcement.body);
        Ok(())
    }
}

/// Fire-and-forget delivery; a failed display never reaches the caller.
pub(crate) fn deliver(notifier: &dyn Notifier, announcement: &Announcement) {
    if let Err(err) = notifier.announce(announcement) {
        warn!("Failed to display announcement '{}': {err}", announcement.body);
    }
}
