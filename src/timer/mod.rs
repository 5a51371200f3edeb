pub mod controller;
pub mod state;

pub use controller::{TimerController, TimerEvent, TimerOptions, TimerSnapshot};
pub use state::{PhaseTransition, SessionPhase, SettingField, TimerSettings, TimerState};
