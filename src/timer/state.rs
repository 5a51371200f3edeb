use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::StudyflowError;

pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;
pub const DEFAULT_CYCLES_BEFORE_LONG_BREAK: u32 = 4;

const MIN_VALUE: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SettingField {
    WorkMinutes,
    BreakMinutes,
    LongBreakMinutes,
    CyclesBeforeLongBreak,
}

impl SettingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingField::WorkMinutes => "workMinutes",
            SettingField::BreakMinutes => "breakMinutes",
            SettingField::LongBreakMinutes => "longBreakMinutes",
            SettingField::CyclesBeforeLongBreak => "cyclesBeforeLongBreak",
        }
    }

    /// Step used by the +/- controls on the settings panel.
    pub fn step(&self) -> u32 {
        match self {
            SettingField::WorkMinutes | SettingField::LongBreakMinutes => 5,
            SettingField::BreakMinutes | SettingField::CyclesBeforeLongBreak => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub long_break_minutes: u32,
    pub cycles_before_long_break: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
            long_break_minutes: DEFAULT_LONG_BREAK_MINUTES,
            cycles_before_long_break: DEFAULT_CYCLES_BEFORE_LONG_BREAK,
        }
    }
}

impl TimerSettings {
    /// Strict constructor: rejects the first out-of-range value.
    pub fn try_new(
        work_minutes: u32,
        break_minutes: u32,
        long_break_minutes: u32,
        cycles_before_long_break: u32,
    ) -> Result<Self, StudyflowError> {
        let settings = Self {
            work_minutes,
            break_minutes,
            long_break_minutes,
            cycles_before_long_break,
        };
        match settings.violations().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(settings),
        }
    }

    /// Clamps every field to its minimum, logging each correction.
    pub fn clamped(self) -> Self {
        for violation in self.violations() {
            warn!("{violation}");
        }
        Self {
            work_minutes: self.work_minutes.max(MIN_VALUE),
            break_minutes: self.break_minutes.max(MIN_VALUE),
            long_break_minutes: self.long_break_minutes.max(MIN_VALUE),
            cycles_before_long_break: self.cycles_before_long_break.max(MIN_VALUE),
        }
    }

    pub fn get(&self, field: SettingField) -> u32 {
        match field {
            SettingField::WorkMinutes => self.work_minutes,
            SettingField::BreakMinutes => self.break_minutes,
            SettingField::LongBreakMinutes => self.long_break_minutes,
            SettingField::CyclesBeforeLongBreak => self.cycles_before_long_break,
        }
    }

    pub fn with(mut self, field: SettingField, value: u32) -> Self {
        let slot = match field {
            SettingField::WorkMinutes => &mut self.work_minutes,
            SettingField::BreakMinutes => &mut self.break_minutes,
            SettingField::LongBreakMinutes => &mut self.long_break_minutes,
            SettingField::CyclesBeforeLongBreak => &mut self.cycles_before_long_break,
        };
        *slot = value.max(MIN_VALUE);
        self
    }

    /// Moves `field` by `steps` increments of its panel step, never below 1.
    pub fn adjust(self, field: SettingField, steps: i32) -> Self {
        let delta = i64::from(steps) * i64::from(field.step());
        let next = (i64::from(self.get(field)) + delta).clamp(MIN_VALUE as i64, u32::MAX as i64);
        self.with(field, next as u32)
    }

    pub fn phase_seconds(&self, phase: SessionPhase) -> u64 {
        let minutes = match phase {
            SessionPhase::Work => self.work_minutes,
            SessionPhase::Break => self.break_minutes,
            SessionPhase::LongBreak => self.long_break_minutes,
        };
        u64::from(minutes.max(MIN_VALUE)) * 60
    }

    fn violations(&self) -> Vec<StudyflowError> {
        [
            SettingField::WorkMinutes,
            SettingField::BreakMinutes,
            SettingField::LongBreakMinutes,
            SettingField::CyclesBeforeLongBreak,
        ]
        .into_iter()
        .filter(|field| self.get(*field) < MIN_VALUE)
        .map(|field| StudyflowError::Configuration {
            field: field.as_str(),
            value: self.get(field).to_string(),
            clamped: MIN_VALUE,
        })
        .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Work,
    Break,
    LongBreak,
}

impl SessionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Work => "FOCUS TIME",
            SessionPhase::Break => "SHORT BREAK",
            SessionPhase::LongBreak => "LONG BREAK",
        }
    }

    /// Wording used in the "session complete" announcement for entering this phase.
    pub fn announcement(&self) -> &'static str {
        match self {
            SessionPhase::Work => "Time for a work session!",
            SessionPhase::Break => "Time for a break!",
            SessionPhase::LongBreak => "Time for a long break!",
        }
    }
}

/// Emitted when a countdown reaches zero and the cycle advances.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTransition {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub completed_work_cycles: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub seconds_remaining: u64,
    pub phase: SessionPhase,
    pub is_running: bool,
    pub completed_work_cycles: u32,
    /// Bumped on every start so a ticker spawned for an earlier run can
    /// recognise it is stale and never decrements twice.
    #[serde(skip)]
    pub run_generation: u64,
}

impl TimerState {
    pub fn new(settings: &TimerSettings) -> Self {
        Self {
            seconds_remaining: settings.phase_seconds(SessionPhase::Work),
            phase: SessionPhase::Work,
            is_running: false,
            completed_work_cycles: 0,
            run_generation: 0,
        }
    }

    /// Flips `is_running`. Phase and remaining time are untouched.
    pub fn toggle(&mut self) -> bool {
        if self.is_running {
            self.pause();
        } else {
            self.start();
        }
        self.is_running
    }

    pub fn start(&mut self) -> u64 {
        if !self.is_running {
            self.is_running = true;
            self.run_generation = self.run_generation.wrapping_add(1);
        }
        self.run_generation
    }

    pub fn pause(&mut self) {
        self.is_running = false;
    }

    pub fn reset(&mut self, settings: &TimerSettings) {
        self.is_running = false;
        self.phase = SessionPhase::Work;
        self.completed_work_cycles = 0;
        self.seconds_remaining = settings.phase_seconds(SessionPhase::Work);
    }

    /// Applies one elapsed second for the ticker of `generation`.
    ///
    /// A tick from a stale generation, or while paused, is a no-op. Reaching
    /// zero advances the phase in the same step; zero is never observable.
    pub fn tick(&mut self, generation: u64, settings: &TimerSettings) -> Option<PhaseTransition> {
        if !self.is_running || generation != self.run_generation {
            return None;
        }

        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining > 0 {
            return None;
        }

        Some(self.complete_phase(settings))
    }

    fn complete_phase(&mut self, settings: &TimerSettings) -> PhaseTransition {
        let from = self.phase;
        let to = match from {
            SessionPhase::Work => {
                self.completed_work_cycles = self.completed_work_cycles.saturating_add(1);
                let cycles = settings.cycles_before_long_break.max(MIN_VALUE);
                if self.completed_work_cycles % cycles == 0 {
                    SessionPhase::LongBreak
                } else {
                    SessionPhase::Break
                }
            }
            SessionPhase::Break | SessionPhase::LongBreak => SessionPhase::Work,
        };

        self.phase = to;
        self.seconds_remaining = settings.phase_seconds(to);

        PhaseTransition {
            from,
            to,
            completed_work_cycles: self.completed_work_cycles,
        }
    }

    pub fn display(&self) -> String {
        format_mmss(self.seconds_remaining)
    }

    /// "Cycle N of M", N counting within the current long-break round.
    pub fn cycle_display(&self, settings: &TimerSettings) -> String {
        let cycles = settings.cycles_before_long_break.max(MIN_VALUE);
        format!("Cycle {} of {}", self.completed_work_cycles % cycles + 1, cycles)
    }
}

pub fn format_mmss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_zero(state: &mut TimerState, settings: &TimerSettings) -> PhaseTransition {
        let generation = state.start();
        loop {
            if let Some(transition) = state.tick(generation, settings) {
                return transition;
            }
        }
    }

    #[test]
    fn new_state_starts_in_work_at_full_duration() {
        let settings = TimerSettings::default();
        let state = TimerState::new(&settings);
        assert_eq!(state.phase, SessionPhase::Work);
        assert_eq!(state.seconds_remaining, 25 * 60);
        assert!(!state.is_running);
        assert_eq!(state.completed_work_cycles, 0);
    }

    #[test]
    fn pomodoro_cycle_reaches_long_break_on_fourth_work_phase() {
        let settings = TimerSettings::try_new(25, 5, 15, 4).unwrap();
        let mut state = TimerState::new(&settings);

        let mut work_outcomes = Vec::new();
        for _ in 0..4 {
            let transition = run_to_zero(&mut state, &settings);
            assert_eq!(transition.from, SessionPhase::Work);
            work_outcomes.push(transition.to);
            if transition.to == SessionPhase::Break {
                assert_eq!(state.seconds_remaining, 5 * 60);
                let back = run_to_zero(&mut state, &settings);
                assert_eq!(back.to, SessionPhase::Work);
                assert_eq!(state.seconds_remaining, 25 * 60);
            }
        }

        assert_eq!(
            work_outcomes,
            vec![
                SessionPhase::Break,
                SessionPhase::Break,
                SessionPhase::Break,
                SessionPhase::LongBreak
            ]
        );
        assert_eq!(state.completed_work_cycles, 4);
        assert_eq!(state.phase, SessionPhase::LongBreak);
        assert_eq!(state.seconds_remaining, 15 * 60);
    }

    #[test]
    fn long_break_lands_exactly_on_every_nth_completion() {
        for cycles in 1..=6 {
            let settings = TimerSettings::try_new(1, 1, 1, cycles).unwrap();
            let mut state = TimerState::new(&settings);
            for completion in 1..=(cycles * 2) {
                let transition = run_to_zero(&mut state, &settings);
                let expected = if completion % cycles == 0 {
                    SessionPhase::LongBreak
                } else {
                    SessionPhase::Break
                };
                assert_eq!(transition.to, expected, "cycles={cycles} completion={completion}");
                run_to_zero(&mut state, &settings);
            }
        }
    }

    #[test]
    fn tick_is_ignored_while_paused() {
        let settings = TimerSettings::default();
        let mut state = TimerState::new(&settings);
        let generation = state.start();
        state.tick(generation, &settings);
        state.pause();
        let frozen = state.seconds_remaining;
        for _ in 0..10 {
            assert!(state.tick(generation, &settings).is_none());
        }
        assert_eq!(state.seconds_remaining, frozen);
    }

    #[test]
    fn stale_generation_cannot_decrement_after_resume() {
        let settings = TimerSettings::default();
        let mut state = TimerState::new(&settings);
        let first = state.start();
        state.pause();
        let second = state.start();
        assert_ne!(first, second);

        let before = state.seconds_remaining;
        state.tick(first, &settings);
        assert_eq!(state.seconds_remaining, before);
        state.tick(second, &settings);
        assert_eq!(state.seconds_remaining, before - 1);
    }

    #[test]
    fn toggle_keeps_phase_and_remaining() {
        let settings = TimerSettings::default();
        let mut state = TimerState::new(&settings);
        let before = (state.phase, state.seconds_remaining);
        assert!(state.toggle());
        assert!(!state.toggle());
        assert_eq!((state.phase, state.seconds_remaining), before);
    }

    #[test]
    fn reset_from_any_phase_returns_to_fresh_work() {
        let settings = TimerSettings::try_new(2, 1, 3, 2).unwrap();
        let mut state = TimerState::new(&settings);
        run_to_zero(&mut state, &settings);
        run_to_zero(&mut state, &settings);
        run_to_zero(&mut state, &settings);
        assert_eq!(state.phase, SessionPhase::LongBreak);
        state.start();

        state.reset(&settings);
        assert_eq!(state.phase, SessionPhase::Work);
        assert_eq!(state.completed_work_cycles, 0);
        assert!(!state.is_running);
        assert_eq!(state.seconds_remaining, 120);
    }

    #[test]
    fn adjust_clamps_to_one_minute() {
        let settings = TimerSettings::default()
            .adjust(SettingField::WorkMinutes, -10)
            .adjust(SettingField::BreakMinutes, -10);
        assert_eq!(settings.work_minutes, 1);
        assert_eq!(settings.break_minutes, 1);

        let settings = settings.adjust(SettingField::WorkMinutes, 1);
        assert_eq!(settings.work_minutes, 6);
    }

    #[test]
    fn try_new_rejects_zero_and_clamped_repairs_it() {
        let err = TimerSettings::try_new(0, 5, 15, 4).unwrap_err();
        assert!(matches!(
            err,
            StudyflowError::Configuration { field: "workMinutes", .. }
        ));

        let repaired = TimerSettings {
            work_minutes: 0,
            break_minutes: 0,
            long_break_minutes: 15,
            cycles_before_long_break: 0,
        }
        .clamped();
        assert_eq!(repaired.work_minutes, 1);
        assert_eq!(repaired.break_minutes, 1);
        assert_eq!(repaired.cycles_before_long_break, 1);
    }

    #[test]
    fn display_helpers_format_countdown_and_cycle() {
        let settings = TimerSettings::default();
        let mut state = TimerState::new(&settings);
        assert_eq!(state.display(), "25:00");
        assert_eq!(state.cycle_display(&settings), "Cycle 1 of 4");
        state.seconds_remaining = 61;
        state.completed_work_cycles = 5;
        assert_eq!(state.display(), "01:01");
        assert_eq!(state.cycle_display(&settings), "Cycle 2 of 4");
    }
}
