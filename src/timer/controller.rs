use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    notify::{self, Announcement, Notifier},
};

use super::{PhaseTransition, SettingField, TimerSettings, TimerState};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub settings: TimerSettings,
    pub label: &'static str,
    pub display: String,
    pub cycle_display: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    StateChanged(TimerSnapshot),
    Heartbeat(TimerSnapshot),
    PhaseCompleted {
        transition: PhaseTransition,
        announcement: Announcement,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TimerOptions {
    pub tick_interval: Duration,
    pub heartbeat_every_ticks: u32,
    /// Keep counting into the next phase instead of stopping at each rollover.
    pub auto_continue: bool,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: 10,
            auto_continue: false,
        }
    }
}

struct Session {
    state: TimerState,
    settings: TimerSettings,
}

impl Session {
    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state.clone(),
            settings: self.settings,
            label: self.state.phase.label(),
            display: self.state.display(),
            cycle_display: self.state.cycle_display(&self.settings),
        }
    }
}

/// Owns the focus cycle and the one-second ticker that drives it.
///
/// All mutations go through one async mutex, so ticks and user actions are
/// serialized. The ticker only exists while the session is running.
#[derive(Clone)]
pub struct TimerController {
    session: Arc<Mutex<Session>>,
    events: broadcast::Sender<TimerEvent>,
    notifier: Arc<dyn Notifier>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    shutdown: CancellationToken,
    options: TimerOptions,
}

impl TimerController {
    pub fn new(settings: TimerSettings, options: TimerOptions, notifier: Arc<dyn Notifier>) -> Self {
        let settings = settings.clamped();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            session: Arc::new(Mutex::new(Session {
                state: TimerState::new(&settings),
                settings,
            })),
            events,
            notifier,
            ticker: Arc::new(Mutex::new(None)),
            shutdown: CancellationToken::new(),
            options: TimerOptions {
                heartbeat_every_ticks: options.heartbeat_every_ticks.max(1),
                ..options
            },
        }
    }

    pub fn from_config(config: &AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        let options = TimerOptions {
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if config.debug { 1 } else { 10 },
            auto_continue: config.auto_continue,
        };
        Self::new(config.timer, options, notifier)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> TimerState {
        self.session.lock().await.state.clone()
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        self.session.lock().await.snapshot()
    }

    pub async fn settings(&self) -> TimerSettings {
        self.session.lock().await.settings
    }

    pub async fn start(&self) -> TimerState {
        // The ticker lock is taken before the session lock and held through
        // the spawn, so tickers are installed in generation order.
        let mut ticker = self.ticker.lock().await;
        if self.shutdown.is_cancelled() {
            warn!("Ignoring start: timer controller has been shut down");
            return self.session.lock().await.state.clone();
        }

        let (generation, snapshot) = {
            let mut session = self.session.lock().await;
            if session.state.is_running {
                return session.state.clone();
            }
            let generation = session.state.start();
            (generation, session.snapshot())
        };

        info!(
            "Timer started in {:?} with {} remaining",
            snapshot.state.phase, snapshot.display
        );
        self.spawn_ticker(&mut ticker, generation);
        drop(ticker);

        self.emit(TimerEvent::StateChanged(snapshot.clone()));
        snapshot.state
    }

    pub async fn pause(&self) -> TimerState {
        let mut ticker = self.ticker.lock().await;
        let snapshot = {
            let mut session = self.session.lock().await;
            session.state.pause();
            session.snapshot()
        };
        abort_ticker(&mut ticker);
        drop(ticker);

        self.emit(TimerEvent::StateChanged(snapshot.clone()));
        snapshot.state
    }

    /// Start/pause button.
    pub async fn toggle(&self) -> TimerState {
        let running = self.session.lock().await.state.is_running;
        if running {
            self.pause().await
        } else {
            self.start().await
        }
    }

    pub async fn reset(&self) -> TimerState {
        let mut ticker = self.ticker.lock().await;
        let snapshot = {
            let mut session = self.session.lock().await;
            let settings = session.settings;
            session.state.reset(&settings);
            session.snapshot()
        };
        abort_ticker(&mut ticker);
        drop(ticker);

        info!("Timer reset to {}", snapshot.display);
        self.emit(TimerEvent::StateChanged(snapshot.clone()));
        snapshot.state
    }

    pub async fn update_settings(&self, settings: TimerSettings) -> TimerSettings {
        let snapshot = {
            let mut guard = self.session.lock().await;
            guard.settings = settings.clamped();
            guard.snapshot()
        };
        self.emit(TimerEvent::StateChanged(snapshot.clone()));
        snapshot.settings
    }

    pub async fn adjust_setting(&self, field: SettingField, steps: i32) -> TimerSettings {
        let current = self.settings().await;
        self.update_settings(current.adjust(field, steps)).await
    }

    /// Tears the controller down: cancels the ticker and refuses later starts.
    pub async fn shutdown(&self) {
        let mut ticker = self.ticker.lock().await;
        self.shutdown.cancel();
        self.session.lock().await.state.pause();
        abort_ticker(&mut ticker);
        info!("Timer controller shut down");
    }

    fn spawn_ticker(&self, slot: &mut Option<JoinHandle<()>>, generation: u64) {
        abort_ticker(slot);

        let session = self.session.clone();
        let events = self.events.clone();
        let notifier = self.notifier.clone();
        let shutdown = self.shutdown.clone();
        let TimerOptions {
            tick_interval,
            heartbeat_every_ticks,
            auto_continue,
        } = self.options;

        let handle = tokio::spawn(async move {
            // First tick lands one full interval after start; resuming never
            // fast-forwards.
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let (transition, snapshot, keep_running) = {
                    let mut guard = session.lock().await;
                    if !guard.state.is_running || guard.state.run_generation != generation {
                        break;
                    }
                    let settings = guard.settings;
                    let transition = guard.state.tick(generation, &settings);
                    if transition.is_some() && !auto_continue {
                        guard.state.pause();
                    }
                    (transition, guard.snapshot(), guard.state.is_running)
                };

                ticks = ticks.wrapping_add(1);

                if let Some(transition) = transition {
                    let announcement = Announcement::from(&transition);
                    info!(
                        "{:?} complete after {} work cycles; next {:?}",
                        transition.from, transition.completed_work_cycles, transition.to
                    );
                    notify::deliver(notifier.as_ref(), &announcement);
                    let _ = events.send(TimerEvent::PhaseCompleted {
                        transition,
                        announcement,
                    });
                    let _ = events.send(TimerEvent::StateChanged(snapshot));
                } else if ticks % heartbeat_every_ticks == 0 {
                    debug!("Timer heartbeat: {} remaining", snapshot.display);
                    let _ = events.send(TimerEvent::Heartbeat(snapshot));
                }

                if !keep_running {
                    break;
                }
            }
        });

        *slot = Some(handle);
    }

    #[cfg(test)]
    async fn ticker_alive(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn abort_ticker(slot: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = slot.take() {
        handle.abort();
    }
}
