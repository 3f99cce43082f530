//! Scheduler gate for automatic reconciliation
//!
//! A fixed-period tick asks the gate whether a pass is due:
//!
//! - auto-save disabled: nothing happens
//! - less than the configured interval since the last successful scheduled
//!   pass: nothing happens
//! - otherwise the save root is reconciled and the pass time recorded
//!
//! The last pass time lives in a [`SchedulerState`] owned by the gate and
//! shared with the background task. It starts empty, so the first eligible
//! tick always runs. Manual triggers ([`SyncEngine::trigger_sync`]) do not
//! read or write this state.
//!
//! Scheduled failures are logged and swallowed. The next tick retries.
//! Recoverable failures log at `warn`, everything else at `error`.

use crate::engine::SyncEngine;
use crate::types::ReconcileReport;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

/// Bookkeeping shared between the gate and its background task
#[derive(Debug, Default, Clone)]
pub struct SchedulerState {
    /// Start time of the last successful scheduled pass; `None` means never
    pub last_sync: Option<Instant>,
    /// Number of scheduled passes that ran
    pub runs: u64,
}

/// What a single tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// Auto-save is turned off
    Disabled,
    /// The interval has not elapsed yet
    NotDue {
        /// Time left before the next pass is due
        remaining: Duration,
    },
    /// A pass ran
    Ran(ReconcileReport),
    /// The pass (or reading the settings) failed; state is unchanged
    Failed(String),
}

/// Decides on each tick whether the scheduled pass runs
#[derive(Clone)]
pub struct SchedulerGate {
    engine: SyncEngine,
    state: Arc<Mutex<SchedulerState>>,
}

impl std::fmt::Debug for SchedulerGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerGate")
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl SchedulerGate {
    /// Gate running passes through `engine`
    pub fn new(engine: SyncEngine) -> Self {
        Self {
            engine,
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    /// Snapshot of the bookkeeping
    pub fn state(&self) -> SchedulerState {
        self.state.lock().clone()
    }

    /// Evaluate one tick happening at `now`
    pub fn tick_at(&self, now: Instant) -> TickOutcome {
        let settings = match self.engine.settings() {
            Ok(settings) => settings,
            Err(e) => {
                error!("Scheduled save skipped, settings unavailable: {}", e);
                return TickOutcome::Failed(e.to_string());
            }
        };

        if !settings.auto_save_enabled {
            trace!("Auto-save disabled");
            return TickOutcome::Disabled;
        }

        let interval = settings.interval();
        if let Some(last) = self.state.lock().last_sync {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < interval {
                return TickOutcome::NotDue {
                    remaining: interval - elapsed,
                };
            }
        }

        debug!("Scheduled save due");
        match self.engine.trigger_sync() {
            Ok(report) => {
                let mut state = self.state.lock();
                state.last_sync = Some(now);
                state.runs += 1;
                TickOutcome::Ran(report)
            }
            Err(e) => {
                if e.is_recoverable() {
                    warn!("Scheduled save failed, retrying next tick: {}", e);
                } else {
                    error!("Scheduled save failed and needs attention: {}", e.user_message());
                }
                TickOutcome::Failed(e.to_string())
            }
        }
    }

    /// Evaluate one tick now
    pub fn tick(&self) -> TickOutcome {
        self.tick_at(Instant::now())
    }

    /// Run the gate on the current tokio runtime every `period`
    ///
    /// Each pass runs on the blocking pool. Ticks that fall behind are
    /// skipped rather than bunched up.
    pub fn spawn(self, period: Duration) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!("Scheduler started (tick every {})", humantime::format_duration(period));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let gate = self.clone();
                        match tokio::task::spawn_blocking(move || gate.tick()).await {
                            Ok(TickOutcome::Ran(report)) => {
                                debug!("Scheduled save processed {} files", report.processed);
                            }
                            Ok(outcome) => trace!("Tick: {:?}", outcome),
                            Err(e) => error!("Scheduled save aborted: {}", e),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Scheduler stopped");
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running scheduler task
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop ticking and wait for an in-flight pass to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Scheduler task ended abnormally: {}", e);
        }
    }

    /// Whether the task has already exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
