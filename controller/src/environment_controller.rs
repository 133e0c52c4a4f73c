use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use scheduler_core::{expand, Action, ActionKind, ActionSource, BatchPolicy, Schedule};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use workload_driver::WorkloadDriver;

use crate::error::ControllerError;
use crate::state::{ControllerState, EnvState, EnvStateLabel, NamespaceStateEntry};

/// Default recalculation window (`W` in the main-loop description): 30 days.
pub const DEFAULT_RECALCULATION_WINDOW_DAYS: i64 = 30;
/// Default tick interval.
pub const DEFAULT_TICK_INTERVAL: StdDuration = StdDuration::from_secs(3);

struct Guarded {
    state: ControllerState,
    queue: VecDeque<Action>,
    next_recalculation_at: DateTime<Tz>,
}

/// One environment's scheduling state machine: owns its action queue and
/// drives a single workload driver. Safe to drive from its own task; no
/// state is shared across controllers.
pub struct EnvironmentController {
    env_name: String,
    schedule_name: String,
    schedule: Schedule,
    namespaces: Vec<String>,
    batch: Option<BatchPolicy>,
    recalculation_window: Duration,
    tick_interval: StdDuration,
    driver: Arc<dyn WorkloadDriver>,
    guarded: Mutex<Guarded>,
}

impl EnvironmentController {
    /// Builds a controller and performs its initial population: expands
    /// `[now, now + 2W]` into the queue and sets the recalculation cursor to
    /// `now + W`.
    pub fn new(
        env_name: impl Into<String>,
        schedule_name: impl Into<String>,
        schedule: Schedule,
        namespaces: Vec<String>,
        batch: Option<BatchPolicy>,
        driver: Arc<dyn WorkloadDriver>,
        now: DateTime<Tz>,
    ) -> Self {
        Self::with_recalculation_window(
            env_name,
            schedule_name,
            schedule,
            namespaces,
            batch,
            driver,
            now,
            Duration::days(DEFAULT_RECALCULATION_WINDOW_DAYS),
            DEFAULT_TICK_INTERVAL,
        )
    }

    pub fn with_recalculation_window(
        env_name: impl Into<String>,
        schedule_name: impl Into<String>,
        schedule: Schedule,
        namespaces: Vec<String>,
        batch: Option<BatchPolicy>,
        driver: Arc<dyn WorkloadDriver>,
        now: DateTime<Tz>,
        recalculation_window: Duration,
        tick_interval: StdDuration,
    ) -> Self {
        if recalculation_window <= Duration::zero() {
            panic!("recalculation window must be strictly positive");
        }
        if recalculation_window < Duration::days(1) {
            warn!(
                window_seconds = recalculation_window.num_seconds(),
                "recalculation window below one day; long ticks risk re-expanding executed instants"
            );
        }

        let until = now + recalculation_window * 2;
        let mut queue: VecDeque<Action> = expand(&schedule, now, until).into();

        let env_name = env_name.into();
        debug!(env = %env_name, queued = queue.len(), "initial population");

        // expand() already returns a sorted Vec; VecDeque::from preserves order.
        queue.make_contiguous().sort();

        Self {
            env_name,
            schedule_name: schedule_name.into(),
            schedule,
            namespaces,
            batch,
            recalculation_window,
            tick_interval,
            driver,
            guarded: Mutex::new(Guarded {
                state: ControllerState::Idle,
                queue,
                next_recalculation_at: now + recalculation_window,
            }),
        }
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn tick_interval(&self) -> StdDuration {
        self.tick_interval
    }

    /// Runs one iteration of the main loop described in the controller's
    /// design: recalculation if due, then dispatch if the queue head is due.
    #[instrument(skip(self), fields(env = %self.env_name))]
    pub async fn tick(&self, now: DateTime<Tz>) {
        self.recalculate_if_due(now).await;

        let Some(action) = self.dequeue_if_due(now).await else {
            return;
        };

        info!(env = %self.env_name, action = %action, "dispatching action");
        self.dispatch(&action).await;

        let mut guard = self.guarded.lock().await;
        guard.state = ControllerState::Idle;
    }

    async fn recalculate_if_due(&self, now: DateTime<Tz>) {
        let mut guard = self.guarded.lock().await;
        if now < guard.next_recalculation_at {
            return;
        }

        let window_start = guard.next_recalculation_at + self.recalculation_window;
        let window_end = guard.next_recalculation_at + self.recalculation_window * 2;
        let fresh = expand(&self.schedule, window_start, window_end);
        debug!(
            env = %self.env_name,
            from = %window_start,
            until = %window_end,
            added = fresh.len(),
            "recalculated action queue"
        );
        guard.queue.extend(fresh);
        guard.next_recalculation_at += self.recalculation_window;
    }

    /// Pops the queue head if it's due and the controller isn't already
    /// mid-action, transitioning to `ActionInProgress` under the guard.
    async fn dequeue_if_due(&self, now: DateTime<Tz>) -> Option<Action> {
        let mut guard = self.guarded.lock().await;

        if guard.state == ControllerState::ActionInProgress {
            return None;
        }
        let due = matches!(guard.queue.front(), Some(a) if a.when <= now);
        if !due {
            return None;
        }

        guard.state = ControllerState::ActionInProgress;
        guard.queue.pop_front()
    }

    async fn dispatch(&self, action: &Action) {
        let result = match action.kind {
            ActionKind::Down => self.driver.scale_down(&self.namespaces).await,
            ActionKind::Up => self.driver.scale_up(&self.namespaces, self.batch).await,
        };
        if let Err(err) = result {
            warn!(env = %self.env_name, error = %err, "driver call failed");
        }
    }

    /// Prepends a manual action to the queue, bypassing the holiday mask
    /// and any ordering against upcoming scheduled actions. Rejected while
    /// an action is in progress or another manual is already pending.
    pub async fn add_manual(&self, kind: ActionKind, now: DateTime<Tz>) -> Result<(), ControllerError> {
        let mut guard = self.guarded.lock().await;
        match guard.state {
            ControllerState::ActionInProgress => {
                return Err(ControllerError::AnotherActionInProgress(self.env_name.clone()))
            }
            ControllerState::ManualActionScheduled => {
                return Err(ControllerError::ManualAlreadyScheduled(self.env_name.clone()))
            }
            ControllerState::Idle => {}
        }

        guard
            .queue
            .push_front(Action::new(kind, ActionSource::Manual, now));
        guard.state = ControllerState::ManualActionScheduled;
        Ok(())
    }

    /// Reads the controller's own state and queue head under the guard,
    /// releases it, then (unless an action is in progress) fetches
    /// namespace state from the driver to fill in the rest of the snapshot.
    /// The driver call never runs while the guard is held.
    pub async fn snapshot(&self) -> EnvState {
        let (controller_state, next_action) = {
            let guard = self.guarded.lock().await;
            (guard.state, guard.queue.front().cloned())
        };

        if controller_state == ControllerState::ActionInProgress {
            return EnvState {
                env_name: self.env_name.clone(),
                env_state: EnvStateLabel::ActionInProgress,
                env_schedule: self.schedule_name.clone(),
                next_action,
                namespaces: Vec::new(),
            };
        }

        let states = match self.driver.get_state(&self.namespaces).await {
            Ok(states) => states,
            Err(err) => {
                warn!(env = %self.env_name, error = %err, "failed to fetch namespace state");
                Default::default()
            }
        };

        let any_up = states.values().any(|s| s.is_up());
        let namespaces = self
            .namespaces
            .iter()
            .map(|ns| NamespaceStateEntry {
                namespace_name: ns.clone(),
                state: states.get(ns).copied().unwrap_or(scheduler_core::NamespaceState {
                    pods: 0,
                    cpu: 0.0,
                    memory: 0,
                }),
            })
            .collect();

        EnvState {
            env_name: self.env_name.clone(),
            env_state: if any_up { EnvStateLabel::Up } else { EnvStateLabel::Down },
            env_schedule: self.schedule_name.clone(),
            next_action,
            namespaces,
        }
    }
}
