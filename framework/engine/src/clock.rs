use std::sync::Arc;
use std::time::Duration;

use benchview_core::prelude::{CancelHandle, EventBus, SessionCancelledError};
use benchview_model::{RequestEvent, SnapshotDelta, SystemId, SystemMetrics, VisibleEvents};
use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::ReplayError;
use crate::PLAYBACK_TOPIC;

/// How often a running clock recomputes and publishes. Fine enough that no event is revealed
/// more than one tick late at real-time speed.
pub(crate) const TICK_INTERVAL: Duration = Duration::from_millis(60);

/// Lifecycle of one per-system playback session.
///
/// `Idle` is both the initial state and the state reached after an explicit stop or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Finished,
}

pub(crate) struct ClockParams {
    pub system: SystemId,
    pub events: Arc<[RequestEvent]>,
    pub metrics: SystemMetrics,
    /// Replay speed multiplier; 1.0 replays in real time.
    pub speed: f64,
    pub bus: Arc<EventBus<SnapshotDelta>>,
}

/// A handle to one running (or finished) playback session.
///
/// The two sessions of a playback run are peers: each owns its own timer loop and cancel
/// handle exclusively, and neither waits for the other.
pub(crate) struct SessionHandle {
    system: SystemId,
    state: Arc<Mutex<SessionState>>,
    cancel: CancelHandle,
    task: Option<tokio::task::JoinHandle<()>>,
    started_at: Instant,
    total_duration_secs: f64,
}

impl SessionHandle {
    pub(crate) fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub(crate) fn started_at(&self) -> Instant {
        self.started_at
    }

    pub(crate) fn total_duration_secs(&self) -> f64 {
        self.total_duration_secs
    }

    /// Cancel the session's loop synchronously and transition to `Idle`. A tick that fires
    /// after this call never publishes.
    pub(crate) fn cancel(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        *self.state.lock() = SessionState::Idle;
    }

    /// Wait for the session's loop to end. Resolves to an error if the session was cancelled
    /// before it finished.
    pub(crate) async fn join(&mut self) -> Result<(), SessionCancelledError> {
        if let Some(task) = self.task.take() {
            // The task only ever ends by finishing or being cancelled; a join error here
            // would mean the loop panicked and there is nothing useful left to report.
            let _ = task.await;
        }
        match self.state() {
            SessionState::Finished => Ok(()),
            _ => Err(SessionCancelledError::default()),
        }
    }
}

/// Start the advancing loop for one system.
///
/// The metrics delta is published synchronously, before the loop is spawned, so that views
/// know the totals as soon as the session exists. Every subsequent publish happens from the
/// loop and is guarded by the session's own cancel listener.
pub(crate) fn start_session(params: ClockParams) -> SessionHandle {
    let ClockParams {
        system,
        events,
        metrics,
        speed,
        bus,
    } = params;

    let state = Arc::new(Mutex::new(SessionState::Running));
    let cancel = CancelHandle::new();
    let mut listener = cancel.new_listener();
    let total_duration_secs = metrics.total_duration_secs;
    let started_at = Instant::now();

    bus.publish(PLAYBACK_TOPIC, &SnapshotDelta::metrics(system, metrics));

    let task_state = state.clone();
    let task = tokio::spawn(async move {
        if total_duration_secs <= 0.0 {
            // Nothing to pace the reveal against; show everything and finish at once.
            bus.publish(
                PLAYBACK_TOPIC,
                &SnapshotDelta::tick(system, 1.0, VisibleEvents::full(events)),
            );
            *task_state.lock() = SessionState::Finished;
            return;
        }

        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut revealed = 0_usize;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = listener.cancelled() => break,
            }

            if listener.is_cancelled() {
                let error = ReplayError::TimerOverrun { system };
                log::debug!("Suppressing publish: {error}");
                break;
            }

            let elapsed_secs = started_at.elapsed().as_secs_f64() * speed;
            let progress = (elapsed_secs / total_duration_secs).min(1.0);
            let cutoff_secs = progress * total_duration_secs;

            // Clamped non-shrinking: within one run the revealed prefix only grows. At the
            // end of the timeline the whole sequence is revealed, even if a trace row lies
            // beyond the summary's total duration.
            revealed = if progress >= 1.0 {
                events.len()
            } else {
                revealed.max(events.partition_point(|e| e.offset_secs <= cutoff_secs))
            };

            bus.publish(
                PLAYBACK_TOPIC,
                &SnapshotDelta::tick(
                    system,
                    progress,
                    VisibleEvents::new(events.clone(), revealed),
                ),
            );

            if progress >= 1.0 {
                log::debug!("Playback finished for {system}");
                *task_state.lock() = SessionState::Finished;
                break;
            }
        }
    });

    SessionHandle {
        system,
        state,
        cancel,
        task: Some(task),
        started_at,
        total_duration_secs,
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("system", &self.system)
            .field("state", &self.state())
            .field("total_duration_secs", &self.total_duration_secs)
            .finish()
    }
}
