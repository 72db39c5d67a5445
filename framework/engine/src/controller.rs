use std::collections::HashMap;
use std::sync::Arc;

use benchview_core::prelude::{EventBus, SessionCancelledError};
use benchview_model::{SnapshotDelta, SystemId, VisibleEvents};

use crate::clock::{self, ClockParams, SessionHandle, SessionState};
use crate::source::{self, LoadedSource, TraceSource};
use crate::PLAYBACK_TOPIC;

/// Orchestrates the trace parser, metrics resolver and the two per-system playback clocks
/// into coherent playback runs, publishing all state onto the bus it was given.
///
/// The dashboard has two presentation modes and both go through here: the static mode shows
/// the whole trace at rest (published on source selection and on stop), the dynamic mode
/// replays the trace incrementally (a running pair of sessions).
pub struct PlaybackController {
    bus: Arc<EventBus<SnapshotDelta>>,
    sources: Vec<TraceSource>,
    speed: f64,
    loaded: Option<LoadedSource>,
    sessions: HashMap<SystemId, SessionHandle>,
}

impl PlaybackController {
    pub fn new(bus: Arc<EventBus<SnapshotDelta>>, sources: Vec<TraceSource>) -> Self {
        Self {
            bus,
            sources,
            speed: 1.0,
            loaded: None,
            sessions: HashMap::new(),
        }
    }

    /// Set the replay speed multiplier. Non-positive values are rejected and replaced with
    /// real-time speed.
    pub fn with_speed(mut self, speed: f64) -> Self {
        if speed > 0.0 {
            self.speed = speed;
        } else {
            log::warn!("Ignoring non-positive replay speed {speed}, using 1.0");
            self.speed = 1.0;
        }
        self
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|source| source.id.as_str())
    }

    /// The source currently loaded, if any.
    pub fn loaded(&self) -> Option<&LoadedSource> {
        self.loaded.as_ref()
    }

    pub fn state(&self, system: SystemId) -> SessionState {
        self.sessions
            .get(&system)
            .map(SessionHandle::state)
            .unwrap_or(SessionState::Idle)
    }

    pub fn is_running(&self) -> bool {
        SystemId::ALL
            .iter()
            .any(|system| self.state(*system) == SessionState::Running)
    }

    /// Load a trace source and publish its at-rest snapshots.
    ///
    /// Any in-flight sessions are stopped and discarded *before* the new source's data is
    /// loaded, so an old session can never publish events belonging to the previous source.
    /// Loading itself never fails; only an unknown id is an error.
    pub fn select_source(&mut self, id: &str) -> anyhow::Result<()> {
        self.cancel_sessions();
        self.loaded = None;

        let source = self
            .sources
            .iter()
            .find(|source| source.id == id)
            .ok_or_else(|| anyhow::anyhow!("Unknown trace source [{id}]"))?;

        let loaded = source::load(source);
        self.publish_at_rest(&loaded);
        self.loaded = Some(loaded);
        Ok(())
    }

    /// Begin a dynamic replay: one fresh session per system, each advancing from progress 0.
    ///
    /// Only valid while no session is running. A finished pair is discarded and replaced, so
    /// repeated start/finish cycles behave like repeated replays. Sessions are peers; each
    /// finishes on its own schedule.
    pub fn start(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.is_running(), "Playback is already running");
        let Some(loaded) = &self.loaded else {
            anyhow::bail!("No trace source selected");
        };

        log::info!(
            "Starting replay of [{}] at {}x speed",
            loaded.id,
            self.speed
        );

        let mut sessions = HashMap::new();
        for system in SystemId::ALL {
            let handle = clock::start_session(ClockParams {
                system,
                events: loaded.events(system).clone(),
                metrics: loaded.metrics.get(system).clone(),
                speed: self.speed,
                bus: self.bus.clone(),
            });
            sessions.insert(system, handle);
        }

        // Discarding the previous handles also cancels anything left of them.
        self.sessions = sessions;
        Ok(())
    }

    /// Stop playback and republish the at-rest snapshots, so the dashboard shows the complete
    /// trace instead of a frozen partial replay. Valid from any state; a no-op when idle with
    /// no source loaded.
    pub fn stop(&mut self) {
        self.cancel_sessions();
        if let Some(loaded) = &self.loaded {
            self.publish_at_rest(loaded);
        }
    }

    /// Stop playback and discard the loaded source's event sequences. The next replay needs a
    /// fresh [PlaybackController::select_source].
    pub fn reset(&mut self) {
        self.cancel_sessions();
        self.loaded = None;
    }

    /// Wait until both sessions have ended. Resolves to an error if either session was
    /// cancelled before reaching the end of its timeline.
    pub async fn join(&mut self) -> Result<(), SessionCancelledError> {
        let mut result = Ok(());
        for handle in self.sessions.values_mut() {
            if let Err(e) = handle.join().await {
                result = Err(e);
            }
        }
        result
    }

    fn cancel_sessions(&mut self) {
        for (system, mut handle) in self.sessions.drain() {
            if handle.state() == SessionState::Running {
                log::debug!(
                    "Cancelling in-flight session for {system} after {:.1} s of {:.1} s",
                    handle.started_at().elapsed().as_secs_f64(),
                    handle.total_duration_secs()
                );
            }
            handle.cancel();
        }
    }

    fn publish_at_rest(&self, loaded: &LoadedSource) {
        for system in SystemId::ALL {
            self.bus.publish(
                PLAYBACK_TOPIC,
                &SnapshotDelta::at_rest(
                    system,
                    VisibleEvents::full(loaded.events(system).clone()),
                    loaded.metrics.get(system).clone(),
                ),
            );
        }
    }
}
