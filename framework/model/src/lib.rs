use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifies one of the two compared systems.
///
/// The two systems are peers. Nothing in the replay engine orders one ahead of the other, they
/// just carry different traces and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemId {
    A,
    B,
}

impl SystemId {
    pub const ALL: [SystemId; 2] = [SystemId::A, SystemId::B];

    pub fn label(&self) -> &'static str {
        match self {
            SystemId::A => "system-a",
            SystemId::B => "system-b",
        }
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The result of one replayed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Ok,
    Fail,
}

/// One replayed unit of load-test traffic.
///
/// Created once per parse of a trace file and immutable afterwards. The playback controller
/// owns the sequence for the duration of one playback session and discards it when a new
/// source is selected or playback is reset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestEvent {
    /// Seconds since the first recorded event of the trace. Monotonically non-decreasing in
    /// trace order when the source is sorted, ties allowed.
    pub offset_secs: f64,
    pub outcome: Outcome,
    /// Observed duration of this request, or the system's average response time when the
    /// source trace has no per-event latency (see [LatencySource]).
    pub latency_secs: f64,
}

/// The trace file layout produced by the external load-testing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Rich tabular trace: epoch-ms timestamp, status code and per-request latency columns.
    Rich,
    /// Minimal trace: a pre-normalized offset and a status string, nothing else.
    Minimal,
}

/// Where the per-event latency in a parsed trace came from.
///
/// Minimal traces carry no per-event latency, so the controller fills it in from the system's
/// average response time. That is a documented approximation of the original data, not a
/// measurement, and consumers may want to present it differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencySource {
    Measured,
    ApproximatedFromAverage,
}

/// Default total duration used when no summary document is available, in seconds.
pub const DEFAULT_TOTAL_DURATION_SECS: f64 = 60.0;

/// Default completed-request count used when no summary document is available.
pub const DEFAULT_COMPLETED_COUNT: u64 = 643;

/// Summary statistics for one compared system.
///
/// Loaded once per source selection and shared read-only between the playback clock (which
/// needs the total duration) and the metrics view. Never absent: resolution falls back to
/// [SystemMetrics::fallback_for] instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub avg_response_secs: f64,
    pub throughput_kbs: f64,
    pub error_count: u64,
    pub completed_count: u64,
    pub total_duration_secs: f64,
}

impl SystemMetrics {
    /// The built-in default record for one system, used whenever the summary document is
    /// absent or malformed.
    pub fn fallback_for(system: SystemId) -> Self {
        match system {
            SystemId::A => Self {
                avg_response_secs: 0.350,
                throughput_kbs: 200.0,
                error_count: 7,
                completed_count: DEFAULT_COMPLETED_COUNT,
                total_duration_secs: DEFAULT_TOTAL_DURATION_SECS,
            },
            SystemId::B => Self {
                avg_response_secs: 0.180,
                throughput_kbs: 350.0,
                error_count: 1,
                completed_count: DEFAULT_COMPLETED_COUNT,
                total_duration_secs: DEFAULT_TOTAL_DURATION_SECS,
            },
        }
    }
}

/// The revealed prefix of one system's event sequence.
///
/// The full sequence is shared behind an [Arc] so that per-tick snapshots are cheap to clone;
/// only the revealed length changes between ticks.
#[derive(Debug, Clone)]
pub struct VisibleEvents {
    events: Arc<[RequestEvent]>,
    revealed: usize,
}

impl VisibleEvents {
    pub fn new(events: Arc<[RequestEvent]>, revealed: usize) -> Self {
        let revealed = revealed.min(events.len());
        Self { events, revealed }
    }

    pub fn empty() -> Self {
        Self {
            events: Arc::from(Vec::new()),
            revealed: 0,
        }
    }

    /// The whole sequence revealed at once, as used by at-rest snapshots.
    pub fn full(events: Arc<[RequestEvent]>) -> Self {
        let revealed = events.len();
        Self { events, revealed }
    }

    pub fn as_slice(&self) -> &[RequestEvent] {
        &self.events[..self.revealed]
    }

    pub fn len(&self) -> usize {
        self.revealed
    }

    pub fn is_empty(&self) -> bool {
        self.revealed == 0
    }

    /// Total number of events in the underlying sequence, revealed or not.
    pub fn total(&self) -> usize {
        self.events.len()
    }
}

/// The latest known playback state for one system, as merged by a consumer.
///
/// Within one running session the revealed prefix only ever grows; a replay never un-reveals
/// an event.
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub system: SystemId,
    /// In `[0, 1]`.
    pub progress_ratio: f64,
    pub visible: VisibleEvents,
    pub metrics: SystemMetrics,
}

impl PlaybackSnapshot {
    /// The state a consumer renders before its first message arrives.
    pub fn initial(system: SystemId) -> Self {
        Self {
            system,
            progress_ratio: 0.0,
            visible: VisibleEvents::empty(),
            metrics: SystemMetrics::fallback_for(system),
        }
    }

    /// Merge a partial update, last write wins per field.
    pub fn merge(&mut self, delta: &SnapshotDelta) {
        debug_assert_eq!(self.system, delta.system);
        if let Some(progress) = delta.progress_ratio {
            self.progress_ratio = progress;
        }
        if let Some(visible) = &delta.visible {
            self.visible = visible.clone();
        }
        if let Some(metrics) = &delta.metrics {
            self.metrics = metrics.clone();
        }
    }
}

/// The unit broadcast on the event bus.
///
/// Deltas are partial: a given publish may carry only the fields relevant to it (metrics once
/// at session start, progress and visible events each tick). Consumers merge deltas into a
/// [PlaybackSnapshot] and must tolerate any subset being present.
#[derive(Debug, Clone)]
pub struct SnapshotDelta {
    pub system: SystemId,
    pub progress_ratio: Option<f64>,
    pub visible: Option<VisibleEvents>,
    pub metrics: Option<SystemMetrics>,
}

impl SnapshotDelta {
    /// Metrics became known for this system, nothing else changed.
    pub fn metrics(system: SystemId, metrics: SystemMetrics) -> Self {
        Self {
            system,
            progress_ratio: None,
            visible: None,
            metrics: Some(metrics),
        }
    }

    /// One tick of a running session.
    pub fn tick(system: SystemId, progress_ratio: f64, visible: VisibleEvents) -> Self {
        Self {
            system,
            progress_ratio: Some(progress_ratio),
            visible: Some(visible),
            metrics: None,
        }
    }

    /// The at-rest state: full trace revealed, playback not running.
    pub fn at_rest(system: SystemId, visible: VisibleEvents, metrics: SystemMetrics) -> Self {
        Self {
            system,
            progress_ratio: Some(1.0),
            visible: Some(visible),
            metrics: Some(metrics),
        }
    }
}
