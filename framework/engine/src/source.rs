use std::path::{Path, PathBuf};
use std::sync::Arc;

use benchview_model::{LatencySource, RequestEvent, SchemaKind, SystemId};

use crate::error::ReplayError;
use crate::parser;
use crate::resolver::{self, MetricsPair};

/// Default status column value classified as a success. The traces record create operations,
/// which report `201` on success.
pub const DEFAULT_SUCCESS_STATUS: &str = "201";

/// JSON keys of the two systems in the summary document.
#[derive(Debug, Clone)]
pub struct SummaryKeys {
    pub system_a: String,
    pub system_b: String,
}

impl Default for SummaryKeys {
    fn default() -> Self {
        Self {
            system_a: "system_a".to_string(),
            system_b: "system_b".to_string(),
        }
    }
}

/// One selectable trace source: the output of one load-testing tool for both systems.
#[derive(Debug, Clone)]
pub struct TraceSource {
    pub id: String,
    pub schema: SchemaKind,
    pub trace_path_a: PathBuf,
    pub trace_path_b: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub summary_keys: SummaryKeys,
    pub success_status: String,
}

impl TraceSource {
    pub fn builder(id: &str, schema: SchemaKind) -> TraceSourceBuilder {
        TraceSourceBuilder::new(id, schema)
    }

    fn trace_path(&self, system: SystemId) -> &Path {
        match system {
            SystemId::A => &self.trace_path_a,
            SystemId::B => &self.trace_path_b,
        }
    }
}

/// Builder for a [TraceSource]. Both trace paths must be provided before [TraceSourceBuilder::build].
pub struct TraceSourceBuilder {
    id: String,
    schema: SchemaKind,
    trace_path_a: Option<PathBuf>,
    trace_path_b: Option<PathBuf>,
    summary_path: Option<PathBuf>,
    summary_keys: SummaryKeys,
    success_status: String,
}

impl TraceSourceBuilder {
    fn new(id: &str, schema: SchemaKind) -> Self {
        Self {
            id: id.to_string(),
            schema,
            trace_path_a: None,
            trace_path_b: None,
            summary_path: None,
            summary_keys: SummaryKeys::default(),
            success_status: DEFAULT_SUCCESS_STATUS.to_string(),
        }
    }

    pub fn with_trace(mut self, system: SystemId, path: impl Into<PathBuf>) -> Self {
        match system {
            SystemId::A => self.trace_path_a = Some(path.into()),
            SystemId::B => self.trace_path_b = Some(path.into()),
        }
        self
    }

    pub fn with_summary(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_path = Some(path.into());
        self
    }

    pub fn with_summary_keys(mut self, keys: SummaryKeys) -> Self {
        self.summary_keys = keys;
        self
    }

    /// Override the status value classified as a success, see [DEFAULT_SUCCESS_STATUS].
    pub fn with_success_status(mut self, status: &str) -> Self {
        self.success_status = status.to_string();
        self
    }

    pub fn build(self) -> anyhow::Result<TraceSource> {
        let trace_path_a = self
            .trace_path_a
            .ok_or_else(|| anyhow::anyhow!("Trace source [{}] has no trace for system-a", self.id))?;
        let trace_path_b = self
            .trace_path_b
            .ok_or_else(|| anyhow::anyhow!("Trace source [{}] has no trace for system-b", self.id))?;

        Ok(TraceSource {
            id: self.id,
            schema: self.schema,
            trace_path_a,
            trace_path_b,
            summary_path: self.summary_path,
            summary_keys: self.summary_keys,
            success_status: self.success_status,
        })
    }
}

/// Everything one playback run needs, loaded once per source selection.
///
/// Loading never fails: an unreadable trace degrades to an empty event sequence and a missing
/// summary degrades to default metrics, so the clocks can always run on schedule.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub id: String,
    pub latency_source: LatencySource,
    pub metrics: MetricsPair,
    events_a: Arc<[RequestEvent]>,
    events_b: Arc<[RequestEvent]>,
}

impl LoadedSource {
    pub fn events(&self, system: SystemId) -> &Arc<[RequestEvent]> {
        match system {
            SystemId::A => &self.events_a,
            SystemId::B => &self.events_b,
        }
    }
}

/// Read and parse a source's traces and summary. All I/O for a playback session happens here,
/// before any clock starts; nothing inside a tick touches the filesystem.
pub fn load(source: &TraceSource) -> LoadedSource {
    let metrics = resolver::resolve(source.summary_path.as_deref(), &source.summary_keys);

    let latency_source = match source.schema {
        SchemaKind::Rich => LatencySource::Measured,
        SchemaKind::Minimal => LatencySource::ApproximatedFromAverage,
    };

    let events_a = load_trace(source, SystemId::A, &metrics);
    let events_b = load_trace(source, SystemId::B, &metrics);

    log::info!(
        "Loaded trace source [{}]: {} system-a events, {} system-b events",
        source.id,
        events_a.len(),
        events_b.len()
    );

    LoadedSource {
        id: source.id.clone(),
        latency_source,
        metrics,
        events_a,
        events_b,
    }
}

fn load_trace(source: &TraceSource, system: SystemId, metrics: &MetricsPair) -> Arc<[RequestEvent]> {
    let path = source.trace_path(system);
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(io) => {
            let error = ReplayError::Fetch {
                what: "trace file",
                path: path.to_path_buf(),
                source: io,
            };
            log::warn!("Degrading to an empty event sequence: {error}");
            return Arc::from(Vec::new());
        }
    };

    let mut events = parser::parse(&raw, source.schema, &source.success_status);
    if source.schema == SchemaKind::Minimal {
        parser::apply_average_latency(&mut events, metrics.get(system).avg_response_secs);
    }

    Arc::from(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchview_model::Outcome;
    use std::io::Write;

    #[test]
    fn builder_requires_both_trace_paths() {
        let result = TraceSource::builder("partial", SchemaKind::Rich)
            .with_trace(SystemId::A, "/tmp/a.csv")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn missing_trace_file_degrades_to_empty_events() {
        let source = TraceSource::builder("ghost", SchemaKind::Rich)
            .with_trace(SystemId::A, "/definitely/not/here_a.csv")
            .with_trace(SystemId::B, "/definitely/not/here_b.csv")
            .build()
            .unwrap();

        let loaded = load(&source);
        assert!(loaded.events(SystemId::A).is_empty());
        assert!(loaded.events(SystemId::B).is_empty());
        assert_eq!(loaded.metrics, MetricsPair::fallback());
    }

    #[test]
    fn minimal_source_injects_average_latency_from_the_summary() {
        let dir = tempfile::tempdir().unwrap();
        let trace_path = dir.path().join("minimal.csv");
        std::fs::write(&trace_path, "0,201\n1,500\n").unwrap();

        let summary_path = dir.path().join("summary.json");
        let mut summary = std::fs::File::create(&summary_path).unwrap();
        summary
            .write_all(
                br#"{
                    "system_a": {
                        "avgResponse": 200,
                        "errors": 1,
                        "complete": 2,
                        "rps": 2.0,
                        "timeTaken": 1.0
                    }
                }"#,
            )
            .unwrap();

        let source = TraceSource::builder("minimal", SchemaKind::Minimal)
            .with_trace(SystemId::A, &trace_path)
            .with_trace(SystemId::B, &trace_path)
            .with_summary(&summary_path)
            .build()
            .unwrap();

        let loaded = load(&source);
        assert_eq!(loaded.latency_source, LatencySource::ApproximatedFromAverage);

        let events = loaded.events(SystemId::A);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].latency_secs, 0.2);
        assert_eq!(events[0].outcome, Outcome::Ok);
        assert_eq!(events[1].outcome, Outcome::Fail);

        // System B has no summary entry, so its events carry the fallback average.
        let events_b = loaded.events(SystemId::B);
        assert_eq!(events_b[0].latency_secs, 0.18);
    }
}
