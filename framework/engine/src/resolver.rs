use std::path::Path;

use benchview_model::{SystemId, SystemMetrics, DEFAULT_TOTAL_DURATION_SECS};
use serde::Deserialize;

use crate::error::ReplayError;
use crate::source::SummaryKeys;

/// One system's entry in the external summary document.
///
/// Field names follow the document produced by the load-testing tool.
#[derive(Debug, Deserialize)]
struct RawSystemSummary {
    /// Average response time in milliseconds.
    #[serde(rename = "avgResponse")]
    avg_response: f64,
    errors: u64,
    complete: u64,
    /// Requests per second.
    rps: f64,
    /// Total run duration in seconds.
    #[serde(rename = "timeTaken")]
    time_taken: f64,
    /// Transfer rate in KB/s. Usually absent, in which case it is derived from `rps`.
    #[serde(default)]
    throughput: Option<f64>,
}

/// The summary metrics for both compared systems.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsPair {
    pub system_a: SystemMetrics,
    pub system_b: SystemMetrics,
}

impl MetricsPair {
    pub fn fallback() -> Self {
        Self {
            system_a: SystemMetrics::fallback_for(SystemId::A),
            system_b: SystemMetrics::fallback_for(SystemId::B),
        }
    }

    pub fn get(&self, system: SystemId) -> &SystemMetrics {
        match system {
            SystemId::A => &self.system_a,
            SystemId::B => &self.system_b,
        }
    }
}

/// Load summary metrics for both systems from the summary document at `summary_path`.
///
/// Any failure, whether a missing file, malformed JSON or a missing system key, falls back to
/// the built-in defaults for the affected system rather than propagating an error. The
/// playback engine must always end up with a usable total duration.
pub fn resolve(summary_path: Option<&Path>, keys: &SummaryKeys) -> MetricsPair {
    let Some(path) = summary_path else {
        return MetricsPair::fallback();
    };

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) => {
            let error = ReplayError::Fetch {
                what: "summary document",
                path: path.to_path_buf(),
                source,
            };
            log::warn!("Falling back to default metrics: {error}");
            return MetricsPair::fallback();
        }
    };

    let document: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(document) => document,
        Err(e) => {
            log::warn!(
                "Summary document at {} is malformed, falling back to default metrics: {e}",
                path.display()
            );
            return MetricsPair::fallback();
        }
    };

    MetricsPair {
        system_a: resolve_system(&document, &keys.system_a, SystemId::A),
        system_b: resolve_system(&document, &keys.system_b, SystemId::B),
    }
}

fn resolve_system(document: &serde_json::Value, key: &str, system: SystemId) -> SystemMetrics {
    let raw = document
        .get(key)
        .and_then(|value| RawSystemSummary::deserialize(value).ok());

    match raw {
        Some(raw) => SystemMetrics {
            avg_response_secs: raw.avg_response / 1000.0,
            // Transfer rate is usually not present in the document; `rps * 20` is a
            // documented heuristic, not a measured value.
            throughput_kbs: raw
                .throughput
                .unwrap_or_else(|| (raw.rps * 20.0).round()),
            error_count: raw.errors,
            completed_count: raw.complete,
            total_duration_secs: if raw.time_taken > 0.0 {
                raw.time_taken
            } else {
                DEFAULT_TOTAL_DURATION_SECS
            },
        },
        None => {
            log::debug!("Summary document has no usable entry for key [{key}], using defaults");
            SystemMetrics::fallback_for(system)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_summary(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_document_resolves_to_fallback_pair() {
        let keys = SummaryKeys::default();
        assert_eq!(resolve(None, &keys), MetricsPair::fallback());
        assert_eq!(
            resolve(Some(Path::new("/definitely/not/here.json")), &keys),
            MetricsPair::fallback()
        );
    }

    #[test]
    fn malformed_document_resolves_to_fallback_pair() {
        let file = write_summary("{not json");
        let pair = resolve(Some(file.path()), &SummaryKeys::default());
        assert_eq!(pair, MetricsPair::fallback());
    }

    #[test]
    fn present_key_is_parsed_and_missing_key_falls_back() {
        let file = write_summary(
            r#"{
                "system_a": {
                    "avgResponse": 200,
                    "errors": 3,
                    "complete": 500,
                    "rps": 10.4,
                    "timeTaken": 48.0
                }
            }"#,
        );
        let pair = resolve(Some(file.path()), &SummaryKeys::default());

        assert_eq!(pair.system_a.avg_response_secs, 0.2);
        assert_eq!(pair.system_a.error_count, 3);
        assert_eq!(pair.system_a.completed_count, 500);
        assert_eq!(pair.system_a.total_duration_secs, 48.0);
        // Derived throughput heuristic: round(rps * 20).
        assert_eq!(pair.system_a.throughput_kbs, 208.0);

        assert_eq!(pair.system_b, SystemMetrics::fallback_for(SystemId::B));
    }

    #[test]
    fn supplied_throughput_is_preferred_over_the_heuristic() {
        let file = write_summary(
            r#"{
                "system_b": {
                    "avgResponse": 120,
                    "errors": 0,
                    "complete": 800,
                    "rps": 16.0,
                    "timeTaken": 50.0,
                    "throughput": 410.5
                }
            }"#,
        );
        let pair = resolve(Some(file.path()), &SummaryKeys::default());
        assert_eq!(pair.system_b.throughput_kbs, 410.5);
    }

    #[test]
    fn zero_duration_falls_back_to_the_default_window() {
        let file = write_summary(
            r#"{
                "system_a": {
                    "avgResponse": 100,
                    "errors": 0,
                    "complete": 10,
                    "rps": 1.0,
                    "timeTaken": 0.0
                }
            }"#,
        );
        let pair = resolve(Some(file.path()), &SummaryKeys::default());
        assert_eq!(pair.system_a.total_duration_secs, DEFAULT_TOTAL_DURATION_SECS);
    }
}
