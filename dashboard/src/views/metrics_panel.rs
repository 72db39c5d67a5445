use std::collections::HashMap;
use std::sync::Arc;

use benchview_core::prelude::{EventBus, Subscription};
use benchview_engine::prelude::PLAYBACK_TOPIC;
use benchview_model::{SnapshotDelta, SystemId, SystemMetrics};
use parking_lot::Mutex;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::SystemFilter;

/// Height of a metrics bar for a value, normalized against the larger of the two systems.
///
/// Kept on the same scale as the original dashboard's bars: the larger value gets the full
/// 60 units, a zero value still gets a 5 unit stub so the bar is visible.
pub fn bar_height(value: f64, max: f64) -> f64 {
    let ratio = if max > 0.0 { value / max } else { 0.0 };
    55.0 * ratio + 5.0
}

#[derive(Tabled)]
struct MetricsRow {
    #[tabled(rename = "System")]
    system: String,
    #[tabled(rename = "Avg response (ms)")]
    avg_response_ms: String,
    #[tabled(rename = "Transfer rate (KB/s)")]
    throughput_kbs: String,
    #[tabled(rename = "Failed")]
    errors: u64,
    #[tabled(rename = "Completed")]
    completed: u64,
    #[tabled(rename = "Duration (s)")]
    duration_secs: String,
}

/// The bar-metrics panel: renders the latest summary metrics of the displayed systems.
///
/// Only reacts to deltas that carry metrics; ticks pass through untouched. Renders the
/// built-in defaults until the first metrics delta arrives.
pub struct MetricsPanel {
    state: Arc<Mutex<PanelState>>,
    _subscription: Subscription<SnapshotDelta>,
}

struct PanelState {
    filter: SystemFilter,
    metrics: HashMap<SystemId, SystemMetrics>,
}

impl MetricsPanel {
    pub fn attach(bus: &Arc<EventBus<SnapshotDelta>>, filter: SystemFilter) -> Self {
        let state = Arc::new(Mutex::new(PanelState {
            filter,
            metrics: SystemId::ALL
                .into_iter()
                .map(|system| (system, SystemMetrics::fallback_for(system)))
                .collect(),
        }));

        let subscription = bus.subscribe(PLAYBACK_TOPIC, {
            let state = state.clone();
            move |delta: &SnapshotDelta| {
                if let Some(metrics) = &delta.metrics {
                    let mut state = state.lock();
                    if state.filter.shows(delta.system) {
                        state.metrics.insert(delta.system, metrics.clone());
                    }
                }
            }
        });

        Self {
            state,
            _subscription: subscription,
        }
    }

    pub fn metrics(&self, system: SystemId) -> Option<SystemMetrics> {
        self.state.lock().metrics.get(&system).cloned()
    }

    pub fn render(&self) -> String {
        let state = self.state.lock();

        let displayed: Vec<(SystemId, &SystemMetrics)> = SystemId::ALL
            .iter()
            .filter(|system| state.filter.shows(**system))
            .filter_map(|system| state.metrics.get(system).map(|m| (*system, m)))
            .collect();

        let max_response = displayed
            .iter()
            .map(|(_, m)| m.avg_response_secs)
            .fold(0.0, f64::max);

        let rows: Vec<MetricsRow> = displayed
            .iter()
            .map(|(system, metrics)| MetricsRow {
                system: format!(
                    "{system} {}",
                    "#".repeat(
                        (bar_height(metrics.avg_response_secs, max_response) / 5.0) as usize
                    )
                ),
                avg_response_ms: format!("{:.0}", metrics.avg_response_secs * 1000.0),
                throughput_kbs: format!("{:.0}", metrics.throughput_kbs),
                errors: metrics.error_count,
                completed: metrics.completed_count,
                duration_secs: format!("{:.1}", metrics.total_duration_secs),
            })
            .collect();

        let mut table = Table::new(&rows);
        table.with(Style::modern());
        table.to_string()
    }
}
