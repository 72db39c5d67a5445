use std::collections::HashMap;
use std::sync::Arc;

use benchview_core::prelude::{EventBus, Subscription};
use benchview_engine::prelude::PLAYBACK_TOPIC;
use benchview_model::{SnapshotDelta, SystemId};
use parking_lot::Mutex;

use crate::cli::SystemFilter;

/// The scatter/line dataset behind the latency chart: one series of
/// `(offset seconds, latency ms)` points per displayed system.
///
/// Points are appended as events are revealed. Within one run the revealed prefix only grows,
/// so appending the new suffix is enough; a shorter reveal means a fresh run started and the
/// series restarts from scratch.
pub struct ChartSeries {
    state: Arc<Mutex<State>>,
    _subscription: Subscription<SnapshotDelta>,
}

struct State {
    filter: SystemFilter,
    series: HashMap<SystemId, Vec<(f64, f64)>>,
}

impl State {
    fn apply(&mut self, delta: &SnapshotDelta) {
        if !self.filter.shows(delta.system) {
            return;
        }
        let Some(visible) = &delta.visible else {
            return;
        };

        let points = self.series.entry(delta.system).or_default();
        if visible.len() < points.len() {
            points.clear();
        }
        for event in &visible.as_slice()[points.len()..] {
            points.push((event.offset_secs, event.latency_secs * 1000.0));
        }
    }
}

impl ChartSeries {
    pub fn attach(bus: &Arc<EventBus<SnapshotDelta>>, filter: SystemFilter) -> Self {
        let state = Arc::new(Mutex::new(State {
            filter,
            series: HashMap::new(),
        }));

        let subscription = bus.subscribe(PLAYBACK_TOPIC, {
            let state = state.clone();
            move |delta| state.lock().apply(delta)
        });

        Self {
            state,
            _subscription: subscription,
        }
    }

    pub fn dataset(&self, system: SystemId) -> Vec<(f64, f64)> {
        self.state
            .lock()
            .series
            .get(&system)
            .cloned()
            .unwrap_or_default()
    }

    /// One summary line per displayed system.
    pub fn render(&self) -> String {
        let state = self.state.lock();
        let mut out = String::new();
        for system in SystemId::ALL {
            if !state.filter.shows(system) {
                continue;
            }
            let points = state.series.get(&system).map(Vec::as_slice).unwrap_or(&[]);
            let peak_ms = points.iter().map(|(_, ms)| *ms).fold(0.0, f64::max);
            out.push_str(&format!(
                "{system}: {} latency points, peak {peak_ms:.0} ms\n",
                points.len()
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchview_model::{Outcome, RequestEvent, VisibleEvents};
    use pretty_assertions::assert_eq;

    fn events() -> Arc<[RequestEvent]> {
        Arc::from(vec![
            RequestEvent {
                offset_secs: 0.0,
                outcome: Outcome::Ok,
                latency_secs: 0.05,
            },
            RequestEvent {
                offset_secs: 0.5,
                outcome: Outcome::Fail,
                latency_secs: 0.03,
            },
        ])
    }

    #[test]
    fn appends_newly_revealed_points() {
        let bus = Arc::new(EventBus::new());
        let chart = ChartSeries::attach(&bus, SystemFilter::Both);
        assert!(chart.dataset(SystemId::A).is_empty());

        bus.publish(
            PLAYBACK_TOPIC,
            &SnapshotDelta::tick(SystemId::A, 0.1, VisibleEvents::new(events(), 1)),
        );
        assert_eq!(chart.dataset(SystemId::A), vec![(0.0, 50.0)]);

        bus.publish(
            PLAYBACK_TOPIC,
            &SnapshotDelta::tick(SystemId::A, 0.5, VisibleEvents::new(events(), 2)),
        );
        assert_eq!(chart.dataset(SystemId::A), vec![(0.0, 50.0), (0.5, 30.0)]);
    }

    #[test]
    fn a_fresh_run_restarts_the_series() {
        let bus = Arc::new(EventBus::new());
        let chart = ChartSeries::attach(&bus, SystemFilter::Both);

        bus.publish(
            PLAYBACK_TOPIC,
            &SnapshotDelta::tick(SystemId::A, 1.0, VisibleEvents::full(events())),
        );
        assert_eq!(chart.dataset(SystemId::A).len(), 2);

        bus.publish(
            PLAYBACK_TOPIC,
            &SnapshotDelta::tick(SystemId::A, 0.0, VisibleEvents::new(events(), 0)),
        );
        assert!(chart.dataset(SystemId::A).is_empty());
    }

    #[test]
    fn filtered_systems_are_ignored() {
        let bus = Arc::new(EventBus::new());
        let chart = ChartSeries::attach(&bus, SystemFilter::A);

        bus.publish(
            PLAYBACK_TOPIC,
            &SnapshotDelta::tick(SystemId::B, 1.0, VisibleEvents::full(events())),
        );
        assert!(chart.dataset(SystemId::B).is_empty());
    }
}
