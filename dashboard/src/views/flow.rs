use std::collections::HashMap;
use std::sync::Arc;

use benchview_core::prelude::{EventBus, Subscription};
use benchview_engine::prelude::PLAYBACK_TOPIC;
use benchview_model::{Outcome, PlaybackSnapshot, SnapshotDelta, SystemId};
use parking_lot::Mutex;

use crate::cli::SystemFilter;

/// How long a revealed message is animated travelling from client to server, in replay
/// timeline seconds.
pub const FLIGHT_SECONDS: f64 = 1.2;

/// Where one revealed message is on its client-to-server journey.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delivery {
    /// Still travelling; the fraction is in `[0, 1)`.
    InFlight(f64),
    Delivered,
}

/// The animated message-flow view: classifies each revealed event of a system as in flight
/// or delivered, based on the current playback position.
pub struct FlowView {
    state: Arc<Mutex<FlowState>>,
    _subscription: Subscription<SnapshotDelta>,
}

struct FlowState {
    filter: SystemFilter,
    snapshots: HashMap<SystemId, PlaybackSnapshot>,
}

impl FlowView {
    pub fn attach(bus: &Arc<EventBus<SnapshotDelta>>, filter: SystemFilter) -> Self {
        let state = Arc::new(Mutex::new(FlowState {
            filter,
            snapshots: SystemId::ALL
                .into_iter()
                .map(|system| (system, PlaybackSnapshot::initial(system)))
                .collect(),
        }));

        let subscription = bus.subscribe(PLAYBACK_TOPIC, {
            let state = state.clone();
            move |delta: &SnapshotDelta| {
                let mut state = state.lock();
                if !state.filter.shows(delta.system) {
                    return;
                }
                if let Some(snapshot) = state.snapshots.get_mut(&delta.system) {
                    snapshot.merge(delta);
                }
            }
        });

        Self {
            state,
            _subscription: subscription,
        }
    }

    /// The journey state of every revealed event, in trace order.
    pub fn classify(&self, system: SystemId) -> Vec<(Delivery, Outcome)> {
        let state = self.state.lock();
        let Some(snapshot) = state.snapshots.get(&system) else {
            return Vec::new();
        };

        let elapsed_secs = snapshot.progress_ratio * snapshot.metrics.total_duration_secs;
        snapshot
            .visible
            .as_slice()
            .iter()
            .map(|event| {
                let fraction =
                    ((elapsed_secs - event.offset_secs) / FLIGHT_SECONDS).clamp(0.0, 1.0);
                let delivery = if fraction >= 1.0 {
                    Delivery::Delivered
                } else {
                    Delivery::InFlight(fraction)
                };
                (delivery, event.outcome)
            })
            .collect()
    }

    pub fn render(&self, system: SystemId) -> String {
        let classified = self.classify(system);
        let in_flight = classified
            .iter()
            .filter(|(delivery, _)| matches!(delivery, Delivery::InFlight(_)))
            .count();
        let delivered_ok = classified
            .iter()
            .filter(|entry| *entry == &(Delivery::Delivered, Outcome::Ok))
            .count();
        let delivered_failed = classified
            .iter()
            .filter(|entry| *entry == &(Delivery::Delivered, Outcome::Fail))
            .count();

        format!(
            "{system}: {in_flight} in flight, {delivered_ok} delivered, {delivered_failed} failed"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchview_model::{RequestEvent, SystemMetrics, VisibleEvents};
    use pretty_assertions::assert_eq;

    fn event(offset_secs: f64, outcome: Outcome) -> RequestEvent {
        RequestEvent {
            offset_secs,
            outcome,
            latency_secs: 0.1,
        }
    }

    #[test]
    fn classifies_in_flight_and_delivered_events() {
        let bus = Arc::new(EventBus::new());
        let flow = FlowView::attach(&bus, SystemFilter::Both);

        let events: Arc<[RequestEvent]> = Arc::from(vec![
            event(0.0, Outcome::Ok),
            event(2.0, Outcome::Fail),
            event(2.9, Outcome::Ok),
        ]);

        // 10 s timeline at 30%: elapsed 3 s. The first event landed long ago, the second is
        // mid-flight, the third just left the client.
        let mut metrics = SystemMetrics::fallback_for(SystemId::A);
        metrics.total_duration_secs = 10.0;
        bus.publish(PLAYBACK_TOPIC, &SnapshotDelta::metrics(SystemId::A, metrics));
        bus.publish(
            PLAYBACK_TOPIC,
            &SnapshotDelta::tick(SystemId::A, 0.3, VisibleEvents::full(events)),
        );

        let classified = flow.classify(SystemId::A);
        assert_eq!(classified.len(), 3);
        assert_eq!(classified[0], (Delivery::Delivered, Outcome::Ok));
        assert!(matches!(
            classified[1],
            (Delivery::InFlight(fraction), Outcome::Fail) if (fraction - 1.0 / 1.2).abs() < 1e-9
        ));
        assert!(matches!(
            classified[2],
            (Delivery::InFlight(fraction), Outcome::Ok) if fraction < 0.1
        ));

        let rendered = flow.render(SystemId::A);
        assert_eq!(rendered, "system-a: 2 in flight, 1 delivered, 0 failed");
    }

    #[test]
    fn renders_defaults_before_any_message() {
        let bus = Arc::new(EventBus::new());
        let flow = FlowView::attach(&bus, SystemFilter::Both);
        assert!(flow.classify(SystemId::B).is_empty());
    }
}
