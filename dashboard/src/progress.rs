use std::collections::HashMap;
use std::sync::Arc;

use benchview_core::prelude::{EventBus, Subscription};
use benchview_engine::prelude::PLAYBACK_TOPIC;
use benchview_model::{SnapshotDelta, SystemId};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// One progress bar per system, fed from the bus, so the user can see how far each replay
/// timeline has advanced. The two bars move independently, like the sessions behind them.
pub struct ReplayProgress {
    _multi: MultiProgress,
    _subscription: Subscription<SnapshotDelta>,
}

impl ReplayProgress {
    pub fn attach(bus: &Arc<EventBus<SnapshotDelta>>) -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template(
            "{prefix:>8} [{wide_bar:.cyan/blue}] {pos:>3}% {msg}",
        )
        .expect("Failed to set progress style")
        .progress_chars("#>-");

        let bars: HashMap<SystemId, ProgressBar> = SystemId::ALL
            .into_iter()
            .map(|system| {
                let bar = multi.add(ProgressBar::new(100));
                bar.set_style(style.clone());
                bar.set_prefix(system.label());
                (system, bar)
            })
            .collect();

        let subscription = bus.subscribe(PLAYBACK_TOPIC, move |delta: &SnapshotDelta| {
            let Some(progress) = delta.progress_ratio else {
                return;
            };
            let Some(bar) = bars.get(&delta.system) else {
                return;
            };
            bar.set_position((progress * 100.0) as u64);
            if let Some(visible) = &delta.visible {
                bar.set_message(format!("{} events", visible.len()));
            }
            if progress >= 1.0 && !bar.is_finished() {
                bar.finish();
            }
        });

        Self {
            _multi: multi,
            _subscription: subscription,
        }
    }
}
