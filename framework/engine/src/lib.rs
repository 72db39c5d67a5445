mod clock;
mod controller;
mod error;
mod parser;
mod resolver;
mod source;

/// The single bus topic carrying playback state.
pub const PLAYBACK_TOPIC: &str = "playback";

pub mod prelude {
    pub use crate::clock::SessionState;
    pub use crate::controller::PlaybackController;
    pub use crate::error::ReplayError;
    pub use crate::parser::{apply_average_latency, parse};
    pub use crate::resolver::{resolve, MetricsPair};
    pub use crate::source::{LoadedSource, SummaryKeys, TraceSource, TraceSourceBuilder};
    pub use crate::PLAYBACK_TOPIC;
}
