use benchview_model::SystemId;
use std::path::PathBuf;

/// Everything that can go wrong inside the replay engine.
///
/// Nothing here is fatal to the application. Each variant is recovered where it occurs:
/// malformed rows are skipped, missing inputs degrade to empty sequences or default metrics,
/// and late ticks are suppressed. The variants exist so that the recovery sites have a precise
/// thing to log.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("malformed trace row {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("failed to load {what} from {}: {source}", path.display())]
    Fetch {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tick fired after the {system} session was cancelled")]
    TimerOverrun { system: SystemId },
}
