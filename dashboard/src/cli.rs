use std::path::PathBuf;

use benchview_model::SystemId;
use clap::{Parser, ValueEnum};

/// Which of the two compared systems to display. The replay engine always runs both clocks;
/// the filter only affects what the views render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SystemFilter {
    A,
    B,
    Both,
}

impl SystemFilter {
    pub fn shows(&self, system: SystemId) -> bool {
        match self {
            SystemFilter::A => system == SystemId::A,
            SystemFilter::B => system == SystemId::B,
            SystemFilter::Both => true,
        }
    }
}

#[derive(Parser)]
#[command(about, long_about = None)]
pub struct BenchviewCli {
    /// Directory containing the trace files and the summary document
    #[clap(short, long, default_value = "traces")]
    pub trace_dir: PathBuf,

    /// The trace source to replay
    #[clap(long, default_value = "rich")]
    pub source: String,

    /// Which system(s) to display
    #[clap(long, value_enum, default_value = "both")]
    pub system: SystemFilter,

    /// Replay speed multiplier, 1.0 replays in real time
    #[clap(long, default_value = "1.0")]
    pub speed: f64,

    /// Show the complete trace at rest instead of replaying it
    #[clap(long, default_value = "false")]
    pub static_view: bool,

    /// Do not show progress bars while replaying
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// The status column value classified as a successful request
    #[clap(long, default_value = "201")]
    pub success_status: String,
}

/// Initialise the CLI and logging for the dashboard.
pub fn init() -> BenchviewCli {
    env_logger::init();

    BenchviewCli::parse()
}
