use std::sync::Arc;

use anyhow::Context;
use benchview_core::prelude::EventBus;
use benchview_engine::prelude::*;
use benchview_model::{SchemaKind, SystemId};
use itertools::Itertools;

use benchview_dashboard::cli;
use benchview_dashboard::progress::ReplayProgress;
use benchview_dashboard::views::chart::ChartSeries;
use benchview_dashboard::views::flow::FlowView;
use benchview_dashboard::views::metrics_panel::MetricsPanel;

/// The two built-in trace sources, matching the outputs of the two load-testing tools.
fn default_sources(cli: &cli::BenchviewCli) -> anyhow::Result<Vec<TraceSource>> {
    let dir = &cli.trace_dir;
    let summary = dir.join("summary.json");

    let rich = TraceSource::builder("rich", SchemaKind::Rich)
        .with_trace(SystemId::A, dir.join("system_a_rich.csv"))
        .with_trace(SystemId::B, dir.join("system_b_rich.csv"))
        .with_summary(&summary)
        .with_success_status(&cli.success_status)
        .build()
        .context("Invalid rich trace source")?;

    let minimal = TraceSource::builder("minimal", SchemaKind::Minimal)
        .with_trace(SystemId::A, dir.join("system_a_minimal.csv"))
        .with_trace(SystemId::B, dir.join("system_b_minimal.csv"))
        .with_summary(&summary)
        .with_success_status(&cli.success_status)
        .build()
        .context("Invalid minimal trace source")?;

    Ok(vec![rich, minimal])
}

// The replay engine is cooperative: two clocks interleaving on one thread, not parallelism.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = cli::init();

    let bus = Arc::new(EventBus::new());

    let chart = ChartSeries::attach(&bus, cli.system);
    let metrics_panel = MetricsPanel::attach(&bus, cli.system);
    let flow = FlowView::attach(&bus, cli.system);
    let _progress =
        (!cli.no_progress && !cli.static_view).then(|| ReplayProgress::attach(&bus));

    let sources = default_sources(&cli)?;
    let mut controller = PlaybackController::new(bus.clone(), sources).with_speed(cli.speed);

    controller.select_source(&cli.source).with_context(|| {
        format!(
            "Available trace sources: {}",
            controller.source_ids().join(", ")
        )
    })?;

    if !cli.static_view {
        controller.start()?;
        if let Err(e) = controller.join().await {
            log::warn!("Replay interrupted: {e}");
        }
        // Leave the dashboard showing the complete trace at rest.
        controller.stop();
    }

    println!("{}", metrics_panel.render());
    print!("{}", chart.render());
    for system in SystemId::ALL {
        if cli.system.shows(system) {
            println!("{}", flow.render(system));
        }
    }

    Ok(())
}
