pub mod chart;
pub mod flow;
pub mod metrics_panel;
