pub mod cli;
pub mod progress;
pub mod views;
