//! Command line front-end: run one probe and print its result as JSON

pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod start;
pub mod telemetry;
