use super::{commands, dispatch, telemetry};
use crate::result::ExecutorResult;
use anyhow::Result;
use clap::ArgMatches;
use tracing::Level;

/// Main orchestrator - Pure orchestration with no business logic
///
/// Five-step data flow:
/// 1. Parse: Extract CLI arguments
/// 2. Extract Verbosity: Convert flag count to logging level
/// 3. Initialize Telemetry: Set up structured logging on stderr
/// 4. Dispatch: Convert `ArgMatches` into typed Action enum
/// 5. Execute: Run the probe and print its result
///
/// # Errors
///
/// Returns an error if any step in the flow fails
pub async fn start() -> Result<ExecutorResult> {
    // 1. Parse: Extract CLI arguments
    let matches = commands::new().get_matches();

    // 2. Extract Verbosity
    let verbosity = extract_verbosity(&matches);

    // 3. Initialize Telemetry
    telemetry::init(verbosity)?;

    // 4. Dispatch: Convert ArgMatches into typed Action enum
    let action = dispatch::dispatch(&matches)?;

    // 5. Execute: Run the action's business logic
    action.execute().await
}

/// `None` leaves the level to `RUST_LOG`
fn extract_verbosity(matches: &ArgMatches) -> Option<Level> {
    match matches.get_count("verbose") {
        0 => None,
        1 => Some(Level::INFO),
        2 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}
