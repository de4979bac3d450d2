use probepulse::cli::start;
use std::process::ExitCode;

/// Exit status for a probe that ran and found the target `DOWN`
const EXIT_DOWN: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    match start::start().await {
        Ok(result) if result.is_up() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_DOWN),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
