use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber, writing to stderr so stdout only
/// carries the probe result.
///
/// An explicit `verbosity` applies to this crate; without one `RUST_LOG` is
/// honoured, defaulting to warnings.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed
pub fn init(verbosity: Option<Level>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}

fn filter(verbosity: Option<Level>) -> EnvFilter {
    match verbosity {
        Some(level) => EnvFilter::new(format!("{}={level}", env!("CARGO_CRATE_NAME"))),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_verbosity() {
        assert_eq!(
            filter(Some(Level::DEBUG)).to_string(),
            "probepulse=debug"
        );
    }
}
