use crate::{
    cli::{actions::Action, commands::DEFAULT_TIMEOUT_MS},
    config::{MonitorConfig, MonitorType},
};
use anyhow::{Context, Result};
use clap::ArgMatches;
use serde_json::Value;
use std::{fs, time::Duration};

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if the monitor type is unknown or the configuration
/// cannot be read or parsed
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    let monitor_type = matches
        .get_one::<String>("type")
        .context("monitor type is required")?
        .parse::<MonitorType>()
        .map_err(anyhow::Error::msg)?;

    let raw = matches
        .get_one::<String>("config")
        .context("configuration is required")?;
    let config = parse_config(monitor_type, &read_config(raw)?)?;

    let timeout = Duration::from_millis(
        matches
            .get_one::<u64>("timeout")
            .copied()
            .unwrap_or(DEFAULT_TIMEOUT_MS),
    );

    Ok(Action::Probe {
        monitor_type,
        config,
        timeout,
    })
}

/// Inline JSON, or the contents of the file named after a leading `@`
fn read_config(raw: &str) -> Result<String> {
    match raw.trim().strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {path}")),
        None => Ok(raw.to_string()),
    }
}

/// Parse a JSON configuration object, filling in `"type"` from
/// `monitor_type` when absent
///
/// # Errors
///
/// Returns an error if `json` is not an object or does not match the
/// configuration of its monitor type
pub fn parse_config(monitor_type: MonitorType, json: &str) -> Result<MonitorConfig> {
    let mut value: Value = serde_json::from_str(json).context("Configuration is not valid JSON")?;
    let object = value
        .as_object_mut()
        .context("Configuration must be a JSON object")?;

    match object.get_mut("type") {
        Some(Value::String(kind)) => *kind = kind.to_uppercase(),
        Some(_) => anyhow::bail!("Configuration \"type\" must be a string"),
        None => {
            object.insert("type".to_string(), monitor_type.as_str().into());
        }
    }

    serde_json::from_value(value).context("Invalid monitor configuration")
}
