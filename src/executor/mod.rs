//! Protocol executors and the registry that dispatches to them
//!
//! Every executor honours the same contract:
//!
//! - never fails: any error becomes a `DOWN` result explaining why
//! - `timeout` bounds the wall-clock duration of the probe
//! - no process-wide state is written, configuration is scoped to the call

mod connection;
pub mod dns;
pub mod docker;
pub mod http;
pub mod mongodb;
pub mod mysql;
pub mod ping;
pub mod postgres;
pub mod redis;
pub mod registry;
pub mod sqlserver;
pub mod tcp;

pub use registry::ExecutorRegistry;

use crate::{
    config::{MonitorConfig, MonitorType},
    result::{ExecutorResult, Status},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{future::Future, time::Duration};
use tokio::{net::TcpStream, time::Instant};
use tracing::debug;

/// One health probe implementation per monitor type
#[async_trait]
pub trait Executor: Send + Sync {
    fn monitor_type(&self) -> MonitorType;

    /// Probe the target described by `config` within `timeout`
    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult;
}

/// What a probe reports once it finished, before latency is attached
pub(crate) trait Outcome {
    fn into_result(self, latency: Duration) -> ExecutorResult;
}

impl Outcome for (Status, String) {
    fn into_result(self, latency: Duration) -> ExecutorResult {
        let (status, message) = self;
        ExecutorResult::new(status, latency, message)
    }
}

/// Drive `probe` under `timeout`, measuring latency.
///
/// Errors become `DOWN` with the full context chain as message. On timeout
/// the probe future is dropped, which closes any socket it owns.
pub(crate) async fn run_probe<F, T>(
    monitor_type: MonitorType,
    timeout: Duration,
    probe: F,
) -> ExecutorResult
where
    F: Future<Output = Result<T>>,
    T: Outcome,
{
    run_probe_with_grace(monitor_type, timeout, Duration::ZERO, probe).await
}

/// Like [`run_probe`] but lets the probe run `grace` past `timeout`, for
/// probes that hand the timeout to something slower to start (a subprocess).
/// The timeout message still names `timeout`.
pub(crate) async fn run_probe_with_grace<F, T>(
    monitor_type: MonitorType,
    timeout: Duration,
    grace: Duration,
    probe: F,
) -> ExecutorResult
where
    F: Future<Output = Result<T>>,
    T: Outcome,
{
    let started = Instant::now();
    let result = match tokio::time::timeout(timeout + grace, probe).await {
        Ok(Ok(outcome)) => outcome.into_result(started.elapsed()),
        Ok(Err(e)) => ExecutorResult::down(started.elapsed(), format!("{e:#}")),
        Err(_) => ExecutorResult::timeout(started.elapsed(), timeout),
    };

    debug!(
        monitor = %monitor_type,
        status = %result.status,
        latency_ms = result.latency_ms,
        message = %result.message,
        "probe finished"
    );
    result
}

/// `DOWN` result for a configuration that belongs to another executor
pub(crate) fn invalid_config(expected: MonitorType, config: &MonitorConfig) -> ExecutorResult {
    ExecutorResult::down(
        Duration::ZERO,
        format!(
            "Invalid configuration for {expected} monitor: got {} configuration",
            config.monitor_type()
        ),
    )
}

pub(crate) async fn connect(host: &str, port: u16) -> Result<TcpStream> {
    if host.is_empty() {
        anyhow::bail!("No host configured");
    }
    TcpStream::connect((host.trim_start_matches('[').trim_end_matches(']'), port))
        .await
        .with_context(|| format!("Connection to {host}:{port} failed"))
}


#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::config::TcpConfig;

    #[tokio::test]
    async fn test_run_probe_up() {
        let result = run_probe(MonitorType::Tcp, Duration::from_secs(1), async {
            Ok((Status::Up, "fine".to_string()))
        })
        .await;
        assert!(result.is_up());
        assert_eq!(result.message, "fine");
    }

    #[tokio::test]
    async fn test_run_probe_error_keeps_context_chain() {
        let result = run_probe(MonitorType::Tcp, Duration::from_secs(1), async {
            Err::<(Status, String), _>(anyhow::anyhow!("connection refused"))
                .context("Connection to db:5432 failed")
        })
        .await;
        assert_eq!(result.status, Status::Down);
        assert_eq!(
            result.message,
            "Connection to db:5432 failed: connection refused"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_probe_timeout() {
        let result = run_probe(MonitorType::Tcp, Duration::from_millis(250), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok((Status::Up, "too late".to_string()))
        })
        .await;
        assert_eq!(result.status, Status::Down);
        assert_eq!(result.message, "Timeout after 250ms");
        assert!(result.latency_ms >= 250);
        assert!(result.latency_ms < 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_probe_with_grace_names_the_timeout() {
        let result = run_probe_with_grace(
            MonitorType::Ping,
            Duration::from_millis(100),
            Duration::from_millis(400),
            async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok((Status::Up, "within grace".to_string()))
            },
        )
        .await;
        assert!(result.is_up());

        let result = run_probe_with_grace(
            MonitorType::Ping,
            Duration::from_millis(100),
            Duration::from_millis(400),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok((Status::Up, "too late".to_string()))
            },
        )
        .await;
        assert_eq!(result.message, "Timeout after 100ms");
        assert!(result.latency_ms >= 500);
    }

    #[test]
    fn test_invalid_config_message() {
        let config = MonitorConfig::Tcp(TcpConfig::default());
        let result = invalid_config(MonitorType::Http, &config);
        assert_eq!(result.status, Status::Down);
        assert_eq!(
            result.message,
            "Invalid configuration for HTTP monitor: got TCP configuration"
        );
    }

    #[tokio::test]
    async fn test_connect_requires_host() {
        let err = connect("", 80).await.unwrap_err();
        assert_eq!(err.to_string(), "No host configured");
    }
}
