use super::{Executor, connect, invalid_config, run_probe};
use crate::{
    config::{MonitorConfig, MonitorType, SqlServerConfig},
    result::{ExecutorResult, Status},
    wire::tds::{parse_prelogin_version, prelogin_packet},
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Sends a TDS Pre-Login packet and accepts any non-empty reply
#[derive(Debug, Default)]
pub struct SqlServerExecutor;

#[async_trait]
impl Executor for SqlServerExecutor {
    fn monitor_type(&self) -> MonitorType {
        MonitorType::Sqlserver
    }

    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult {
        let MonitorConfig::Sqlserver(mssql) = config else {
            return invalid_config(MonitorType::Sqlserver, config);
        };
        run_probe(MonitorType::Sqlserver, timeout, check(mssql)).await
    }
}

async fn check(config: &SqlServerConfig) -> Result<(Status, String)> {
    let stream = connect(&config.host, config.port).await?;
    exchange(stream).await
}

async fn exchange<S>(mut stream: S) -> Result<(Status, String)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(&prelogin_packet())
        .await
        .context("Failed to send Pre-Login packet")?;

    let mut buf = [0u8; 1024];
    let n = stream
        .read(&mut buf)
        .await
        .context("Failed to read Pre-Login response")?;
    let Some(reply) = buf.get(..n).filter(|reply| !reply.is_empty()) else {
        bail!("Server closed the connection without responding");
    };

    // Older listeners may answer with something other than a Pre-Login
    // Response; any reply counts as a live TDS endpoint.
    let message = parse_prelogin_version(reply).map_or_else(
        || format!("SQL Server responded ({n} bytes)"),
        |version| format!("SQL Server {version} is accepting connections"),
    );
    Ok((Status::Up, message))
}
