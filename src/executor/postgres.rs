use super::{Executor, connect, connection, invalid_config, run_probe};
use crate::{
    config::{MonitorConfig, MonitorType, PostgresConfig},
    result::{ExecutorResult, Status},
    wire::postgres::{StartupResponse, auth_method, parse_startup_response, startup_message},
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const DEFAULT_PORT: u16 = 5432;

/// Sends a `StartupMessage` and checks the backend answers with an
/// authentication request or an error. Never authenticates.
#[derive(Debug, Default)]
pub struct PostgresExecutor;

#[derive(Debug, PartialEq, Eq)]
struct Target {
    host: String,
    port: u16,
    user: String,
    database: String,
}

#[async_trait]
impl Executor for PostgresExecutor {
    fn monitor_type(&self) -> MonitorType {
        MonitorType::Postgresql
    }

    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult {
        let MonitorConfig::Postgresql(pg) = config else {
            return invalid_config(MonitorType::Postgresql, config);
        };
        run_probe(MonitorType::Postgresql, timeout, check(pg)).await
    }
}

async fn check(config: &PostgresConfig) -> Result<(Status, String)> {
    let target = target(config)?;
    let stream = connect(&target.host, target.port).await?;
    exchange(stream, &target.user, &target.database).await
}

/// Resolve host, port, user and database from the connection string or the
/// individual fields
fn target(config: &PostgresConfig) -> Result<Target> {
    let Some(connection_string) = config.connection_string.as_deref() else {
        return Ok(Target {
            host: config.host.clone(),
            port: config.port,
            user: config.username.clone(),
            database: config
                .database
                .clone()
                .unwrap_or_else(|| config.username.clone()),
        });
    };

    let parsed = connection::parse(connection_string)?;
    let user = parsed.username.unwrap_or_else(|| config.username.clone());
    Ok(Target {
        host: parsed.host,
        port: parsed.port.unwrap_or(DEFAULT_PORT),
        database: parsed.database.unwrap_or_else(|| user.clone()),
        user,
    })
}

/// Startup exchange over an already connected stream. The stream is owned
/// so it is closed on every return path.
async fn exchange<S>(mut stream: S, user: &str, database: &str) -> Result<(Status, String)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(&startup_message(user, database))
        .await
        .context("Failed to send StartupMessage")?;

    let mut buf = [0u8; 512];
    let n = stream
        .read(&mut buf)
        .await
        .context("Failed to read startup response")?;
    let response = parse_startup_response(buf.get(..n).unwrap_or_default())
        .context("Server closed the connection without responding")?;

    let message = match response {
        StartupResponse::Authentication(Some(0)) => {
            "PostgreSQL accepted the connection without authentication".to_string()
        }
        StartupResponse::Authentication(Some(code)) => format!(
            "PostgreSQL is accepting connections ({} authentication requested)",
            auth_method(code)
        ),
        StartupResponse::Authentication(None) => "PostgreSQL is accepting connections".to_string(),
        StartupResponse::Error(Some(detail)) => format!("PostgreSQL responded: {detail}"),
        StartupResponse::Error(None) => "PostgreSQL responded with an error".to_string(),
        StartupResponse::Unexpected(tag) => {
            bail!("Unexpected response from server (first byte 0x{tag:02x})")
        }
    };

    Ok((Status::Up, message))
}
