use super::{Executor, connect, connection, invalid_config, run_probe};
use crate::{
    config::{MonitorConfig, MonitorType, MysqlConfig},
    result::{ExecutorResult, Status},
    wire::mysql::{CLIENT_SSL, HEADER_LEN, MAX_GREETING_LEN, parse_greeting, payload_len},
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use sqlx::{ConnectOptions, Connection, mysql::MySqlConnectOptions};
use std::{io::ErrorKind, time::Duration};
use tokio::io::{AsyncRead, AsyncReadExt};

const DEFAULT_PORT: u16 = 3306;

/// Without a username only the server greeting is read; with one, a real
/// session is opened and `SELECT VERSION()` is issued
#[derive(Debug, Default)]
pub struct MysqlExecutor;

#[derive(Debug, PartialEq, Eq)]
struct Target {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

#[async_trait]
impl Executor for MysqlExecutor {
    fn monitor_type(&self) -> MonitorType {
        MonitorType::Mysql
    }

    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult {
        let MonitorConfig::Mysql(mysql) = config else {
            return invalid_config(MonitorType::Mysql, config);
        };
        run_probe(MonitorType::Mysql, timeout, check(mysql)).await
    }
}

async fn check(config: &MysqlConfig) -> Result<(Status, String)> {
    let target = target(config)?;
    match target.username.as_deref() {
        Some(username) => query_version(&target, username).await,
        None => {
            let stream = connect(&target.host, target.port).await?;
            read_greeting(stream).await
        }
    }
}

fn target(config: &MysqlConfig) -> Result<Target> {
    let Some(connection_string) = config.connection_string.as_deref() else {
        return Ok(Target {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone().filter(|u| !u.is_empty()),
            password: config.password.clone(),
            database: config.database.clone(),
        });
    };

    let parsed = connection::parse(connection_string)?;
    Ok(Target {
        host: parsed.host,
        port: parsed.port.unwrap_or(DEFAULT_PORT),
        username: parsed.username,
        password: parsed.password,
        database: parsed.database,
    })
}

async fn query_version(target: &Target, username: &str) -> Result<(Status, String)> {
    let mut options = MySqlConnectOptions::new()
        .host(&target.host)
        .port(target.port)
        .username(username);
    if let Some(password) = target.password.as_deref() {
        options = options.password(password);
    }
    if let Some(database) = target.database.as_deref() {
        options = options.database(database);
    }

    let mut conn = options
        .connect()
        .await
        .with_context(|| format!("Connection to {}:{} failed", target.host, target.port))?;

    let version: String = sqlx::query_scalar("SELECT VERSION()")
        .fetch_one(&mut conn)
        .await
        .context("Failed to fetch database version")?;

    conn.close().await.context("Failed to close connection")?;

    Ok((Status::Up, format!("MySQL {version} is accepting queries")))
}

/// The server speaks first; its handshake packet tells whether it is
/// willing to serve us.
async fn read_greeting<S>(mut stream: S) -> Result<(Status, String)>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    if let Err(e) = stream.read_exact(&mut header).await {
        if e.kind() == ErrorKind::UnexpectedEof {
            bail!("Server closed the connection without sending a greeting");
        }
        return Err(e).context("Failed to read greeting");
    }

    let len = payload_len(header);
    if len == 0 || len > MAX_GREETING_LEN {
        bail!("Invalid greeting length: {len} bytes");
    }

    let mut payload = vec![0u8; len];
    stream
        .read_exact(&mut payload)
        .await
        .context("Failed to read greeting")?;
    let greeting = parse_greeting(&payload)?;

    let mut message = format!(
        "MySQL {} is accepting connections (protocol {})",
        greeting.server_version, greeting.protocol_version
    );
    if greeting.capabilities & CLIENT_SSL != 0 {
        message.push_str(", TLS available");
    }
    Ok((Status::Up, message))
}
