use super::{Executor, connect, connection, invalid_config, run_probe};
use crate::{
    config::{MonitorConfig, MonitorType, RedisConfig},
    result::{ExecutorResult, Status},
    wire::resp::{Reply, encode_command, parse_server_version, read_reply},
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};

const DEFAULT_PORT: u16 = 6379;

/// `PING` must be answered with `PONG`; the server version is read from
/// `INFO server` when available
#[derive(Debug, Default)]
pub struct RedisExecutor;

#[derive(Debug, PartialEq, Eq)]
struct Target {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    database: Option<u32>,
}

#[async_trait]
impl Executor for RedisExecutor {
    fn monitor_type(&self) -> MonitorType {
        MonitorType::Redis
    }

    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult {
        let MonitorConfig::Redis(redis) = config else {
            return invalid_config(MonitorType::Redis, config);
        };
        run_probe(MonitorType::Redis, timeout, check(redis)).await
    }
}

async fn check(config: &RedisConfig) -> Result<(Status, String)> {
    let target = target(config)?;
    let stream = connect(&target.host, target.port).await?;
    exchange(stream, &target).await
}

fn target(config: &RedisConfig) -> Result<Target> {
    let Some(connection_string) = config.connection_string.as_deref() else {
        return Ok(Target {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
            database: config.database,
        });
    };

    let parsed = connection::parse(connection_string)?;
    if parsed.scheme != "redis" {
        bail!("Unsupported connection string scheme: {}", parsed.scheme);
    }
    let database = parsed
        .database
        .map(|db| {
            db.parse::<u32>()
                .with_context(|| format!("Invalid database index: {db}"))
        })
        .transpose()?;

    Ok(Target {
        host: parsed.host,
        port: parsed.port.unwrap_or(DEFAULT_PORT),
        username: parsed.username,
        password: parsed.password,
        database,
    })
}

async fn command<S>(stream: &mut BufStream<S>, args: &[&str]) -> Result<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&encode_command(args)).await?;
    stream.flush().await?;
    read_reply(stream).await
}

async fn exchange<S>(stream: S, target: &Target) -> Result<(Status, String)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufStream::new(stream);

    if let Some(password) = target.password.as_deref() {
        let reply = match target.username.as_deref() {
            Some(username) => command(&mut stream, &["AUTH", username, password]).await,
            None => command(&mut stream, &["AUTH", password]).await,
        }
        .context("AUTH failed")?;
        if let Reply::Error(e) = reply {
            bail!("Authentication failed: {e}");
        }
    }

    if let Some(database) = target.database {
        let reply = command(&mut stream, &["SELECT", &database.to_string()])
            .await
            .context("SELECT failed")?;
        if let Reply::Error(e) = reply {
            bail!("SELECT {database} failed: {e}");
        }
    }

    match command(&mut stream, &["PING"]).await.context("PING failed")? {
        Reply::Simple(pong) if pong == "PONG" => {}
        Reply::Error(e) => bail!("PING failed: {e}"),
        other => bail!("Unexpected PING reply: {other:?}"),
    }

    let version = match command(&mut stream, &["INFO", "server"]).await {
        Ok(Reply::Bulk(Some(info))) => parse_server_version(&String::from_utf8_lossy(&info)),
        _ => None,
    };

    let message = version.map_or_else(|| "PONG".to_string(), |v| format!("PONG (Redis {v})"));
    Ok((Status::Up, message))
}
