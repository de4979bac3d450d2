use super::{Executor, connect, invalid_config, run_probe};
use crate::{
    config::{MongoConfig, MonitorConfig, MonitorType},
    result::{ExecutorResult, Status},
    wire::mongo::{HEADER_LEN, OP_MSG, hello_command, op_msg, parse_connection_string, parse_header},
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::{io::ErrorKind, time::Duration};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const REQUEST_ID: i32 = 1;

/// Sends `{ hello: 1 }` as an `OP_MSG` and accepts any reply carrying at
/// least a full message header
#[derive(Debug, Default)]
pub struct MongoExecutor;

#[async_trait]
impl Executor for MongoExecutor {
    fn monitor_type(&self) -> MonitorType {
        MonitorType::Mongodb
    }

    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult {
        let MonitorConfig::Mongodb(mongo) = config else {
            return invalid_config(MonitorType::Mongodb, config);
        };
        run_probe(MonitorType::Mongodb, timeout, check(mongo)).await
    }
}

async fn check(config: &MongoConfig) -> Result<(Status, String)> {
    let (host, port) = parse_connection_string(&config.connection_string);
    let stream = connect(&host, port).await?;
    exchange(stream).await
}

async fn exchange<S>(mut stream: S) -> Result<(Status, String)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(&op_msg(REQUEST_ID, &hello_command()))
        .await
        .context("Failed to send hello command")?;

    let mut header = [0u8; HEADER_LEN];
    if let Err(e) = stream.read_exact(&mut header).await {
        if e.kind() == ErrorKind::UnexpectedEof {
            bail!("Incomplete response from server (less than {HEADER_LEN} bytes)");
        }
        return Err(e).context("Failed to read hello response");
    }
    let header = parse_header(&header).context("Invalid response header")?;

    let message = if header.op_code == OP_MSG && header.response_to == REQUEST_ID {
        format!(
            "MongoDB responded to hello ({} bytes)",
            header.message_length
        )
    } else {
        format!(
            "MongoDB responded (opCode {}, {} bytes)",
            header.op_code, header.message_length
        )
    };
    Ok((Status::Up, message))
}
