use super::{Executor, connect, invalid_config, run_probe};
use crate::{
    config::{MonitorConfig, MonitorType, TcpConfig},
    result::{ExecutorResult, Status},
};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Succeeds when a TCP connection can be established
#[derive(Debug, Default)]
pub struct TcpExecutor;

#[async_trait]
impl Executor for TcpExecutor {
    fn monitor_type(&self) -> MonitorType {
        MonitorType::Tcp
    }

    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult {
        let MonitorConfig::Tcp(tcp) = config else {
            return invalid_config(MonitorType::Tcp, config);
        };
        run_probe(MonitorType::Tcp, timeout, check(tcp)).await
    }
}

async fn check(config: &TcpConfig) -> Result<(Status, String)> {
    let stream = connect(&config.host, config.port).await?;
    drop(stream);
    Ok((
        Status::Up,
        format!("Port {} is open on {}", config.port, config.host),
    ))
}
