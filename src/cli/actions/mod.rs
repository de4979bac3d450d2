mod run;

use crate::{
    config::{MonitorConfig, MonitorType},
    result::ExecutorResult,
};
use std::time::Duration;

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    Probe {
        monitor_type: MonitorType,
        config: MonitorConfig,
        timeout: Duration,
    },
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the probe cannot be dispatched to an executor
    pub async fn execute(self) -> anyhow::Result<ExecutorResult> {
        run::execute(self).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::{
        config::{DnsConfig, TcpConfig},
        result::Status,
    };
    use tokio::net::TcpListener;

    #[test]
    fn test_action_debug() {
        let action = Action::Probe {
            monitor_type: MonitorType::Tcp,
            config: MonitorConfig::Tcp(TcpConfig::default()),
            timeout: Duration::from_secs(1),
        };
        let debug_str = format!("{action:?}");
        assert!(debug_str.contains("Probe"));
        assert!(debug_str.contains("Tcp"));
    }

    #[tokio::test]
    async fn test_execute_probe() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let action = Action::Probe {
            monitor_type: MonitorType::Tcp,
            config: MonitorConfig::Tcp(TcpConfig {
                host: "127.0.0.1".to_string(),
                port,
            }),
            timeout: Duration::from_secs(2),
        };
        let result = action.execute().await.unwrap();
        assert_eq!(result.status, Status::Up);
    }

    #[tokio::test]
    async fn test_execute_mismatched_config() {
        let action = Action::Probe {
            monitor_type: MonitorType::Tcp,
            config: MonitorConfig::Dns(DnsConfig::default()),
            timeout: Duration::from_secs(1),
        };
        let err = action.execute().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration for DNS passed to the TCP executor"
        );
    }
}
