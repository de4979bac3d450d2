use super::{
    Executor, dns::DnsExecutor, docker::DockerExecutor, http::HttpExecutor,
    mongodb::MongoExecutor, mysql::MysqlExecutor, ping::PingExecutor, postgres::PostgresExecutor,
    redis::RedisExecutor, sqlserver::SqlServerExecutor, tcp::TcpExecutor,
};
use crate::{
    config::{MonitorConfig, MonitorType},
    error::Error,
    result::ExecutorResult,
};
use futures::FutureExt;
use std::{any::Any, collections::HashMap, panic::AssertUnwindSafe, sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::error;

/// Maps monitor types to one shared executor each
pub struct ExecutorRegistry {
    executors: HashMap<MonitorType, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    /// Registry with every built-in executor
    ///
    /// # Errors
    ///
    /// Returns an error if an executor's HTTP transport cannot be built
    pub fn new() -> anyhow::Result<Self> {
        let mut registry = Self::empty();
        registry.register(Arc::new(HttpExecutor::new()?));
        registry.register(Arc::new(TcpExecutor));
        registry.register(Arc::new(PingExecutor));
        registry.register(Arc::new(DnsExecutor));
        registry.register(Arc::new(RedisExecutor));
        registry.register(Arc::new(MysqlExecutor));
        registry.register(Arc::new(PostgresExecutor));
        registry.register(Arc::new(SqlServerExecutor));
        registry.register(Arc::new(MongoExecutor));
        registry.register(Arc::new(DockerExecutor::new()?));
        Ok(registry)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register `executor` under its monitor type, returning the one it replaces
    pub fn register(&mut self, executor: Arc<dyn Executor>) -> Option<Arc<dyn Executor>> {
        self.executors.insert(executor.monitor_type(), executor)
    }

    /// Look up the executor for a monitor type identifier such as `"HTTP"`
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMonitorType`] if nothing handles `monitor_type`
    pub fn get(&self, monitor_type: &str) -> Result<Arc<dyn Executor>, Error> {
        monitor_type
            .parse::<MonitorType>()
            .ok()
            .and_then(|kind| self.executors.get(&kind))
            .cloned()
            .ok_or_else(|| Error::UnknownMonitorType(monitor_type.to_string()))
    }

    /// Run one probe.
    ///
    /// Target failures, timeouts and even executor panics come back as a
    /// `DOWN` result. Only caller mistakes are errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMonitorType`] for an unknown identifier and
    /// [`Error::ConfigMismatch`] when `config` belongs to another monitor type
    pub async fn execute(
        &self,
        monitor_type: &str,
        config: &MonitorConfig,
        timeout: Duration,
    ) -> Result<ExecutorResult, Error> {
        let executor = self.get(monitor_type)?;
        let expected = executor.monitor_type();
        let actual = config.monitor_type();
        if expected != actual {
            return Err(Error::ConfigMismatch { expected, actual });
        }

        let started = Instant::now();
        match AssertUnwindSafe(executor.execute(config, timeout))
            .catch_unwind()
            .await
        {
            Ok(result) => Ok(result),
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                error!(monitor = %expected, panic = %detail, "executor panicked");
                Ok(ExecutorResult::down(
                    started.elapsed(),
                    format!("Executor panicked: {detail}"),
                ))
            }
        }
    }

    /// Monitor types with a registered executor
    pub fn monitor_types(&self) -> impl Iterator<Item = MonitorType> + '_ {
        self.executors.keys().copied()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
