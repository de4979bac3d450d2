//! Probe execution engine for uptime monitoring.
//!
//! Each monitored target kind (HTTP, TCP, ping, DNS, Redis, `MySQL`,
//! `PostgreSQL`, SQL Server, `MongoDB`, Docker) has one [`executor::Executor`]
//! that performs a single health probe within a caller supplied timeout and
//! reports an [`ExecutorResult`]. Executors are looked up through the
//! [`ExecutorRegistry`].
//!
//! ```rust,ignore
//! use probepulse::{ExecutorRegistry, MonitorConfig, config::TcpConfig};
//! use std::time::Duration;
//!
//! let registry = ExecutorRegistry::new()?;
//! let config = MonitorConfig::Tcp(TcpConfig { host: "db.internal".into(), port: 5432 });
//! let result = registry.execute("TCP", &config, Duration::from_secs(5)).await?;
//! println!("{}", serde_json::to_string(&result)?);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod result;
pub mod tls;
pub mod wire;

pub use config::{MonitorConfig, MonitorType};
pub use error::Error;
pub use executor::{Executor, ExecutorRegistry};
pub use result::{DnsResult, ExecutorResult, Status, TlsInfo};
