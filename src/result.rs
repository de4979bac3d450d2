use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Down,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("UP"),
            Self::Down => f.write_str("DOWN"),
        }
    }
}

/// Peer certificate details collected for HTTPS targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsInfo {
    pub issuer: String,
    pub subject: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    /// Negative once the certificate has expired
    pub days_until_expiry: i64,
    /// SHA-256 of the DER certificate, `AB:CD:...`
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsResult {
    pub record_type: String,
    pub records: Vec<String>,
}

/// Uniform result returned by every executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorResult {
    pub status: Status,
    pub latency_ms: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_info: Option<TlsInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_result: Option<DnsResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_loss: Option<f64>,
}

impl ExecutorResult {
    #[must_use]
    pub fn up(latency: Duration, message: impl Into<String>) -> Self {
        Self::new(Status::Up, latency, message)
    }

    #[must_use]
    pub fn down(latency: Duration, message: impl Into<String>) -> Self {
        Self::new(Status::Down, latency, message)
    }

    #[must_use]
    pub fn new(status: Status, latency: Duration, message: impl Into<String>) -> Self {
        Self {
            status,
            latency_ms: millis(latency),
            message: message.into(),
            tls_info: None,
            dns_result: None,
            packet_loss: None,
        }
    }

    /// `DOWN` result for a probe that did not finish in time
    #[must_use]
    pub fn timeout(latency: Duration, timeout: Duration) -> Self {
        Self::down(latency, format!("Timeout after {}ms", millis(timeout)))
    }

    #[must_use]
    pub fn with_tls_info(mut self, tls_info: Option<TlsInfo>) -> Self {
        self.tls_info = tls_info;
        self
    }

    #[must_use]
    pub fn with_dns_result(mut self, dns_result: DnsResult) -> Self {
        self.dns_result = Some(dns_result);
        self
    }

    #[must_use]
    pub fn with_packet_loss(mut self, packet_loss: f64) -> Self {
        self.packet_loss = Some(packet_loss);
        self
    }

    #[must_use]
    pub fn is_up(&self) -> bool {
        self.status == Status::Up
    }
}

/// Whole milliseconds, saturating
#[must_use]
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
