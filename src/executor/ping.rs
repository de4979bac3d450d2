use super::{Executor, Outcome, connect, invalid_config, run_probe_with_grace};
use crate::{
    config::{MonitorConfig, MonitorType, PingConfig},
    result::{ExecutorResult, Status, millis},
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use regex::Regex;
use std::{
    io::ErrorKind,
    net::IpAddr,
    process::Stdio,
    sync::LazyLock,
    time::Duration,
};
use tokio::{process::Command, time::Instant};
use tracing::warn;

const ECHO_COUNT: u8 = 3;
/// Headroom for spawning the subprocess on top of the probe timeout
const SPAWN_BUFFER: Duration = Duration::from_secs(2);

static LOSS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"([\d.]+)%\s+(?:packet\s+)?loss").ok());
static POSIX_RTT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:rtt|round-trip) min/avg/max/(?:mdev|stddev) = [\d.]+/([\d.]+)/").ok()
});
static WINDOWS_AVERAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Average = (\d+)ms").ok());
static REPLY_TIME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"time[=<]([\d.]+)\s*ms").ok());

/// ICMP echo via the system `ping` binary, falling back to a TCP connect
/// when the environment does not allow raw sockets
#[derive(Debug, Default)]
pub struct PingExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    const fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    /// Arguments bounding the whole run by [`Platform::deadline`]
    fn args(self, hostname: &str, timeout: Duration, packet_size: Option<u16>) -> Vec<String> {
        let mut args = match self {
            // -w is the overall deadline, -W would only bound each reply
            Self::Linux => vec![
                "-c".to_string(),
                ECHO_COUNT.to_string(),
                "-w".to_string(),
                whole_secs(timeout).to_string(),
            ],
            Self::MacOs => vec![
                "-c".to_string(),
                ECHO_COUNT.to_string(),
                "-t".to_string(),
                whole_secs(timeout).to_string(),
            ],
            // -w is per reply, so the timeout is shared between the echoes
            Self::Windows => vec![
                "-n".to_string(),
                ECHO_COUNT.to_string(),
                "-w".to_string(),
                windows_reply_ms(timeout).to_string(),
            ],
        };

        if let Some(size) = packet_size {
            let flag = if self == Self::Windows { "-l" } else { "-s" };
            args.push(flag.to_string());
            args.push(size.to_string());
        }
        args.push(hostname.to_string());
        args
    }

    /// Longest the subprocess runs with the arguments from [`Platform::args`]
    fn deadline(self, timeout: Duration) -> Duration {
        match self {
            Self::Linux | Self::MacOs => Duration::from_secs(whole_secs(timeout)),
            Self::Windows => {
                Duration::from_millis(windows_reply_ms(timeout) * u64::from(ECHO_COUNT))
            }
        }
    }

    /// Extra time the outer timer allows past `timeout`, so the subprocess
    /// always reaches its own deadline and reports its packet loss first
    fn grace(self, timeout: Duration) -> Duration {
        self.deadline(timeout).saturating_sub(timeout) + SPAWN_BUFFER
    }
}

fn whole_secs(timeout: Duration) -> u64 {
    timeout.as_secs().max(1)
}

fn windows_reply_ms(timeout: Duration) -> u64 {
    (millis(timeout) / u64::from(ECHO_COUNT)).max(1)
}

#[derive(Debug, PartialEq)]
struct Reply {
    status: Status,
    message: String,
    packet_loss: Option<f64>,
}

#[async_trait]
impl Executor for PingExecutor {
    fn monitor_type(&self) -> MonitorType {
        MonitorType::Ping
    }

    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult {
        let MonitorConfig::Ping(ping) = config else {
            return invalid_config(MonitorType::Ping, config);
        };

        run_probe_with_grace(
            MonitorType::Ping,
            timeout,
            Platform::current().grace(timeout),
            probe(ping, timeout),
        )
        .await
    }
}

impl Outcome for Reply {
    fn into_result(self, latency: Duration) -> ExecutorResult {
        let result = ExecutorResult::new(self.status, latency, self.message);
        match self.packet_loss {
            Some(loss) => result.with_packet_loss(loss),
            None => result,
        }
    }
}

async fn probe(config: &PingConfig, timeout: Duration) -> Result<Reply> {
    let hostname = config.hostname.trim();
    validate_hostname(hostname)?;

    let args = Platform::current().args(hostname, timeout, config.packet_size);
    let output = Command::new("ping")
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    match output {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !output.status.success() && is_capability_error(&stderr) {
                warn!(hostname, error = %stderr.trim(), "ping not permitted, using TCP fallback");
                return tcp_fallback(hostname).await;
            }
            interpret(&stdout, &stderr)
        }
        Err(e)
            if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied)
                || is_capability_error(&e.to_string()) =>
        {
            warn!(hostname, error = %e, "ping unavailable, using TCP fallback");
            tcp_fallback(hostname).await
        }
        Err(e) => Err(e).context("Failed to run ping"),
    }
}

/// Reject names the ping binary would read as options
fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() {
        bail!("No hostname configured");
    }
    if hostname.starts_with('-') || hostname.chars().any(|c| c.is_whitespace() || c.is_control()) {
        bail!("Invalid hostname: {hostname:?}");
    }
    Ok(())
}

/// Errors caused by the environment rather than the network
fn is_capability_error(text: &str) -> bool {
    const MARKERS: [&str; 7] = [
        "operation not permitted",
        "permission denied",
        "command not found",
        "no such file or directory",
        "eacces",
        "enoent",
        "cap_net_raw",
    ];
    let text = text.to_lowercase();
    MARKERS.iter().any(|marker| text.contains(marker))
}

fn fallback_port(hostname: &str) -> u16 {
    if hostname
        .trim_matches(['[', ']'])
        .parse::<IpAddr>()
        .is_ok()
    {
        53
    } else {
        80
    }
}

async fn tcp_fallback(hostname: &str) -> Result<Reply> {
    tcp_fallback_on(hostname, fallback_port(hostname)).await
}

/// A completed connect counts as reachable. Loss cannot be measured this
/// way, so none is reported.
async fn tcp_fallback_on(hostname: &str, port: u16) -> Result<Reply> {
    let started = Instant::now();
    let stream = connect(hostname, port)
        .await
        .with_context(|| format!("Host unreachable on port {port} (tcp)"))?;
    drop(stream);

    Ok(Reply {
        status: Status::Up,
        message: format!(
            "Reachable on port {port} in {}ms (tcp)",
            millis(started.elapsed())
        ),
        packet_loss: None,
    })
}

fn capture(re: &LazyLock<Option<Regex>>, text: &str) -> Option<f64> {
    re.as_ref()?
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

fn packet_loss(output: &str) -> Option<f64> {
    capture(&LOSS, output)
}

/// Average round-trip time, trying the POSIX summary, the Windows summary and
/// finally the first per-reply `time=` value
fn round_trip(output: &str) -> Option<f64> {
    capture(&POSIX_RTT, output)
        .or_else(|| capture(&WINDOWS_AVERAGE, output))
        .or_else(|| capture(&REPLY_TIME, output))
}

fn interpret(stdout: &str, stderr: &str) -> Result<Reply> {
    let loss = packet_loss(stdout);
    let rtt = round_trip(stdout);

    match (loss, rtt) {
        (Some(loss), _) if loss >= 100.0 => Ok(Reply {
            status: Status::Down,
            message: format!("Host unreachable ({loss}% packet loss)"),
            packet_loss: Some(100.0),
        }),
        (loss, Some(rtt)) => {
            let loss = loss.unwrap_or(0.0);
            Ok(Reply {
                status: Status::Up,
                message: format!("Reply in {rtt}ms ({loss}% packet loss)"),
                packet_loss: Some(loss),
            })
        }
        (Some(loss), None) => Ok(Reply {
            status: Status::Down,
            message: format!("No round-trip time reported ({loss}% packet loss)"),
            packet_loss: Some(loss),
        }),
        (None, None) => {
            let detail = [stderr.trim(), stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .and_then(|s| s.lines().next())
                .unwrap_or("no output");
            bail!("Unable to parse ping output: {detail}")
        }
    }
}
