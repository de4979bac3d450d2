use super::{Executor, invalid_config, run_probe};
use crate::{
    config::{DockerConfig, MonitorConfig, MonitorType},
    result::{ExecutorResult, Status},
};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

/// Container state from the Docker Engine inspect endpoint
#[derive(Debug)]
pub struct DockerExecutor {
    client: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Inspect {
    #[serde(default)]
    name: String,
    state: ContainerState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerState {
    running: bool,
    #[serde(default)]
    status: String,
    health: Option<Health>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Health {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl DockerExecutor {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .build()
            .context("Failed to build Docker API client")?;
        Ok(Self { client })
    }

    async fn inspect(&self, config: &DockerConfig) -> Result<(Status, String)> {
        let url = inspect_url(&config.base_url, &config.container_id)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Docker API request failed")?;

        let code = response.status();
        if !code.is_success() {
            let detail = response
                .json::<ApiError>()
                .await
                .map(|e| e.message)
                .unwrap_or_default();
            if detail.is_empty() {
                bail!("Docker API returned {}", code.as_u16());
            }
            bail!("Docker API returned {}: {detail}", code.as_u16());
        }

        let inspect: Inspect = response
            .json()
            .await
            .context("Invalid container inspect response")?;
        Ok(evaluate(&inspect, &config.container_id))
    }
}

#[async_trait]
impl Executor for DockerExecutor {
    fn monitor_type(&self) -> MonitorType {
        MonitorType::Docker
    }

    async fn execute(&self, config: &MonitorConfig, timeout: Duration) -> ExecutorResult {
        let MonitorConfig::Docker(docker) = config else {
            return invalid_config(MonitorType::Docker, config);
        };
        run_probe(MonitorType::Docker, timeout, self.inspect(docker)).await
    }
}

/// `{base}/containers/{id}/json`, with the id percent-encoded
fn inspect_url(base_url: &str, container_id: &str) -> Result<Url> {
    let container_id = container_id.trim();
    if container_id.is_empty() {
        bail!("No container configured");
    }
    let mut url =
        Url::parse(base_url).with_context(|| format!("Invalid Docker API URL: {base_url}"))?;
    url.path_segments_mut()
        .map_err(|()| anyhow!("Invalid Docker API URL: {base_url}"))?
        .pop_if_empty()
        .extend(["containers", container_id, "json"]);
    Ok(url)
}

fn evaluate(inspect: &Inspect, container_id: &str) -> (Status, String) {
    let name = inspect.name.strip_prefix('/').unwrap_or(&inspect.name);
    let name = if name.is_empty() { container_id } else { name };
    let state = &inspect.state;

    if !state.running {
        let status = if state.status.is_empty() {
            "stopped"
        } else {
            state.status.as_str()
        };
        return (
            Status::Down,
            format!("Container {name} is not running ({status})"),
        );
    }

    match state.health.as_ref().map(|h| h.status.as_str()) {
        Some("healthy") => (
            Status::Up,
            format!("Container {name} is running (healthy)"),
        ),
        Some(health) => (
            Status::Down,
            format!("Container {name} is running but {health}"),
        ),
        None => (Status::Up, format!("Container {name} is running")),
    }
}
