use super::Action;
use crate::{
    executor::ExecutorRegistry,
    result::{ExecutorResult, millis},
};
use tracing::info;

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action) -> anyhow::Result<ExecutorResult> {
    match action {
        Action::Probe {
            monitor_type,
            config,
            timeout,
        } => {
            let registry = ExecutorRegistry::new()?;
            info!(monitor = %monitor_type, timeout_ms = millis(timeout), "running probe");

            let result = registry
                .execute(monitor_type.as_str(), &config, timeout)
                .await?;
            println!("{}", serde_json::to_string(&result)?);
            Ok(result)
        }
    }
}
