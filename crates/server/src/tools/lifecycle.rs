//! lifecycle_install and lifecycle_activate tool implementations.

use holdfast_client::Engine;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use holdfast_core::Error;

/// Output shared by both lifecycle tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LifecycleOutput {
    /// Generation label the signal acted on.
    pub label: String,
    /// Lifecycle state after the signal.
    pub state: String,
    /// Snapshots written by install.
    pub assets: Option<usize>,
    /// Generations destroyed by activation.
    #[serde(default)]
    pub evicted: Vec<String>,
}

fn render(output: &LifecycleOutput) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

pub async fn install_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let report = engine.install().await?;
    let state = engine.lifecycle_state().await?;
    render(&LifecycleOutput {
        label: report.label,
        state: state.as_str().to_string(),
        assets: Some(report.assets),
        evicted: Vec::new(),
    })
}

pub async fn activate_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let report = engine.activate().await?;
    let state = engine.lifecycle_state().await?;
    render(&LifecycleOutput {
        label: report.current,
        state: state.as_str().to_string(),
        assets: None,
        evicted: report.evicted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{activate_label, offline_engine, output_json};

    #[tokio::test]
    async fn test_install_offline_fails() {
        let (engine, db) = offline_engine().await;

        let err = install_impl(&engine).await.unwrap_err();
        assert_eq!(err.code.0, -32004);
        assert!(db.list_generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_without_install_fails() {
        let (engine, _db) = offline_engine().await;
        assert!(activate_impl(&engine).await.is_err());
    }

    #[tokio::test]
    async fn test_activate_waiting_generation_evicts_others() {
        let (engine, db) = offline_engine().await;
        activate_label(&db, "old").await;
        db.create_generation(engine.version()).await.unwrap();
        db.mark_generation_waiting(engine.version()).await.unwrap();

        let output = output_json(&activate_impl(&engine).await.unwrap());
        assert_eq!(output["label"], engine.version());
        assert_eq!(output["state"], "active");
        assert_eq!(output["evicted"], serde_json::json!(["old"]));
        assert_eq!(db.list_generations().await.unwrap(), vec![engine.version().to_string()]);
    }
}
