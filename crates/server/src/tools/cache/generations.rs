//! cache_generations tool implementation.

use holdfast_client::Engine;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use holdfast_core::{CacheDb, Error, GenerationInfo};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGenerationsOutput {
    /// Version label this process deploys.
    pub version: String,
    /// Lifecycle state of that version.
    pub state: String,
    /// Generation currently serving requests.
    pub current: Option<String>,
    pub generations: Vec<GenerationInfo>,
}

pub async fn generations_impl(engine: &Engine, db: &CacheDb) -> Result<CallToolResult, McpError> {
    let output = CacheGenerationsOutput {
        version: engine.version().to_string(),
        state: engine.lifecycle_state().await?.as_str().to_string(),
        current: engine.current_generation().await,
        generations: db.describe_generations().await?,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{activate_label, offline_engine, output_json};

    #[tokio::test]
    async fn test_generations_empty_store() {
        let (engine, db) = offline_engine().await;

        let output = output_json(&generations_impl(&engine, &db).await.unwrap());
        assert_eq!(output["state"], "idle");
        assert!(output["current"].is_null());
        assert_eq!(output["generations"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_generations_after_restore() {
        let (engine, db) = offline_engine().await;
        activate_label(&db, engine.version()).await;
        db.create_generation("next").await.unwrap();
        engine.restore().await.unwrap();

        let output = output_json(&generations_impl(&engine, &db).await.unwrap());
        assert_eq!(output["state"], "active");
        assert_eq!(output["current"], engine.version());

        let generations = output["generations"].as_array().unwrap();
        assert_eq!(generations.len(), 2);
        assert_eq!(generations[0]["label"], engine.version());
        assert_eq!(generations[0]["state"], "active");
        assert_eq!(generations[1]["state"], "installing");
    }
}
