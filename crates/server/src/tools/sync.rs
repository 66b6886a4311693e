//! background_sync tool implementation.

use holdfast_client::{Engine, PENDING_MESSAGES};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use holdfast_core::Error;

/// Parameters for the background_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BackgroundSyncParams {
    /// Sync tag registered by the application (default: "sync-pending-messages").
    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_tag() -> String {
    PENDING_MESSAGES.into()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BackgroundSyncOutput {
    pub tag: String,
    /// Queued requests delivered.
    pub drained: usize,
}

pub async fn sync_impl(engine: &Engine, params: BackgroundSyncParams) -> Result<CallToolResult, McpError> {
    if params.tag.trim().is_empty() {
        return Err(Error::InvalidInput("tag cannot be empty".into()).into());
    }

    let drained = engine.background_sync(&params.tag).await?;
    let output = BackgroundSyncOutput { tag: params.tag, drained };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
