//! intercept tool implementation.
//!
//! Runs one request through the engine and reports where the answer came from.

use std::collections::BTreeMap;

use bytes::Bytes;
use holdfast_client::{Engine, InterceptedRequest};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use holdfast_core::Error;

/// Input parameters for the intercept tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterceptParams {
    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// Set for top-level page loads.
    #[serde(default)]
    pub navigate: bool,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body, sent as UTF-8.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the intercept tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterceptOutput {
    /// Routing class the request was assigned.
    pub class: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// network, store or fallback
    pub source: String,
}

fn build_request(engine: &Engine, params: InterceptParams) -> Result<InterceptedRequest, McpError> {
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ToolError::InvalidMethod(params.method.clone()))?;
    let url = engine.resolve(&params.url)?;

    let mut headers = HeaderMap::new();
    for (name, value) in &params.headers {
        let invalid = |reason: String| ToolError::InvalidHeader { name: name.clone(), reason };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        headers.insert(header_name, header_value);
    }

    let mut request = InterceptedRequest::new(method, url);
    request.navigate = params.navigate;
    request.headers = headers;
    request.body = params.body.map(Bytes::from);
    Ok(request)
}

/// Implementation of the intercept tool.
pub async fn intercept_impl(engine: &Engine, params: InterceptParams) -> Result<CallToolResult, McpError> {
    let request = build_request(engine, params)?;
    let class = engine.classify(&request);
    let response = engine.intercept(&request).await;

    let headers = response
        .headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect();
    let output = InterceptOutput {
        class: class.as_str().to_string(),
        status: response.status.as_u16(),
        headers,
        body: response.text(),
        source: response.source.as_str().to_string(),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
