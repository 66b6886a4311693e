//! cache_get tool implementation.
//!
//! Retrieves a snapshot from the current generation by fingerprint or by URL.

use holdfast_client::{Engine, InterceptedRequest};
use reqwest::Method;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use holdfast_core::{Error, Fingerprint};

/// Parameters for the cache_get tool. Exactly one of `fingerprint` and `url` is required.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Hex fingerprint of the snapshot.
    #[serde(default)]
    pub fingerprint: Option<String>,

    /// URL of a GET request to look up, absolute or relative to the origin.
    #[serde(default)]
    pub url: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub fingerprint: Fingerprint,
    pub generation: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub stored_at: String,
}

fn fingerprint_for(engine: &Engine, params: CacheGetParams) -> Result<Fingerprint, McpError> {
    match (params.fingerprint, params.url) {
        (Some(hex), None) => Ok(Fingerprint::from_hex(hex)?),
        (None, Some(url)) => {
            let request = InterceptedRequest::new(Method::GET, engine.resolve(&url)?);
            Ok(engine.fingerprint(&request))
        }
        _ => Err(ToolError::MissingKey("exactly one of fingerprint or url is required").into()),
    }
}

/// Implementation of the cache_get tool.
pub async fn get_impl(engine: &Engine, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let fingerprint = fingerprint_for(engine, params)?;
    let snapshot = engine.snapshot(&fingerprint).await?;

    let output = CacheGetOutput {
        body: String::from_utf8_lossy(&snapshot.body).into_owned(),
        fingerprint: snapshot.fingerprint,
        generation: snapshot.generation,
        method: snapshot.method,
        url: snapshot.url,
        status: snapshot.status,
        headers: snapshot.headers,
        stored_at: snapshot.stored_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize snapshot: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{activate_label, offline_engine, output_json};
    use holdfast_core::StoredSnapshot;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let (engine, _db) = offline_engine().await;
        let params = CacheGetParams { fingerprint: None, url: Some("/index.html".into()) };

        let err = get_impl(&engine, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_requires_one_key() {
        let (engine, _db) = offline_engine().await;
        assert!(get_impl(&engine, CacheGetParams { fingerprint: None, url: None }).await.is_err());

        let both = CacheGetParams { fingerprint: Some("ab".repeat(32)), url: Some("/".into()) };
        assert!(get_impl(&engine, both).await.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_rejects_bad_fingerprint() {
        let (engine, _db) = offline_engine().await;
        let params = CacheGetParams { fingerprint: Some("not-hex".into()), url: None };
        assert_eq!(get_impl(&engine, params).await.unwrap_err().code.0, -32602);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let (engine, db) = offline_engine().await;
        activate_label(&db, engine.version()).await;
        engine.restore().await.unwrap();

        let request = InterceptedRequest::get(engine.resolve("/index.html").unwrap());
        let fingerprint = engine.fingerprint(&request);
        let snapshot = StoredSnapshot {
            fingerprint: fingerprint.clone(),
            generation: engine.version().to_string(),
            method: "GET".into(),
            url: request.url.to_string(),
            status: 200,
            headers: vec![("content-type".into(), "text/html".into())],
            body: b"<h1>home</h1>".to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        };
        db.upsert_snapshot(&snapshot).await.unwrap();

        let by_url = output_json(
            &get_impl(&engine, CacheGetParams { fingerprint: None, url: Some("/index.html".into()) })
                .await
                .unwrap(),
        );
        assert_eq!(by_url["body"], "<h1>home</h1>");

        let by_hash = output_json(
            &get_impl(&engine, CacheGetParams { fingerprint: Some(fingerprint.to_string()), url: None })
                .await
                .unwrap(),
        );
        assert_eq!(by_hash["fingerprint"], fingerprint.as_str());
        assert_eq!(by_hash["status"], 200);
    }
}
