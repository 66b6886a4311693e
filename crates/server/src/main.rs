//! holdfast server entry point.
//!
//! Boots the interception engine and serves it as an MCP server on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use holdfast_client::{Engine, FetchClient, FetchConfig};
use holdfast_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.version, db = %config.db_path.display(), "Starting holdfast on stdio transport");

    let db = CacheDb::open(&config.db_path).await.map_err(|e| anyhow!(e))?;
    let transport = FetchClient::new(FetchConfig::from(&config)).map_err(|e| anyhow!(e))?;
    let engine = Engine::new(&config, Arc::new(db.clone()), Arc::new(transport)).map_err(|e| anyhow!(e))?;

    engine.restore().await.map_err(|e| anyhow!(e))?;
    match engine.deploy().await {
        Ok(report) => tracing::info!(current = %report.current, evicted = ?report.evicted, "deployed"),
        Err(err) => tracing::error!(error = %err, "deploy failed, previous generation keeps serving"),
    }

    let handler = handler::HoldfastServer::new(Arc::new(engine), db);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
