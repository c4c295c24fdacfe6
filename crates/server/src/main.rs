//! sslwatch server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use sslwatch_core::{AppConfig, Db, RecencyCache, Reconciler};
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
    tracing::info!(db_path = %config.db_path.display(), "Starting sslwatch server on stdio transport");

    let db = Db::open(&config.db_path).await?;
    let reconciler = Reconciler::new(db, RecencyCache::new(), config.topology_policy());

    if config.reload_on_start {
        let snapshots = reconciler
            .reload_recent(config.deadline(), config.recency_window())
            .await?;
        tracing::info!(snapshots = snapshots.len(), "warmed recency cache");
    }

    let handler = handler::SslWatchServer::new(reconciler, config);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
