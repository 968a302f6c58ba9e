//! swcache server entry point.
//!
//! Boots the cache worker (install, activate), starts the eviction sweeper
//! and serves the MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use swcache_client::{CacheWorker, FetchClient, FetchConfig};
use swcache_core::{AppConfig, CacheDb, Caches};

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
    tracing::info!(db = %config.db_path.display(), origin = %config.origin, "starting swcache server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let caches = Caches::new(Arc::new(db));
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let worker = Arc::new(CacheWorker::new(&config, caches, Arc::new(fetcher))?);

    match worker.start().await {
        Ok(report) if report.failed.is_empty() => {}
        Ok(report) => tracing::warn!(failed = report.failed.len(), "activated with stale stores left behind"),
        Err(e) => tracing::warn!(error = %e, "worker not activated, requests pass through to the network"),
    }

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(worker.sweeper().clone().run(shutdown.clone()));

    let server = serve_server(handler::SwCacheServer::new(worker), stdio()).await?;
    server.waiting().await?;

    shutdown.cancel();
    sweeper.await?;

    Ok(())
}
