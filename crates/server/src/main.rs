//! swcache server entry point.
//!
//! Loads configuration, registers the worker in the background and serves the
//! MCP tools on stdio. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig, ServiceWorker, WorkerConfig};
use swcache_core::{AppConfig, CacheDb};
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
    tracing::info!(origin = %config.origin, version = %config.version, "starting swcache server on stdio transport");

    let storage = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let worker = Arc::new(ServiceWorker::new(WorkerConfig::from_app(&config)?, Arc::new(storage), Arc::new(network)));

    let registrar = Arc::clone(&worker);
    let (attempts, delay) = (config.install_max_attempts, config.install_retry_delay());
    tokio::spawn(async move {
        match registrar.register_with_retry(attempts, delay).await {
            Ok(Some(report)) => {
                tracing::info!(deleted = report.deleted.len(), failed = report.failed.len(), "worker activated")
            }
            Ok(None) => tracing::info!("worker installed, waiting to activate"),
            Err(err) => tracing::error!(error = %err, "worker registration gave up"),
        }
    });

    let handler = handler::SwCacheServer::new(worker);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
