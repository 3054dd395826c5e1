//! charter MCP server entry point.
//!
//! Boots the offline worker, loads the document through it, and serves the
//! reader tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use charter_client::{FetchClient, FetchConfig};
use charter_core::{AppConfig, CacheDb, Document, Reader, Registration, load_document};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

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
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "Starting charter server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let client = Arc::new(FetchClient::new(FetchConfig::from_app(&config))?);
    let registration = Arc::new(Registration::new(db, client));

    match registration.restore_or_register(config.worker_config()?).await {
        Ok(outcome) => tracing::info!(?outcome, "offline worker ready"),
        Err(e) => tracing::warn!("offline worker registration failed: {}", e),
    }

    let document = match &config.document_file {
        Some(path) => Document::from_path(path),
        None => load_document(registration.as_ref(), &config.document_url()?).await,
    };
    let reader = Arc::new(Reader::new(document, config.reader_options()));

    let handler = handler::CharterServer::new(reader, registration, config.origin_url()?);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
