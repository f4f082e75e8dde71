//! MCP server binary: the ERPNext tool surface over stdio.

use rmcp::{transport::stdio, ServiceExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use erpnext_mcp::client::ErpNextClient;
use erpnext_mcp::config::Config;
use erpnext_mcp::server::ErpNextTools;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the MCP transport, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    info!(url = %config.url, "starting ERPNext MCP server");

    let client = ErpNextClient::new(config)?;
    let service = ErpNextTools::new(client).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
