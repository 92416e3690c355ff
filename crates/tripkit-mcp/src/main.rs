use std::sync::Arc;

use anyhow::Result;
use rmcp::{transport::stdio, ServiceExt};
use tracing::{error, info};
use tripkit_mcp::{Credentials, EndpointHandler, McpServer};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol; logs go to stderr only.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tripkit_mcp=info".parse()?)
                .add_directive("tripkit_lib=info".parse()?),
        )
        .init();

    let handler = EndpointHandler::from_env()?;
    info!(generator = handler.generator_name(), "MCP server ready on stdio");

    // The local process owner is the caller; a token may still be presented
    // for servers configured with API keys.
    let credentials = match std::env::var("TRIPKIT_CLIENT_TOKEN") {
        Ok(token) if !token.trim().is_empty() => Credentials::bearer(token.trim()),
        _ => Credentials::default(),
    };

    let server = McpServer::new(Arc::new(handler)).with_credentials(credentials);
    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!(error = %e, "MCP session failed to initialize");
    })?;

    service.waiting().await?;
    info!("stdio session closed");
    Ok(())
}
