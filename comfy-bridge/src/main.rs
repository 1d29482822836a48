//! comfy-bridge - ComfyUI tools for agent hosts over MCP.

use std::env;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use comfy_bridge::config::{Config, Transport};
use comfy_bridge::engine::ComfyClient;
use comfy_bridge::mcp::{self, McpServer};
use comfy_bridge::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("comfy-bridge {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    let mut config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Check comfy-bridge.toml or the COMFY_BRIDGE__* environment variables.",
            e
        )
    })?;
    if args.iter().any(|a| a == "--http") {
        config.server.transport = Transport::Http;
    }

    // stdout belongs to the stdio transport, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(
        "Starting {} {} against ComfyUI at {}",
        config.server.name,
        VERSION,
        config.engine.base_url
    );

    let engine = Arc::new(ComfyClient::new(&config.engine)?);
    let transport = config.server.transport;
    let state = Arc::new(AppState::new(config, engine));
    let server = Arc::new(McpServer::new(state));

    match transport {
        Transport::Stdio => mcp::stdio::run(server).await?,
        Transport::Http => mcp::http::run(server).await?,
    }

    Ok(())
}
