//! Path-based streaming reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                 PATH PROXY                   │
//!   Client Request         │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!   ───────────────────────┼─▶│  http    │──▶│ routing  │──▶│ headers  │  │
//!   /stream/https:/host/.. │  │ server + │   │ target   │   │ filter   │  │
//!                          │  │ method   │   │ resolver │   └────┬─────┘  │
//!                          │  └──────────┘   └──────────┘        │        │
//!                          │                                     ▼        │
//!   Client Response        │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!   ◀──────────────────────┼──│ streamed │◀──│ upstream │◀──│transport │◀─┼── Upstream
//!                          │  │ response │   │  relay   │   │+timeouts │  │
//!                          │  └──────────┘   └──────────┘   └──────────┘  │
//!                          └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use path_proxy::config::loader::{load_config, ConfigError};
use path_proxy::config::validation::validate_config;
use path_proxy::config::ProxyConfig;
use path_proxy::http::HttpServer;
use path_proxy::lifecycle::{signals, Shutdown};
use path_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "path-proxy", version)]
#[command(about = "Path-based HTTP streaming reverse proxy", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override proxy.mount_path (use "/" for a catch-all mount).
    #[arg(short, long)]
    mount: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(mount) = cli.mount {
        config.proxy.mount_path = mount;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!("path-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        mount_path = %config.proxy.mount_path,
        chunk_size = config.proxy.chunk_size,
        connect_millis = config.timeouts.connect_millis,
        read_millis = config.timeouts.read_millis,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        signals::trigger_on_signal(&shutdown).await;
    });

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
