//! Authorizing API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                     GATEWAY                          │
//!                        │                                                      │
//!   Client Request       │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!   ─────────────────────┼─▶│  http   │──▶│ routing  │──▶│       auth       │   │
//!                        │  │ server  │   │ matcher  │   │ engine + cache   │   │
//!                        │  └─────────┘   └──────────┘   └────────┬─────────┘   │
//!                        │                                        │  miss       │
//!                        │                                        ▼             │
//!                        │                               ┌──────────────────┐   │   Introspection
//!                        │                               │  introspection   │───┼──▶ authority
//!                        │                               └──────────────────┘   │
//!   Client Response      │  ┌─────────┐   ┌──────────┐                          │
//!   ◀────────────────────┼──│response │◀──│  proxy   │◀─────────────────────────┼──── Upstream
//!                        │  └─────────┘   └──────────┘                          │
//!                        │                                                      │
//!                        │  config · observability (logs, metrics, audit)       │
//!                        │  security (forwarded headers) · lifecycle            │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use authz_gateway::config::load_config;
use authz_gateway::lifecycle::{signals, Shutdown, DRAIN_TIMEOUT};
use authz_gateway::observability::{logging, metrics};
use authz_gateway::GatewayServer;

#[derive(Parser, Debug)]
#[command(name = "authz-gateway", version, about = "Authorizing API gateway")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "CONFIG_PATH")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        bind_address = %config.server.bind_address,
        routes = config.routes.len(),
        "authz-gateway starting"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = GatewayServer::from_config(config)?;

    let shutdown = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            result??;
            return Ok(());
        }
        _ = signals::shutdown_signal() => shutdown.trigger(),
    }

    match tokio::time::timeout(DRAIN_TIMEOUT, server_task).await {
        Ok(result) => result??,
        Err(_) => tracing::warn!(
            timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "Drain deadline reached, forcing exit"
        ),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
