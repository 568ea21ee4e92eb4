//! Saakra learning gateway (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ trace ─▶ timeout / body limit
//!                                               │
//!                                               ▼
//!                      identity ─▶ rate limiter ─▶ sanitize ─▶ validate
//!                                                                 │
//!                                                                 ▼
//!     Client Response                                      learning service
//!     ◀────────────── error normaliser ◀──── handler ◀──────────┘
//!                                              │
//!                                              └──▶ audit log (detached)
//!
//!     Admin listener (optional): status, analytics, rate-limit counters
//!     Prometheus listener (optional): request, rejection and error metrics
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use saakra_gateway::config::load_config;
use saakra_gateway::lifecycle::{wait_for_signal, Shutdown};
use saakra_gateway::observability::{logging, metrics};
use saakra_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "saakra-gateway")]
#[command(about = "Validated, rate-limited API gateway for Saakra Learning", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability)?;

    tracing::info!("saakra-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limit_window_ms = config.rate_limit.window_ms,
        rate_limit_max_requests = config.rate_limit.max_requests,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Address already checked by config validation.
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
    let server = HttpServer::new(config)?;
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        finished = &mut server_task => {
            finished??;
        }
        _ = wait_for_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
