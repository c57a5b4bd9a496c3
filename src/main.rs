//! Edge Gateway (v1)
//!
//! Authenticates inbound requests with a signed token and forwards them to a
//! single upstream service.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────────┐
//!                        │                       EDGE GATEWAY                        │
//!                        │                                                           │
//!   Client Request       │  ┌──────────┐  ┌──────┐  ┌──────┐  ┌────────┐  ┌───────┐  │
//!   ─────────────────────┼─▶│ security │─▶│ cors │─▶│ body │─▶│ access │─▶│ rate  │  │
//!                        │  │ headers  │  │      │  │ json │  │  log   │  │ limit │  │
//!                        │  └──────────┘  └──────┘  └──────┘  └────────┘  └───┬───┘  │
//!                        │                                                    │      │
//!                        │                  POST /login ◀─────────────────────┤      │
//!                        │                  (token issuer)                    │      │
//!                        │                                                    ▼      │
//!                        │                                        ┌─────────────┐    │
//!                        │                     ANY /api/*  ──────▶│  auth gate  │    │
//!                        │                                        │  (verifier) │    │
//!                        │                                        └──────┬──────┘    │
//!                        │                                               ▼           │
//!   Client Response      │                                        ┌─────────────┐    │
//!   ◀────────────────────┼────────────────────────────────────────│  forwarder  │◀───┼──── Upstream
//!                        │                                        └─────────────┘    │
//!                        └──────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use edge_gateway::config::load_config;
use edge_gateway::lifecycle::bind_listener;
use edge_gateway::lifecycle::signals::shutdown_signal;
use edge_gateway::observability::{init_tracing, metrics};
use edge_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "Token-authenticated edge proxy for a single upstream", long_about = None)]
struct Args {
    /// Optional TOML configuration file. Environment variables override it.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("edge-gateway: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.observability);

    tracing::info!("edge-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        upstream = %config.upstream.base_url,
        protected_prefix = %config.upstream.protected_prefix,
        rate_limit_enabled = config.rate_limit.enabled,
        rate_limit_max = config.rate_limit.max_requests,
        rate_limit_window_secs = config.rate_limit.window_secs,
        token_ttl_secs = ?config.auth.token_ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener_config = config.listener.clone();
    let server = match HttpServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let listener = match bind_listener(&listener_config).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
