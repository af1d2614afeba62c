//! AI API Gateway (binary)
//!
//! A server-side gateway between mobile clients and a third-party
//! generative-AI HTTP API.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌───────────────────────────────────────────────┐
//!                  │                   GATEWAY                      │
//!                  │                                                │
//!  Client Request  │  ┌──────┐   ┌─────────┐   ┌──────────────┐    │
//!  ────────────────┼─▶│ auth │──▶│rate_limit│──▶│  normalize   │   │
//!                  │  └──┬───┘   └────┬────┘   └──────┬───────┘    │
//!                  │     │            │               ▼             │
//!                  │     │            │        ┌──────────────┐    │      Upstream
//!                  │     │            │        │   forward    │────┼────▶ AI API
//!                  │     │            │        └──────┬───────┘    │
//!  Client Response │  ┌──▼────────────▼───────────────▼───────┐    │
//!  ◀───────────────┼──│       respond (JSON envelope)         │    │
//!                  │  └───────────────────────────────────────┘    │
//!                  │                                                │
//!                  │  cross-cutting: config, secrets, observability │
//!                  └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ai_gateway::config::loader::load_config;
use ai_gateway::{GatewayConfig, HttpServer};

#[derive(Parser)]
#[command(name = "ai-gateway", about = "Authenticating, rate-limiting gateway for a generative-AI API")]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when absent.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    // RUST_LOG takes precedence; otherwise the configured level applies.
    let default_filter = format!(
        "ai_gateway={level},tower_http={level}",
        level = config.observability.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("ai-gateway v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        upstream = %config.upstream.base_url,
        window_ms = config.rate_limit.window_ms,
        max_requests = config.rate_limit.max_requests,
        persistent_store = config.rate_limit.redis_url.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            ai_gateway::observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let server = HttpServer::new(config)?;
    server.run(listener).await?;

    Ok(())
}
