//! reCAPTCHA verification gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                       GATEWAY                          │
//!                       │                                                        │
//!   Client Request      │  ┌──────────┐   ┌───────────┐   ┌─────────────────┐   │
//!   ────────────────────┼─▶│   http   │──▶│   cors    │──▶│   admission     │   │
//!                       │  │  server  │   │ preflight │   │ limiter → key   │   │
//!                       │  └──────────┘   └───────────┘   └────────┬────────┘   │
//!                       │                                          │            │
//!                       │                                          ▼            │
//!   Client Response     │                 ┌───────────┐   ┌─────────────────┐   │
//!   ◀───────────────────┼─────────────────│  verify   │──▶│   assessment    │───┼──▶ reCAPTCHA
//!                       │                 │  handler  │◀──│     client      │◀──┼─── Enterprise
//!                       │                 └───────────┘   └─────────────────┘   │
//!                       │                                                        │
//!                       │   config · observability · lifecycle (cross-cutting)  │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use recaptcha_gateway::config::{load_config, ObservabilityConfig};
use recaptcha_gateway::lifecycle::{build_server, signals, Shutdown};
use recaptcha_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "recaptcha-gateway", version)]
#[command(about = "Rate-limited, API-key protected reCAPTCHA Enterprise verification gateway")]
struct Cli {
    /// Optional TOML configuration file. Environment variables override it.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port (overrides PORT and the config file).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = match load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            logging::init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let mut config = loaded.config;
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    logging::init_logging(&config.observability);
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address(),
        rate_limit_requests = config.rate_limit.requests,
        rate_limit_window_secs = config.rate_limit.window_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let bind_address = config.listener.bind_address();
    let server = build_server(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Server stopped gracefully");
    Ok(())
}
