//! Intercepting device-cloud reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Device request
//!     ──────────────▶ access filter ─▶ request director ─▶ hyper client ─────────▶ Vendor API
//!                                       (upstream URI,                              │
//!                                        request log)                               │
//!     Device response                                                               │
//!     ◀────────────── response interceptor ◀────────────────────────────────────────┘
//!                      ├─ server info: substitute body
//!                      ├─ device settings: patch JSON ─▶ notifier queue ─▶ bot API
//!                      └─ anything else: pass through
//! ```

use clap::Parser;
use std::path::PathBuf;

use intercept_proxy::config;
use intercept_proxy::lifecycle::Shutdown;
use intercept_proxy::net;
use intercept_proxy::notify;
use intercept_proxy::observability::{init_tracing, metrics};
use intercept_proxy::{HttpServer, UpstreamTarget};

#[derive(Parser)]
#[command(name = "intercept-proxy")]
#[command(about = "Intercepting reverse proxy for IoT device cloud traffic", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    tracing::info!("intercept-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let config = config::load(cli.config.as_deref())?;
    let upstream = UpstreamTarget::parse(&config.upstream.url)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %upstream,
        log_mode = %config.logging.mode,
        request_timeout_secs = config.timeouts.request_secs,
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

    let notifier = notify::from_config(&config.notify)?;

    // Bind last so traffic only arrives once everything is ready.
    let listener = net::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, upstream, notifier);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
