//! Similar-products aggregation service.
//!
//! # Architecture Overview
//!
//! ```text
//!   GET /product/{id}/similar
//!          │
//!          ▼
//!   ┌──────────────┐   ┌───────────────────────────────────────────────┐
//!   │ http server  │──▶│ aggregation service                           │
//!   │ (axum)       │   │                                               │
//!   └──────────────┘   │  similar ids ─▶ cache ─▶ breaker ─▶ network ──┼──▶ similar-ids service
//!          ▲           │       │                                       │
//!          │           │       ▼  fan-out, ≤ max_concurrency in flight │
//!          │           │  details ───▶ cache ─▶ breaker ─▶ network ────┼──▶ product service
//!          │           │       │                                       │
//!          │           │       ▼  ordered merge, failures dropped      │
//!   ordered products ◀─┼───────┘                                       │
//!                      └───────────────────────────────────────────────┘
//!
//!   Cross-cutting: config · observability (tracing, prometheus) · lifecycle
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use similarity_aggregator::config::{load_config, AggregatorConfig};
use similarity_aggregator::http::HttpServer;
use similarity_aggregator::lifecycle::{wait_for_shutdown_signal, Shutdown, StartupError};
use similarity_aggregator::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "similarity-aggregator")]
#[command(about = "Aggregates similar products from the similar-ids and product services", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path).map_err(StartupError::from)?,
        None => AggregatorConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "similarity-aggregator starting");
    tracing::info!(
        config_file = ?args.config,
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        max_concurrency = config.aggregation.max_concurrency,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    let bind_address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;

    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    let shutdown = Shutdown::new();
    let sweepers = server.components().spawn_cache_sweepers(&shutdown);

    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    for sweeper in sweepers {
        let _ = sweeper.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
