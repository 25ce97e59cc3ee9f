//! Mock routing service
//!
//! Serves `/evaluate` and `/find_alternate_paths` over the configured site
//! registry so the client can run without the traffic-prediction backend.
//!
//! Usage:
//!   cargo run --bin mock-router -- --port 8000
//!   cargo run --bin mock-router -- --config config/dev.toml --degree 3

use clap::Parser;
use scats_journey::infra::Config;
use scats_journey::io::mock_router::{serve_mock_router, RoadGraph, DEFAULT_DEGREE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mock-router")]
#[command(about = "Mock SCATS routing service for local runs")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Path to TOML configuration file for the site list
    /// (else CONFIG_FILE, else config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Nearest sites each site is connected to
    #[arg(long, default_value_t = DEFAULT_DEGREE)]
    degree: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref());
    let graph = Arc::new(RoadGraph::from_registry(&config.site_registry(), args.degree));

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], args.port))).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    serve_mock_router(listener, graph, shutdown_rx).await?;
    Ok(())
}
