//! SCATS journey client - plan one journey from the command line
//!
//! Picks a start and a destination site, asks the routing service for the
//! best path (optionally with alternates) and prints the displayed route
//! set as JSON.
//!
//! Module structure:
//! - `domain/` - Core types (Site, Selection, RouteRequest, RouteError)
//! - `io/` - External interfaces (routing service client, mock router)
//! - `services/` - Journey logic (JourneyPlanner, dispatcher, presentation)
//! - `infra/` - Infrastructure (Config, Metrics)
//!
//! Usage:
//!   cargo run -- --start 970 --target 2000
//!   cargo run -- --start 970 --target 3001 --alternates 3 --mock

use anyhow::{bail, Context};
use clap::Parser;
use scats_journey::infra::{Config, Metrics};
use scats_journey::io::HttpRouteService;
use scats_journey::services::JourneyPlanner;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// SCATS journey client
#[derive(Parser, Debug)]
#[command(name = "scats-journey", version, about)]
struct Args {
    /// Path to TOML configuration file (else CONFIG_FILE, else config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Start site id
    #[arg(short, long)]
    start: String,

    /// Destination site id
    #[arg(short, long)]
    target: String,

    /// Also request alternate paths (bare flag uses routes.alternate_count)
    #[arg(short, long, num_args = 0..=1)]
    alternates: Option<Option<u32>>,

    /// Override the routing service base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Route against an in-process mock router instead of the configured service
    #[arg(long)]
    mock: bool,

    /// Include the full map scene in the output
    #[arg(long)]
    scene: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[derive(Serialize)]
struct Output<'a> {
    journey_id: Option<&'a str>,
    status: String,
    routes: &'a scats_journey::services::RouteSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    scene: Option<scats_journey::services::MapScene>,
}

fn init_logging(json: bool) {
    // Default: INFO, use RUST_LOG=debug for full request visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so stdout carries only the JSON result
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve the mock router on an ephemeral port and point the config at it
#[cfg(feature = "mock")]
async fn start_mock_router(
    config: Config,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<Config> {
    use scats_journey::io::mock_router::{serve_mock_router, RoadGraph, DEFAULT_DEGREE};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind mock router")?;
    let addr = listener.local_addr()?;
    let graph = Arc::new(RoadGraph::from_registry(&config.site_registry(), DEFAULT_DEGREE));
    tokio::spawn(async move {
        if let Err(e) = serve_mock_router(listener, graph, shutdown).await {
            tracing::error!(error = %e, "mock_router_error");
        }
    });
    Ok(config.with_service_base_url(&format!("http://{addr}")))
}

#[cfg(not(feature = "mock"))]
async fn start_mock_router(_: Config, _: watch::Receiver<bool>) -> anyhow::Result<Config> {
    bail!("--mock needs a build with the `mock` feature")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    info!(version = %env!("CARGO_PKG_VERSION"), git = %env!("GIT_HASH"), "scats_journey_starting");

    let mut config = Config::load(args.config.as_deref());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if args.mock {
        config = start_mock_router(config, shutdown_rx).await?;
    } else if let Some(url) = &args.base_url {
        config = config.with_service_base_url(url);
    }

    info!(
        config_file = %config.config_file(),
        evaluate_url = %config.evaluate_url(),
        alternates_url = %config.alternates_url(),
        timeout_ms = %config.service_timeout_ms(),
        alternate_count = %config.alternate_count(),
        "config_loaded"
    );

    let service =
        HttpRouteService::new(&config).context("Failed to build routing service client")?;
    let metrics = Arc::new(Metrics::new());
    let mut planner = JourneyPlanner::new(&config, Arc::new(service), metrics.clone());

    planner.start_journey();
    for id in [&args.start, &args.target] {
        if !planner.click_site(id) {
            bail!("unknown site '{id}'");
        }
    }

    let outcome = match args.alternates {
        None => planner.submit().await,
        Some(None) => planner.submit_alternates().await,
        Some(Some(n)) => planner.submit_with_alternates(n).await,
    };

    metrics.report().log();
    let _ = shutdown_tx.send(true);

    let routes = planner.routes();
    let output = Output {
        journey_id: planner.journey_id(),
        status: planner.status().to_string(),
        routes: &routes,
        scene: args.scene.then(|| planner.scene()),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    outcome.with_context(|| format!("Route request {} -> {} failed", args.start, args.target))?;
    Ok(())
}
