//! `weatherguard-service` entry point.
//!
//! ## Modes
//!
//! - **`serve`** (default): load the newest model artifact, bind the HTTP
//!   listener and answer requests until Ctrl+C. A missing or broken
//!   artifact is logged and the service keeps running without a model.
//! - **`probe`**: load the newest artifact and print the classifier's
//!   output on a fixed set of weather scenarios, then a one-feature-at-a-time
//!   sensitivity check. Fails if nothing loads.
//! - **`ping`**: query `/api/health` on the configured address.
//! - **`scenarios`**: replay the canned prediction suites against a running
//!   service on the configured address and print one line per request.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use weatherguard_model::load_latest_model;
use weatherguard_service::config::{ConfigOverrides, ServiceConfig};
use weatherguard_service::context::AppContext;
use weatherguard_service::client::{self, ApiClient};
use weatherguard_service::http::HttpServer;
use weatherguard_service::probe::{probe_model, responds_to_inputs, sensitivity};
use weatherguard_service::scenarios::run_scenarios;

#[derive(Debug, Parser)]
#[command(name = "weatherguard-service", version, about = "Weather risk API for Tunisian governorates")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:8000
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Experiment tree searched for model artifacts
    #[arg(long, global = true)]
    mlruns_dir: Option<PathBuf>,

    /// Number of HTTP worker threads
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Run the loaded model over the diagnostic scenarios
    Probe,
    /// Check that a running service answers its health endpoint
    Ping,
    /// Send the canned prediction suites to a running service
    Scenarios,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = ServiceConfig::resolve_config_path(cli.config.as_deref());
    let mut config = ServiceConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    config.apply_overrides(ConfigOverrides {
        bind_addr: cli.bind,
        mlruns_dir: cli.mlruns_dir,
        workers: cli.workers,
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Probe => probe(&config),
        Command::Ping => ping(&config).await,
        Command::Scenarios => scenarios(&config).await,
    }
}

async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    tracing::info!("weatherguard-service v{} starting", env!("CARGO_PKG_VERSION"));

    let context = Arc::new(AppContext::load(&config.mlruns_dir));
    if !context.is_loaded() {
        tracing::warn!(
            mlruns_dir = %context.mlruns_dir().display(),
            "Serving without a model, predictions will answer 503: {}",
            context.load_error().unwrap_or("unknown error")
        );
    }
    let addr = config.socket_addr()?;
    let server = HttpServer::bind(addr).with_context(|| format!("binding {addr}"))?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Signal received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    server
        .run(Arc::clone(&context), config.workers, shutdown_rx)
        .await?;

    tracing::info!(
        uptime_s = context.uptime_s(),
        "weatherguard-service exiting cleanly"
    );
    Ok(())
}

fn probe(config: &ServiceConfig) -> anyhow::Result<()> {
    let model = load_latest_model(&config.mlruns_dir)?;
    println!(
        "{} ({}, detected by {}) from {}",
        model.classifier.class_name(),
        model.model_type,
        model.detection.method(),
        model.path.display()
    );
    for row in probe_model(&model)? {
        println!("{row}");
    }

    println!();
    let rows = sensitivity(&model)?;
    for row in &rows {
        println!("{row}");
    }
    if !responds_to_inputs(&rows) {
        tracing::warn!("Probability does not move with any single feature, the model may be constant");
    }
    Ok(())
}

async fn ping(config: &ServiceConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let health = client::ping(addr)
        .await
        .with_context(|| format!("ping: cannot reach http://{addr}"))?;
    println!("{}", serde_json::to_string(&health)?);
    Ok(())
}

async fn scenarios(config: &ServiceConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let api = ApiClient::new(addr)?;
    let results = run_scenarios(&api)
        .await
        .with_context(|| format!("scenarios: cannot reach http://{addr}"))?;
    let rejected = results
        .iter()
        .filter(|r| r.outcome.assessment().is_none())
        .count();
    for result in &results {
        println!("{result}");
    }
    tracing::info!(total = results.len(), rejected, "scenarios finished");
    Ok(())
}
