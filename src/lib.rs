pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod db;
pub mod entities;
pub mod importer;
pub mod mail;
pub mod state;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
pub use config::Config;
use db::Store;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    match cli.command {
        Some(cli::Commands::Serve) | None => run_server(config).await,

        Some(cli::Commands::LoadCsv { dir }) => cmd_load_csv(&config, &dir).await,

        Some(cli::Commands::Init) => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    info!(
        "Reviewarr v{} starting in server mode...",
        env!("CARGO_PKG_VERSION")
    );

    let prometheus_handle = if config.server.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    let host = config.server.host.clone();
    let port = config.server.port;

    let state = api::create_app_state_from_config(config, prometheus_handle).await?;
    let app = api::router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("API server running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {e}"),
    }
}

async fn cmd_load_csv(config: &Config, dir: &Path) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_url,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let report = importer::import_dir(&store, dir).await?;

    println!("Loaded {} rows from {}", report.loaded, dir.display());

    if report.is_clean() {
        Ok(())
    } else {
        for err in &report.errors {
            eprintln!("  {err}");
        }
        anyhow::bail!("{} rows failed to import", report.errors.len())
    }
}
