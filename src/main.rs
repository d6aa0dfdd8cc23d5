use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod models;
mod pipeline;
mod scanner;
mod services;

use config::{AppConfig, ConfigStore};
use pipeline::{Pipeline, RunOptions};
use scanner::TitleFilter;
use services::catalog::{CatalogClient, CatalogSink};
use services::content_directory::UpnpClient;
use services::tmdb::TmdbClient;

/// Harvest videos from a DLNA media server, match them on TMDB and publish the list
#[derive(Parser, Debug)]
#[command(name = "dlna-harvest", version)]
struct Args {
    /// Reprocess everything even if the file list has not changed
    #[arg(long)]
    force: bool,

    /// Resolve metadata but skip publishing
    #[arg(long)]
    dry: bool,

    /// Path to config.toml (default: ~/.config/dlna-harvest/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dlna_harvest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let config_path = args.config.unwrap_or_else(config::default_config_path);
    let mut store = ConfigStore::load(&config_path)
        .await
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    tracing::debug!("Config file: {}", store.path().display());

    let config = AppConfig::from_file(store.document());
    config.log_config();

    let directory = match (&config.control_url, &config.description_url) {
        (Some(url), _) => UpnpClient::new(url.clone()),
        (None, Some(url)) => UpnpClient::from_description(url)
            .await
            .with_context(|| format!("Failed to read device description {}", url))?,
        (None, None) => anyhow::bail!(
            "No content directory configured (directory.control_url or DLNA_CONTROL_URL)"
        ),
    };
    tracing::debug!("Using control URL {}", directory.control_url());

    let tmdb = TmdbClient::new(
        config.tmdb_api_key()?.to_string(),
        config.tmdb_language.clone(),
    );

    let catalog = if args.dry {
        None
    } else {
        Some(CatalogClient::new(
            config.catalog_url()?,
            config.catalog_api_key()?,
        ))
    };

    let pipeline = Pipeline {
        directory: &directory,
        search: &tmdb,
        catalog: catalog.as_ref().map(|c| c as &dyn CatalogSink),
        filter: TitleFilter::new(&config.blocked_title_patterns),
        root_id: config.root_id.clone(),
    };

    // Ctrl+C stops the harvest between browse calls
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, cancelling...");
                cancel.cancel();
            }
        });
    }

    let options = RunOptions {
        force: args.force,
        dry_run: args.dry,
    };

    let summary = pipeline
        .run(&mut store, options, &cancel)
        .await
        .context("Harvest run failed")?;

    tracing::info!(
        "Run complete: {} harvested, {} matched, {} unmatched, {} failed, published: {}",
        summary.harvested,
        summary.matched,
        summary.unmatched,
        summary.failed,
        summary.published
    );

    Ok(())
}
