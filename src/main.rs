mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use mailharvest_core::config::AppConfig;
use mailharvest_fetch::PageFetcher;
use mailharvest_storage::Storage;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    apply_env_overrides(&mut config);

    let storage = Storage::new(&config.database.connection_url(), config.database.pool_size).await?;
    storage.run_migrations().await?;

    let fetcher = PageFetcher::new(&config.crawl)?;

    match cli.command {
        Commands::Worker => {
            info!(worker_id = %config.worker.worker_id, "starting worker loop");
            let (tx, rx) = tokio::sync::broadcast::channel(1);
            tokio::spawn(async move {
                shutdown_signal().await;
                info!("shutdown signal received, stopping worker loop");
                let _ = tx.send(());
            });
            mailharvest_runner::run_worker_loop(
                storage,
                fetcher,
                config.worker.worker_id,
                std::time::Duration::from_secs(config.worker.poll_interval_secs),
                config.crawl.max_concurrent,
                config.crawl.max_depth,
                rx,
            )
            .await;
        }
        Commands::Crawl { search_id } => {
            let search_id = search_id.unwrap_or(config.worker.search_id);
            info!(search_id, "running one-shot search");
            mailharvest_runner::run_search(
                &storage,
                &fetcher,
                search_id,
                &config.worker.worker_id,
                config.crawl.max_concurrent,
                config.crawl.max_depth,
            )
            .await?;
        }
        Commands::Serve { port } => {
            let state = Arc::new(mailharvest_api::AppState::new(storage, fetcher, config.crawl));
            let app = mailharvest_api::router(state);
            let bind_addr = format!("0.0.0.0:{port}");
            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            info!("listening on http://{}", bind_addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Overrides config fields from the env vars table. `DB_*` always wins if
/// set; the rest fall back to the config file's values.
fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(v) = std::env::var("DB_HOST") {
        config.database.host = v;
    }
    if let Ok(v) = std::env::var("DB_PORT") {
        if let Ok(n) = v.parse() {
            config.database.port = n;
        }
    }
    if let Ok(v) = std::env::var("DB_USER") {
        config.database.user = v;
    }
    if let Ok(v) = std::env::var("DB_PASSWORD") {
        config.database.password = v;
    }
    if let Ok(v) = std::env::var("DB_NAME") {
        config.database.name = v;
    }
    if let Ok(v) = std::env::var("MAX_DEPTH") {
        if let Ok(n) = v.parse() {
            config.crawl.max_depth = n;
        }
    }
    if let Ok(v) = std::env::var("TIMEOUT") {
        if let Ok(n) = v.parse() {
            config.crawl.timeout_secs = n;
        }
    }
    if let Ok(v) = std::env::var("MAX_CONCURRENT") {
        if let Ok(n) = v.parse() {
            config.crawl.max_concurrent = n;
        }
    }
    if let Ok(v) = std::env::var("WORKER_ID") {
        config.worker.worker_id = v;
    }
    if let Ok(v) = std::env::var("POLL_INTERVAL") {
        if let Ok(n) = v.parse() {
            config.worker.poll_interval_secs = n;
        }
    }
    if let Ok(v) = std::env::var("SEARCH_ID") {
        if let Ok(n) = v.parse() {
            config.worker.search_id = n;
        }
    }
}
