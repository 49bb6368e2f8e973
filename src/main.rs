use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use shortener::config::args::parse_config_path;
use shortener::config::{DEFAULT_CONFIG_PATH, get_config, init_config};
use shortener::errors::ShortenerError;
use shortener::services::Shortener;
use shortener::storage::StorageFactory;
use shortener::system::logging::init_logging;
use shortener::system::shutdown::listen_for_shutdown;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        match e.downcast_ref::<ShortenerError>() {
            Some(err) => eprintln!("{}", err.format_colored()),
            None => eprintln!("[ERROR] {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let config_path = parse_config_path(&args).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    init_config(&config_path);
    let config = get_config();

    let _log_guard = init_logging(&config.logging).context("Failed to initialize logging")?;

    let storage = Arc::new(
        StorageFactory::create(&config.storage)
            .await
            .context("Failed to create storage backend")?,
    );
    storage
        .ping()
        .await
        .context("Storage backend is not reachable")?;

    let shortener = Shortener::new(Arc::clone(&storage), config.server.base_url.clone());
    let stats = shortener.stats().await.context("Failed to read storage stats")?;
    info!(
        "Shortener ready on {} ({} backend, {} urls, {} users)",
        config.server.address,
        storage.backend_name(),
        stats.urls,
        stats.users
    );

    listen_for_shutdown(&storage).await;
    warn!("Shutdown complete");
    Ok(())
}
