//! PocketFiler - virtual filesystem host
//!
//! Starts the façade over the configured storage root, repairs state left
//! by an interrupted run and logs a storage summary. The UI layer embeds
//! the same `AppState`.

use anyhow::Result;
use app_core::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and panic hook first
    let _log_guard = app_log::init()?;

    tracing::info!("PocketFiler starting...");

    // Load configuration
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Invalid configuration, using defaults: {}", e);
            AppConfig::default()
        }
    };

    if let Err(e) = app_log::cleanup_old_logs(config.general.log_retention_days) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    // Initialize application state
    let state = AppState::new(config)?;
    run(&state).await
}

async fn run(state: &AppState) -> Result<()> {
    let filer = &state.filer;

    // A desktop host owns its storage root outright
    filer.set_storage_permission(true);

    let purged = filer.recover().await?;
    if purged > 0 {
        tracing::info!("Recovered from an interrupted trash purge");
    }

    for drive in filer.list("root").await? {
        tracing::info!(id = %drive.id, name = %drive.name, "Drive");
    }

    let usage = filer.analyze_storage("root").await?;
    tracing::info!(
        total_bytes = usage.total_size,
        folders = usage.folder_breakdown.len(),
        "Storage summary"
    );
    for (file_type, bytes) in &usage.type_breakdown {
        tracing::info!("  {:<10} {} bytes", file_type.as_str(), bytes);
    }
    for file in &usage.large_files {
        tracing::debug!("  large: {} ({} bytes)", file.id, file.size);
    }

    let trashed = filer.list("trash").await?.len();
    tracing::info!("{} items in trash", trashed);

    Ok(())
}
