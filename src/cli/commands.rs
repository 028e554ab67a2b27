//! Command handlers for Media Fetcher CLI
//!
//! Each handler receives the fully loaded configuration and wires up the
//! pieces of the application the command needs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use super::args::{InfoArgs, ServeArgs, SweepArgs};
use super::startup::build_engine;
use crate::app::artifact::{ArtifactManager, ArtifactReaper};
use crate::app::engine::normalize_source_url;
use crate::app::service::{FetchService, VideoInfo};
use crate::app::session::SessionStore;
use crate::config::AppConfig;
use crate::errors::{AppError, EngineError, Result};
use crate::server::{self, AppState};

/// Upper bound on waiting for the reaper task after shutdown
const REAPER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle the serve command
///
/// Runs the HTTP service until Ctrl+C, then stops the reaper and waits for
/// running jobs within the configured shutdown timeout.
pub async fn handle_serve(args: ServeArgs, mut config: AppConfig) -> Result<()> {
    args.apply_to(&mut config);
    config.validate()?;

    let (engine, status) = build_engine(&mut config, args.simulate).await?;
    if status.is_ready() {
        info!("Startup: {}", status.summary());
    } else {
        warn!("Startup: {}", status.summary());
    }

    let service = Arc::new(
        FetchService::build(
            engine,
            &config.engine,
            config.jobs.clone(),
            config.artifacts.clone(),
        )
        .await?,
    );
    info!(
        "Artifacts in {} (kept {:?} after retrieval, {:?} if never retrieved)",
        config.artifacts.download_dir.display(),
        config.artifacts.retention_after_retrieval,
        config.artifacts.unretrieved_retention
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let reaper = ArtifactReaper::start(service.artifacts().clone(), shutdown_tx.subscribe());

    let listener = server::bind(&config.server.host, config.server.port).await?;
    server::serve(
        listener,
        AppState::new(service.clone()),
        server::shutdown_signal(),
    )
    .await?;

    let _ = shutdown_tx.send(());
    reaper.join(REAPER_SHUTDOWN_TIMEOUT).await;

    if let Err(e) = service.shutdown(config.jobs.shutdown_timeout).await {
        warn!("{}", e);
    }
    info!("Server stopped");
    Ok(())
}

/// Handle the info command
pub async fn handle_info(args: InfoArgs, mut config: AppConfig) -> Result<()> {
    let url = normalize_source_url(&args.url)?;
    let (engine, _) = build_engine(&mut config, args.simulate).await?;

    let timeout = config.engine.probe_timeout;
    let media = tokio::time::timeout(timeout, engine.probe(&url))
        .await
        .map_err(|_| EngineError::Timeout {
            seconds: timeout.as_secs(),
        })??;
    let info = VideoInfo::from(media);

    if args.json {
        let rendered = serde_json::to_string_pretty(&info)
            .map_err(|e| AppError::generic(format!("Failed to render JSON: {}", e)))?;
        println!("{}", rendered);
    } else {
        println!("Title:     {}", info.title);
        println!("Duration:  {}", info.duration);
        println!("Thumbnail: {}", info.thumbnail);
        println!("URL:       {}", url);
    }
    Ok(())
}

/// Handle the sweep command
///
/// No sessions exist outside a running service, so every artifact past the
/// unretrieved retention window is eligible. Files not named after a
/// session id are never touched.
pub async fn handle_sweep(args: SweepArgs, mut config: AppConfig) -> Result<()> {
    if let Some(dir) = args.download_dir {
        config.artifacts.download_dir = dir;
    }
    config.artifacts.validate()?;

    let manager = ArtifactManager::new(config.artifacts.clone(), Arc::new(SessionStore::new())).await?;
    let report = manager.sweep_expired().await?;

    println!(
        "Removed {} expired artifacts from {}",
        report.files_deleted,
        config.artifacts.download_dir.display()
    );
    Ok(())
}

/// Handle the config command
pub fn handle_config(config: &AppConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
