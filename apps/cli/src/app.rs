//! Wires the HTTP clients into an upload and follows its events.

use std::sync::Arc;

use anyhow::Context;
use sluice_http::{HttpCoordinator, HttpObjectStore};
use sluice_transfer::FileSource;
use sluice_upload::{UploadEvent, UploadRequest, UploadSessionController};

use crate::Cli;
use crate::config::Config;

/// Applies command-line overrides on top of the loaded config.
pub fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.coordinator {
        config.coordinator_url = url.clone();
    }
    if let Some(owner) = &cli.owner {
        config.owner_id = owner.clone();
    }
    if let Some(mb) = cli.chunk_size_mb {
        config.chunk_size = mb.saturating_mul(1024 * 1024);
    }
    if let Some(n) = cli.concurrency {
        config.concurrency = n;
    }
}

/// Object name to request: `--name`, else the file name.
fn object_name(cli: &Cli) -> anyhow::Result<String> {
    if let Some(name) = &cli.name {
        return Ok(name.clone());
    }
    cli.file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("file path has no file name")
}

/// Uploads the file and returns the final object location.
pub async fn run(config: Config, cli: Cli) -> anyhow::Result<String> {
    let source = FileSource::open(&cli.file)
        .with_context(|| format!("cannot open {}", cli.file.display()))?;
    let request = UploadRequest {
        filename: object_name(&cli)?,
        content_type: cli.content_type.clone(),
        owner_id: config.owner_id.clone(),
    };

    let coordinator =
        HttpCoordinator::with_timeout(&config.coordinator_url, config.request_timeout())?;
    let store = HttpObjectStore::with_timeout(config.request_timeout())?;

    let mut controller = UploadSessionController::new(
        Arc::new(coordinator),
        Arc::new(store),
        config.upload_options(),
    );
    let mut events = controller
        .take_events()
        .context("event receiver already taken")?;

    let cancel = controller.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("SIGINT received, cancelling upload");
            cancel.cancel();
        }
    });

    let reporter = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                UploadEvent::Progress { percent, message } => {
                    tracing::info!(percent, "{message}");
                }
                UploadEvent::Succeeded { location } => {
                    tracing::info!(%location, "upload succeeded");
                }
                UploadEvent::Failed { reason } => {
                    tracing::error!(%reason, "upload failed");
                }
            }
        }
    });

    tracing::info!(
        file = %cli.file.display(),
        filename = %request.filename,
        chunk_size = config.chunk_size,
        concurrency = config.concurrency,
        "starting upload"
    );
    let result = controller.upload(request, Arc::new(source)).await;

    // Closes the channel so the reporter drains and exits.
    drop(controller);
    let _ = reporter.await;

    let outcome = result?;
    Ok(outcome.location)
}
