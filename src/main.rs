//! CLI entry point: mirror the remote tree, then write the manifest.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use repo_mirror::{EngineError, HttpClient, Manifest, MirrorEngine, TransportSettings};
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = args.to_config();
    config.validate().context("invalid configuration")?;
    if config.tls.is_insecure() {
        warn!("running with TLS certificate verification disabled (--insecure)");
    }

    let client = HttpClient::with_settings(TransportSettings::from(&config))
        .context("failed to build HTTP client")?;
    let engine = MirrorEngine::new(Arc::new(client), config.concurrency)?
        .with_traversal(config.traversal);

    info!(url = %config.root_url, output = %config.output_dir.display(), "mirror starting");
    let written = match engine
        .download_tree(&config.root_url, &config.output_dir)
        .await
    {
        Ok(result) => {
            if result.is_complete() {
                info!(files = result.succeeded, "all entries mirrored");
            } else {
                warn!(
                    succeeded = result.succeeded,
                    failed = result.failed.len(),
                    "mirror finished with failures"
                );
            }
            result.written
        }
        // The run still completes, with an empty manifest.
        Err(e @ (EngineError::RootListing { .. } | EngineError::CreateRoot(_))) => {
            error!(error = %e, "nothing mirrored");
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    // Only files written by this run are listed, never leftovers on disk.
    let root = config.output_dir.clone();
    let manifest = tokio::task::spawn_blocking(move || Manifest::from_files(&root, written))
        .await
        .context("manifest task panicked")??;
    manifest
        .write_to(&config.manifest_path)
        .context("failed to write manifest")?;

    info!(
        files = manifest.len(),
        path = %config.manifest_path.display(),
        "manifest written"
    );
    Ok(())
}
