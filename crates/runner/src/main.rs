//! DriveGuard - Main Entry Point
//!
//! Reads per-tick observations as JSON lines on stdin (one line per
//! frame from the perception collaborator), drives the monitoring
//! session, and prints the session summary on stream end.

use anyhow::Context;
use geolocate::Geolocator;
use runner::{init_logging, render_summary, JsonLineSource, RunnerConfig, SessionRunner};
use std::sync::Arc;
use storage::Repository;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== DriveGuard v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting driver alertness monitoring...");

    let config = RunnerConfig::load().context("loading configuration")?;

    let repository = Arc::new(Repository::new());

    // One lookup per process; events run untagged if it fails.
    let geolocator =
        Geolocator::new(config.geolocation.clone()).context("building geolocation client")?;
    let location = geolocator.resolve().await;

    let stdin = std::io::stdin();
    let mut source = JsonLineSource::new(stdin.lock());

    let mut session = SessionRunner::new(&config, Arc::clone(&repository), location)
        .context("starting session")?;
    let stats = session.run(&mut source).await.context("running session")?;

    println!("{}", render_summary(&stats));
    Ok(())
}
