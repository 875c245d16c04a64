//! Polis Analysis - batch profiler.
//!
//! Reads a profile request (JSON) from the path given as the first argument,
//! builds a community profile, and prints it as JSON on stdout. Ctrl-C cancels
//! the run without emitting a partial profile.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use polis_analysis::{LexiconSentiment, PoliticalAnalysisEngine, ProfileRequest};
use polis_common::config::Config;
use polis_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_and_validate()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Polis Analysis v{}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .context("usage: polis-analysis <request.json> [--quality]")?;
    let with_quality = std::env::args().any(|a| a == "--quality");

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {path}"))?;
    let request: ProfileRequest =
        serde_json::from_str(&content).with_context(|| format!("parsing {path}"))?;

    let engine = PoliticalAnalysisEngine::from_config(&config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    let profile = if with_quality {
        engine
            .build_profile_with_quality(&request, Arc::new(LexiconSentiment::new()), &cancel)
            .await?
    } else {
        engine.build_profile(&request, &cancel).await?
    };

    println!("{}", profile.to_json()?);
    Ok(())
}
