use anyhow::Context;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_regroup::config::Config;
use m3u_regroup::services::{
    fetcher::PlaylistFetcher,
    pipeline::{Pipeline, TracingObserver},
    writer::save_text,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "m3u_regroup=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let started = Instant::now();
    tracing::info!("Starting m3u-regroup v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env();
    config.validate()?;

    let ruleset = config.load_ruleset().context("Failed to load ruleset")?;
    tracing::info!(
        "Ruleset {} loaded ({} rules, region policy {:?})",
        ruleset.version,
        ruleset.rules.len(),
        ruleset.region_policy
    );

    let pipeline = Pipeline::from_config(&config, &ruleset).context("Failed to build pipeline")?;

    // Download the source playlist
    let fetcher = PlaylistFetcher::from_config(&config)?;
    tracing::info!("Fetching playlist: {}", config.source_url);
    let content = fetcher.fetch(&config.source_url).await?;

    // Transform
    let output = pipeline.run(&content, &mut TracingObserver);

    // Save outputs
    save_text(&config.annotated_path(), &output.annotated).await?;
    save_text(&config.grouped_path(), &output.grouped).await?;

    if let Some(path) = config.passthrough_path() {
        let (processed, replaced) = pipeline.rewriter().rewrite_document(&content);
        tracing::info!("Replaced {} occurrences of '{}'", replaced, config.multicast_scheme);
        save_text(&path, &processed).await?;
    }

    tracing::info!(
        "Playlist processing completed in {}ms: {} entries in {} groups",
        started.elapsed().as_millis(),
        output.stats.entries,
        output.stats.groups.len()
    );

    if let Ok(summary) = serde_json::to_string(&output.stats) {
        tracing::debug!(stats = %summary, "Run summary");
    }

    Ok(())
}
