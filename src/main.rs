//! # Reader Questions
//!
//! A resumable crawler that walks a year → issue → article archive and
//! collects "reader question" articles into one ordered JSON dataset.
//!
//! ## Features
//!
//! - Two hierarchy shapes: research edition monthly issues from 2008 on,
//!   15th-day issues before that
//! - Every parsed page result cached on disk, so a re-run is a full cache hit
//! - Checkpoint after every batch of years; an interrupted crawl resumes
//!   where it stopped
//! - A separate enrichment pass that backfills article subtitles
//!
//! ## Usage
//!
//! ```sh
//! reader_questions crawl
//! reader_questions --config crawl.yaml enrich --start-index 68
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: `fetch` performs paced, retried GET requests
//! 2. **Caching**: `cache` memoizes every structured walker result
//! 3. **Walking**: `walkers` turn listing and article pages into typed entries
//! 4. **Crawling**: `crawl` drives the traversal with bounded concurrency
//! 5. **Checkpointing**: `checkpoint` persists progress and the dataset
//! 6. **Enrichment**: `enrich` revisits collected articles for their subtitles

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cache;
mod checkpoint;
mod cli;
mod config;
mod crawl;
mod enrich;
mod error;
mod fetch;
mod models;
#[cfg(test)]
mod testing;
mod utils;
mod walkers;

use cli::{Cli, Command};
use config::CrawlConfig;
use crawl::Crawler;
use enrich::Enricher;
use fetch::{HttpFetcher, Identity, RetryFetch, Throttled};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("reader_questions starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = CrawlConfig::resolve(&args)?;
    debug!(?config, "Resolved configuration");

    if let Err(e) = ensure_writable_dir(&config.data_dir).await {
        error!(
            path = %config.data_dir.display(),
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    match &args.command {
        Command::Crawl(_) => {
            let http = HttpFetcher::new(
                Identity::Fixed {
                    user_agent: config.user_agent.clone(),
                },
                config.request_timeout(),
            )?;
            let source = Throttled::new(
                RetryFetch::new(http, config.retry_count, config.backoff()),
                config.request_throttle(),
            );
            let summary = Crawler::new(source, &config)?.run().await?;
            info!(
                years = summary.years_total,
                resumed_at = summary.resumed_at,
                failed_years = summary.years_failed,
                added = summary.records_added,
                total = summary.records_total,
                "Crawl finished"
            );
        }
        Command::Enrich(_) => {
            let enrichment = &config.enrichment;
            let http = HttpFetcher::new(Identity::Rotating, config.request_timeout())?;
            let source = Throttled::new(
                RetryFetch::new(http, enrichment.retry_count, enrichment.backoff()),
                enrichment.request_throttle(),
            );
            let summary = Enricher::new(source, &config)
                .run(config.enrichment_start_index)
                .await?;
            info!(
                total = summary.total,
                start_index = summary.start_index,
                updated = summary.updated,
                not_found = summary.not_found,
                failed = summary.failed,
                "Enrichment finished"
            );
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
