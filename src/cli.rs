//! Command-line interface definitions for Reader Questions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The crawl and the enrichment pass are separate invocations. Every flag is
//! optional and overrides the matching key of the config file.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Reader Questions application.
///
/// # Examples
///
/// ```sh
/// # Crawl with defaults into ./data
/// reader_questions crawl
///
/// # Crawl more gently, one year per checkpoint
/// reader_questions --data-dir /srv/rq crawl --batch-size 1 --delay-ms 1500
///
/// # Backfill subtitles starting at record 68
/// reader_questions enrich --start-index 68
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "READER_QUESTIONS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the cache, checkpoint and dataset files
    #[arg(short, long, env = "READER_QUESTIONS_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk the archive and accumulate reader questions, resuming from the last checkpoint
    Crawl(CrawlArgs),
    /// Re-visit collected articles and backfill their subtitles
    Enrich(EnrichArgs),
}

#[derive(Args, Debug, Default)]
pub struct CrawlArgs {
    /// Years processed concurrently per checkpoint
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Issues of one year fetched concurrently
    #[arg(long)]
    pub issue_batch_size: Option<usize>,

    /// Pause before every request, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Total attempts per request
    #[arg(long)]
    pub retry_count: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct EnrichArgs {
    /// First dataset index to enrich
    #[arg(long)]
    pub start_index: Option<usize>,

    /// Records fetched concurrently per batch
    #[arg(long)]
    pub batch_size: Option<usize>,
}
