//! Durable crawl state: progress record, cumulative dataset, per-record files.
//!
//! # Layout
//!
//! ```text
//! data_dir/
//! ├── progress.json        # CrawlProgress, overwritten after every batch of years
//! ├── all-questions.json   # ordered Vec<QuestionRecord>, the source of truth on restart
//! ├── years.json           # year list as discovered
//! ├── question-<year>-<issue>-<title>.json
//! └── cache/               # see crate::cache
//! ```
//!
//! On startup the crawl reads the dataset back as its initial accumulation;
//! in-memory state is always rebuilt from disk, never the other way round.

use std::path::PathBuf;
use tracing::{info, instrument};

use crate::error::StorageError;
use crate::models::{CrawlProgress, QuestionRecord, YearEntry};
use crate::utils::{dash_whitespace, now_rfc3339, read_json, write_json_atomic};

const PROGRESS_FILE: &str = "progress.json";
const DATASET_FILE: &str = "all-questions.json";
const YEARS_FILE: &str = "years.json";

/// Characters of the article title that go into a per-record file name.
const RECORD_TITLE_CHARS: usize = 20;

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.dir.join(DATASET_FILE)
    }

    fn progress_path(&self) -> PathBuf {
        self.dir.join(PROGRESS_FILE)
    }

    pub async fn load_progress(&self) -> Result<Option<CrawlProgress>, StorageError> {
        read_json(&self.progress_path()).await
    }

    /// Overwrite the checkpoint with the current record count and the index
    /// of the next year to process.
    pub async fn save_progress(&self, count: usize, next_year_index: usize) -> Result<CrawlProgress, StorageError> {
        let progress = CrawlProgress {
            count,
            last_processed_year_index: next_year_index,
            timestamp: now_rfc3339(),
        };
        write_json_atomic(&self.progress_path(), &progress).await?;
        Ok(progress)
    }

    /// The accumulated dataset, or an empty one if nothing was saved yet.
    pub async fn load_dataset(&self) -> Result<Vec<QuestionRecord>, StorageError> {
        Ok(read_json(&self.dataset_path()).await?.unwrap_or_default())
    }

    #[instrument(level = "debug", skip_all, fields(count = records.len()))]
    pub async fn save_dataset(&self, records: &[QuestionRecord]) -> Result<(), StorageError> {
        write_json_atomic(&self.dataset_path(), records).await
    }

    pub async fn save_years(&self, years: &[YearEntry]) -> Result<(), StorageError> {
        write_json_atomic(&self.dir.join(YEARS_FILE), years).await?;
        info!(count = years.len(), "Saved year list");
        Ok(())
    }

    /// Write one record to its own file for ad-hoc inspection.
    pub async fn save_record(&self, record: &QuestionRecord) -> Result<PathBuf, StorageError> {
        let path = self.dir.join(record_file_name(record));
        write_json_atomic(&path, record).await?;
        Ok(path)
    }
}

/// `question-<year>-<issue>-<first 20 chars of title>.json`, whitespace runs as `-`.
pub fn record_file_name(record: &QuestionRecord) -> String {
    let title: String = record.title.chars().take(RECORD_TITLE_CHARS).collect();
    let name = format!(
        "question-{}-{}-{}.json",
        record.year,
        dash_whitespace(&record.issue),
        dash_whitespace(&title)
    );
    name.replace(['/', '\\'], "-")
}
