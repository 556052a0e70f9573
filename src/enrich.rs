//! Subtitle backfill over an existing dataset.
//!
//! Runs independently of the crawl. Every record from `start_index` on is
//! re-fetched (the resource cache is bypassed on purpose), its subtitle is
//! extracted, and the record is updated in place. The dataset is saved every
//! `saveEveryBatches` batches and once more at the end, so an interrupted run
//! can be resumed with a later start index.

use futures::future::join_all;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::CrawlConfig;
use crate::error::StorageError;
use crate::fetch::{PageSource, Throttle};
use crate::walkers::article;

/// Totals of one enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    pub total: usize,
    pub start_index: usize,
    pub visited: usize,
    pub updated: usize,
    /// Page fetched but no subtitle region on it.
    pub not_found: usize,
    pub failed: usize,
}

enum Outcome {
    Found(String),
    NotFound,
    Failed,
}

pub struct Enricher<S> {
    source: S,
    store: CheckpointStore,
    batch_size: usize,
    save_every_batches: usize,
    batch_pause: Throttle,
}

impl<S: PageSource> Enricher<S> {
    pub fn new(source: S, config: &CrawlConfig) -> Self {
        Self {
            source,
            store: CheckpointStore::new(&config.data_dir),
            batch_size: config.enrichment.batch_size.max(1),
            save_every_batches: config.enrichment.save_every_batches.max(1),
            batch_pause: config.enrichment.batch_pause(),
        }
    }

    /// Fetch and fill in the subtitle of every record from `start_index` on.
    ///
    /// # Arguments
    ///
    /// * `start_index` - First dataset index to visit; records below it are left as they are
    ///
    /// # Returns
    ///
    /// An [`EnrichSummary`] counting updated, subtitle-less and failed records.
    ///
    /// # Errors
    ///
    /// Only a dataset that cannot be read, or a failed final save.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, start_index: usize) -> Result<EnrichSummary, StorageError> {
        let t0 = Instant::now();
        let mut records = self.store.load_dataset().await?;
        let mut summary = EnrichSummary {
            total: records.len(),
            start_index,
            ..EnrichSummary::default()
        };

        if start_index >= records.len() {
            warn!(total = records.len(), "Nothing to enrich at this start index");
            return Ok(summary);
        }
        let batch_count = (records.len() - start_index).div_ceil(self.batch_size);
        info!(total = records.len(), batches = batch_count, "Starting subtitle enrichment");

        for (n, batch_start) in (start_index..records.len()).step_by(self.batch_size).enumerate() {
            let batch_no = n + 1;
            let batch_end = (batch_start + self.batch_size).min(records.len());
            let jobs: Vec<(usize, String)> = (batch_start..batch_end).map(|i| (i, records[i].url.clone())).collect();

            let outcomes = join_all(jobs.iter().map(|(i, url)| self.subtitle_of(*i, url))).await;

            for ((i, _), outcome) in jobs.iter().zip(outcomes) {
                summary.visited += 1;
                match outcome {
                    Outcome::Found(subtitle) => {
                        info!(index = i, title = %records[*i].title, %subtitle, "Subtitle updated");
                        records[*i].subtitle = Some(subtitle);
                        summary.updated += 1;
                    }
                    Outcome::NotFound => summary.not_found += 1,
                    Outcome::Failed => summary.failed += 1,
                }
            }
            info!(
                batch = batch_no,
                of = batch_count,
                processed = batch_end,
                updated = summary.updated,
                "Enrichment batch done"
            );

            if is_save_point(batch_no, self.save_every_batches) {
                match self.store.save_dataset(&records).await {
                    Ok(()) => info!(updated = summary.updated, "Intermediate save"),
                    Err(e) => error!(error = %e, "Intermediate save failed; continuing"),
                }
            }
            if batch_no < batch_count {
                self.batch_pause.pause().await;
            }
        }

        self.store.save_dataset(&records).await?;
        let elapsed = t0.elapsed();
        info!(
            ?elapsed,
            updated = summary.updated,
            not_found = summary.not_found,
            failed = summary.failed,
            "Enrichment complete"
        );
        Ok(summary)
    }

    async fn subtitle_of(&self, index: usize, url: &str) -> Outcome {
        match self.source.fetch(url).await {
            Ok(html) => match article::subtitle(&html) {
                Some(subtitle) => Outcome::Found(subtitle),
                None => {
                    warn!(index, %url, "No subtitle on page");
                    Outcome::NotFound
                }
            },
            Err(e) => {
                error!(index, %url, error = %e, "Subtitle fetch failed; record left unchanged");
                Outcome::Failed
            }
        }
    }
}

/// Batches are numbered from 1; every `every`-th one triggers a save.
fn is_save_point(batch_no: usize, every: usize) -> bool {
    batch_no % every == 0
}
