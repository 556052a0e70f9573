//! The crawl driver: year list → issues → articles → question records.
//!
//! # Flow
//!
//! 1. Resolve the year list from the root index (cached under `years`).
//! 2. Resume at the checkpointed year index with the saved dataset as the
//!    initial accumulation.
//! 3. Process years in batches of `batch_size` concurrently. Per year:
//!    - 2008 and later: locate the research edition, list its monthly issues
//!    - before 2008: list the 15th-day issues straight from the year page
//! 4. Process a year's issues with at most `issue_batch_size` in flight. Per
//!    issue: list articles, keep reader-question titles, extract each one.
//! 5. After each batch of years, append the results in year order, then save
//!    the dataset and the progress record.
//!
//! # Failure isolation
//!
//! A failing year, issue or article is logged and contributes nothing; its
//! siblings carry on. Issue and year results are only committed to the cache
//! when every child unit succeeded, so a partial result is retried on the
//! next pass over that unit instead of being frozen.
//!
//! # Ownership
//!
//! Workers only return records. The accumulated dataset lives in [`Crawler::run`]
//! and is appended to and persisted between batches, never from inside a
//! concurrent task.

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::cache::{CacheKey, ResourceCache};
use crate::checkpoint::CheckpointStore;
use crate::config::{CrawlConfig, Markers};
use crate::error::{ConfigError, StorageError, UnitError};
use crate::fetch::PageSource;
use crate::models::{ArticleEntry, Era, IssueEntry, QuestionContent, QuestionRecord, YearEntry};
use crate::utils::truncate_for_log;
use crate::walkers::{article, index};

/// Totals of one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub years_total: usize,
    /// Index the run started at (non-zero when resuming).
    pub resumed_at: usize,
    pub years_failed: usize,
    pub records_added: usize,
    pub records_total: usize,
}

/// Records of a year or issue, and whether every child unit succeeded.
#[derive(Debug, Default)]
struct Harvest {
    records: Vec<QuestionRecord>,
    complete: bool,
}

pub struct Crawler<S> {
    source: S,
    cache: ResourceCache,
    store: CheckpointStore,
    base: Url,
    start_url: String,
    batch_size: usize,
    issue_batch_size: usize,
    markers: Markers,
}

impl<S: PageSource> Crawler<S> {
    pub fn new(source: S, config: &CrawlConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::Invalid(format!("baseUrl '{}': {e}", config.base_url)))?;
        Ok(Self {
            source,
            cache: ResourceCache::new(config.cache_dir()),
            store: CheckpointStore::new(&config.data_dir),
            base,
            start_url: config.start_url.clone(),
            batch_size: config.batch_size.max(1),
            issue_batch_size: config.issue_batch_size.max(1),
            markers: config.markers.clone(),
        })
    }

    /// Run the crawl to completion, resuming from the last checkpoint.
    ///
    /// Years are processed in batches of `batch_size`; after each batch the
    /// dataset and then `progress.json` are written.
    ///
    /// # Returns
    ///
    /// A [`CrawlSummary`] with year and record totals. Unit failures are
    /// logged and counted, never returned.
    ///
    /// # Errors
    ///
    /// Only an unreadable `progress.json` or `all-questions.json` at startup,
    /// or a failed final dataset save.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<CrawlSummary, StorageError> {
        let t0 = Instant::now();
        let mut records = self.store.load_dataset().await?;
        let mut seen: HashSet<RecordIdentity> = records.iter().map(RecordIdentity::of).collect();
        if !records.is_empty() {
            info!(count = records.len(), "Loaded existing dataset");
        }

        let mut summary = CrawlSummary::default();
        let years = match self.years().await {
            Ok(years) => years,
            Err(e) => {
                error!(url = %self.start_url, error = %e, "Could not resolve year list");
                self.store.save_dataset(&records).await?;
                summary.records_total = records.len();
                return Ok(summary);
            }
        };
        info!(count = years.len(), "Year list resolved");
        if let Err(e) = self.store.save_years(&years).await {
            warn!(error = %e, "Could not save year list");
        }

        let start = match self.store.load_progress().await? {
            Some(progress) => {
                info!(
                    index = progress.last_processed_year_index,
                    count = progress.count,
                    at = %progress.timestamp,
                    "Resuming from checkpoint"
                );
                progress.last_processed_year_index.min(years.len())
            }
            None => 0,
        };
        summary.years_total = years.len();
        summary.resumed_at = start;

        for batch_start in (start..years.len()).step_by(self.batch_size) {
            let batch_end = (batch_start + self.batch_size).min(years.len());
            let batch = &years[batch_start..batch_end];
            info!(
                from = batch_start,
                to = batch_end - 1,
                total = years.len(),
                "Processing year batch"
            );

            let results = join_all(batch.iter().map(|entry| self.process_year(entry))).await;

            for (entry, result) in batch.iter().zip(results) {
                match result {
                    Ok(year_records) => {
                        summary.records_added += append_new(&mut records, &mut seen, year_records);
                    }
                    Err(e) => {
                        summary.years_failed += 1;
                        error!(year = %entry.year, url = ?entry.source_url, error = %e, "Year failed; continuing");
                    }
                }
            }

            if let Err(e) = self.checkpoint(&records, batch_end).await {
                error!(error = %e, next_index = batch_end, "Checkpoint failed; continuing");
            }
            info!(count = records.len(), "Questions collected so far");
        }

        self.store.save_dataset(&records).await?;
        summary.records_total = records.len();

        let elapsed = t0.elapsed();
        info!(
            ?elapsed,
            total = summary.records_total,
            added = summary.records_added,
            failed_years = summary.years_failed,
            "Crawl complete"
        );
        Ok(summary)
    }

    /// Dataset first, then the progress record: a crash in between replays
    /// the batch, and the replay is deduplicated on append.
    async fn checkpoint(&self, records: &[QuestionRecord], next_index: usize) -> Result<(), StorageError> {
        self.store.save_dataset(records).await?;
        self.store.save_progress(records.len(), next_index).await?;
        debug!(next_index, count = records.len(), "Checkpoint saved");
        Ok(())
    }

    async fn page(&self, url: &str) -> Result<String, UnitError> {
        info!(%url, "Fetching");
        Ok(self.source.fetch(url).await?)
    }

    async fn years(&self) -> Result<Vec<YearEntry>, UnitError> {
        self.cache
            .get_or_fetch(&CacheKey::Years, || async move {
                let html = self.page(&self.start_url).await?;
                Ok(index::years(&html, &self.base, &self.markers))
            })
            .await
    }

    #[instrument(level = "info", skip_all, fields(year = %entry.year))]
    async fn process_year(&self, entry: &YearEntry) -> Result<Vec<QuestionRecord>, UnitError> {
        let Some(year_url) = entry.source_url.as_deref() else {
            warn!("Year has no page link; skipping");
            return Ok(Vec::new());
        };

        let key = CacheKey::Year {
            year: entry.year.clone(),
        };
        if let Some(records) = self.cache.get(&key).await? {
            return Ok(records);
        }

        let year: u16 = entry
            .year
            .parse()
            .map_err(|_| UnitError::InvalidYear(entry.year.clone()))?;
        let issues = self.issues_of(year, year_url).await?;
        info!(issues = issues.len(), "Listed issues");

        let harvest = self.harvest_issues(&entry.year, &issues).await;
        if harvest.complete {
            self.commit(&key, &harvest.records).await;
        } else {
            warn!("Some issues failed; year result not cached");
        }
        info!(count = harvest.records.len(), "Year done");
        Ok(harvest.records)
    }

    /// Issue list of a year, following the hierarchy shape of its era.
    async fn issues_of(&self, year: u16, year_url: &str) -> Result<Vec<IssueEntry>, UnitError> {
        match Era::for_year(year) {
            Era::ResearchEdition => {
                let Some(research_url) = self.research_edition_url(year_url).await? else {
                    warn!(%year_url, "No research edition on year page");
                    return Ok(Vec::new());
                };
                let key = CacheKey::MonthlyIssues {
                    research_url: research_url.clone(),
                };
                self.cache
                    .get_or_fetch(&key, || async move {
                        let html = self.page(&research_url).await?;
                        Ok(index::monthly_issues(&html, &self.base))
                    })
                    .await
            }
            Era::FifteenthDay => {
                let key = CacheKey::FifteenthDayIssues {
                    year_url: year_url.to_string(),
                };
                self.cache
                    .get_or_fetch(&key, || async move {
                        let html = self.page(year_url).await?;
                        Ok(index::fifteenth_day_issues(&html, &self.base, &self.markers))
                    })
                    .await
            }
        }
    }

    /// Only a located URL is cached; an absent research edition is looked up again next time.
    async fn research_edition_url(&self, year_url: &str) -> Result<Option<String>, UnitError> {
        let key = CacheKey::ResearchEdition {
            year_url: year_url.to_string(),
        };
        if let Some(url) = self.cache.get::<String>(&key).await? {
            return Ok(Some(url));
        }
        let html = self.page(year_url).await?;
        let found = index::research_edition_url(&html, &self.base, &self.markers);
        if let Some(url) = &found {
            self.cache.put(&key, url).await?;
        }
        Ok(found)
    }

    /// Issues with bounded concurrency; results come back in issue order.
    async fn harvest_issues(&self, year: &str, issues: &[IssueEntry]) -> Harvest {
        let results: Vec<Result<Harvest, UnitError>> = stream::iter(issues)
            .map(|issue| self.process_issue(year, issue))
            .buffered(self.issue_batch_size)
            .collect()
            .await;

        let mut harvest = Harvest {
            records: Vec::new(),
            complete: true,
        };
        for (issue, result) in issues.iter().zip(results) {
            match result {
                Ok(h) => {
                    harvest.complete &= h.complete;
                    harvest.records.extend(h.records);
                }
                Err(e) => {
                    harvest.complete = false;
                    error!(issue = %issue.title, url = %issue.source_url, error = %e, "Issue failed; continuing");
                }
            }
        }
        harvest
    }

    #[instrument(level = "info", skip_all, fields(issue = %issue.title))]
    async fn process_issue(&self, year: &str, issue: &IssueEntry) -> Result<Harvest, UnitError> {
        let key = CacheKey::Issue {
            year: year.to_string(),
            title: issue.title.clone(),
        };
        if let Some(records) = self.cache.get(&key).await? {
            return Ok(Harvest {
                records,
                complete: true,
            });
        }

        let articles_key = CacheKey::Articles {
            issue_url: issue.source_url.clone(),
        };
        let articles: Vec<ArticleEntry> = self
            .cache
            .get_or_fetch(&articles_key, || async move {
                let html = self.page(&issue.source_url).await?;
                Ok(index::articles(&html, &self.base))
            })
            .await?;

        let mut harvest = Harvest {
            records: Vec::new(),
            complete: true,
        };
        for candidate in articles
            .iter()
            .filter(|a| index::is_question_article(&a.title, &self.markers))
        {
            info!(title = %candidate.title, "Found question article");
            match self.question_content(candidate).await {
                Ok(content) => {
                    let record = QuestionRecord::new(year, issue, candidate, content);
                    debug!(question = %truncate_for_log(&record.question, 60), "Extracted question");
                    if let Err(e) = self.store.save_record(&record).await {
                        warn!(error = %e, "Could not write individual record file");
                    }
                    harvest.records.push(record);
                }
                Err(e) => {
                    harvest.complete = false;
                    error!(url = %candidate.source_url, error = %e, "Article failed; skipping");
                }
            }
        }

        if harvest.complete {
            self.commit(&key, &harvest.records).await;
        }
        Ok(harvest)
    }

    async fn question_content(&self, candidate: &ArticleEntry) -> Result<QuestionContent, UnitError> {
        let key = CacheKey::Question {
            article_url: candidate.source_url.clone(),
        };
        self.cache
            .get_or_fetch(&key, || async move {
                let html = self.page(&candidate.source_url).await?;
                Ok(article::question_content(&html))
            })
            .await
    }

    /// Cache an aggregate result; failing to do so only costs a re-fetch later.
    async fn commit(&self, key: &CacheKey, records: &[QuestionRecord]) {
        if let Err(e) = self.cache.put(key, records).await {
            warn!(key = %key, error = %e, "Could not cache result");
        }
    }
}

/// What makes two records the same question for the resume replay check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RecordIdentity {
    year: String,
    issue: String,
    url: String,
}

impl RecordIdentity {
    fn of(record: &QuestionRecord) -> Self {
        Self {
            year: record.year.clone(),
            issue: record.issue.clone(),
            url: record.url.clone(),
        }
    }
}

/// Append records not already in the dataset; returns how many were added.
fn append_new(
    records: &mut Vec<QuestionRecord>,
    seen: &mut HashSet<RecordIdentity>,
    incoming: Vec<QuestionRecord>,
) -> usize {
    let before = records.len();
    for record in incoming {
        if seen.insert(RecordIdentity::of(&record)) {
            records.push(record);
        } else {
            debug!(url = %record.url, "Record already in dataset");
        }
    }
    records.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrawlProgress;
    use crate::testing::{BASE, START, SlowSite, archive, article_page, listing_page, record};
    use std::path::Path;
    use std::time::Duration;

    fn test_config(dir: &Path) -> CrawlConfig {
        CrawlConfig {
            data_dir: dir.to_path_buf(),
            base_url: BASE.to_string(),
            start_url: START.to_string(),
            delay_ms: 0,
            ..CrawlConfig::default()
        }
    }

    fn dataset_bytes(dir: &Path) -> Vec<u8> {
        std::fs::read(dir.join("all-questions.json")).unwrap()
    }

    #[tokio::test]
    async fn test_full_crawl_collects_in_discovery_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = archive();
        let crawler = Crawler::new(&site, &test_config(dir.path())).unwrap();

        let summary = crawler.run().await.unwrap();

        assert_eq!(summary.years_total, 3);
        assert_eq!(summary.records_total, 3);
        assert_eq!(summary.years_failed, 0);

        let records = CheckpointStore::new(dir.path()).load_dataset().await.unwrap();
        let issues: Vec<_> = records.iter().map(|r| (r.year.as_str(), r.issue.as_str())).collect();
        assert_eq!(
            issues,
            vec![
                ("2010", "2010년 1월 15일호"),
                ("2010", "2010년 2월 15일호"),
                ("2005", "2005년 1월 15일호"),
            ]
        );
        assert_eq!(records[0].question, "부활은 언제입니까?");
        assert_eq!(records[0].answer, "성서는 말합니다. 결론.");
        assert_eq!(records[1].question, "헌금에 관하여 무엇이 적절한가?");
        assert_eq!(records[1].answer, "원칙.");
        assert_eq!(records[2].url, format!("{BASE}/a/2005-0115-q"));
        assert!(records.iter().all(|r| r.subtitle.is_none()));

        let progress = CheckpointStore::new(dir.path()).load_progress().await.unwrap().unwrap();
        assert_eq!(progress.count, 3);
        assert_eq!(progress.last_processed_year_index, 3);
        assert!(dir.path().join("years.json").exists());
        assert!(
            dir.path()
                .join("question-2005-2005년-1월-15일호-독자로부터의-질문.json")
                .exists()
        );
    }

    #[tokio::test]
    async fn test_branch_selection_by_era() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = archive();
        Crawler::new(&site, &test_config(dir.path())).unwrap().run().await.unwrap();

        // 2010: year page -> research edition -> monthly issues
        assert!(site.requested("/y/2010"));
        assert!(site.requested("/r/2010"));
        assert!(!site.requested("/p/2010"));
        let requests = site.requests();
        let year_page = requests.iter().position(|u| u.ends_with("/y/2010")).unwrap();
        let research = requests.iter().position(|u| u.ends_with("/r/2010")).unwrap();
        assert!(year_page < research);

        // 2005: issues straight from the year page, 15th-day only
        assert!(site.requested("/y/2005"));
        assert!(site.requested("/i/2005-0115"));
        assert!(!site.requested("/i/2005-0101"));
        assert!(!requests.iter().any(|u| u.contains("/r/2005")));

        // non-question articles are never fetched
        assert!(!site.requested("/a/2010-01-cover"));
        assert!(!site.requested("/a/2010-02-news"));
    }

    #[tokio::test]
    async fn test_second_run_is_a_full_cache_hit() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = archive();
        let config = test_config(dir.path());

        Crawler::new(&site, &config).unwrap().run().await.unwrap();
        let first = dataset_bytes(dir.path());

        std::fs::remove_file(dir.path().join("progress.json")).unwrap();
        std::fs::remove_file(dir.path().join("all-questions.json")).unwrap();
        site.clear_requests();

        Crawler::new(&site, &config).unwrap().run().await.unwrap();

        assert!(site.requests().is_empty(), "unexpected requests: {:?}", site.requests());
        assert_eq!(dataset_bytes(dir.path()), first);
    }

    #[tokio::test]
    async fn test_rerun_after_completion_changes_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = archive();
        let config = test_config(dir.path());

        Crawler::new(&site, &config).unwrap().run().await.unwrap();
        let first = dataset_bytes(dir.path());
        site.clear_requests();

        let summary = Crawler::new(&site, &config).unwrap().run().await.unwrap();

        assert_eq!(summary.resumed_at, 3);
        assert_eq!(summary.records_added, 0);
        assert!(site.requests().is_empty());
        assert_eq!(dataset_bytes(dir.path()), first);
    }

    #[tokio::test]
    async fn test_resume_skips_checkpointed_years() {
        let reference_dir = tempfile::TempDir::new().unwrap();
        let reference_site = archive();
        Crawler::new(&reference_site, &test_config(reference_dir.path()))
            .unwrap()
            .run()
            .await
            .unwrap();
        let expected = CheckpointStore::new(reference_dir.path()).load_dataset().await.unwrap();

        // Interrupted run: year 0 (2010) done and checkpointed, nothing cached.
        let dir = tempfile::TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());
        let done: Vec<_> = expected.iter().filter(|r| r.year == "2010").cloned().collect();
        store.save_dataset(&done).await.unwrap();
        crate::utils::write_json_atomic(
            &dir.path().join("progress.json"),
            &CrawlProgress {
                count: done.len(),
                last_processed_year_index: 1,
                timestamp: "2025-02-28T00:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();

        let site = archive();
        let config = CrawlConfig {
            batch_size: 1,
            ..test_config(dir.path())
        };
        let summary = Crawler::new(&site, &config).unwrap().run().await.unwrap();

        assert_eq!(summary.resumed_at, 1);
        assert!(!site.requested("/y/2010"));
        assert!(site.requested("/y/2005"));
        assert_eq!(store.load_dataset().await.unwrap(), expected);
        assert_eq!(dataset_bytes(dir.path()), dataset_bytes(reference_dir.path()));
    }

    #[tokio::test]
    async fn test_replayed_batch_is_not_duplicated() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = archive();
        let config = test_config(dir.path());
        Crawler::new(&site, &config).unwrap().run().await.unwrap();
        let first = dataset_bytes(dir.path());

        // Dataset saved but progress lost: the whole crawl replays from index 0.
        std::fs::remove_file(dir.path().join("progress.json")).unwrap();
        let summary = Crawler::new(&site, &config).unwrap().run().await.unwrap();

        assert_eq!(summary.records_added, 0);
        assert_eq!(dataset_bytes(dir.path()), first);
    }

    fn five_issue_year() -> crate::testing::FakeSite {
        let months = ["01", "02", "03", "04", "05"];
        let mut site = crate::testing::FakeSite::new()
            .with_page("/y/2012", listing_page(&[("파수대 (연구용)", Some("/r/2012"))]));
        let issues: Vec<(String, String)> = months
            .iter()
            .map(|m| (format!("2012년 {m}월호"), format!("/i/2012-{m}")))
            .collect();
        let cards: Vec<(&str, Option<&str>)> = issues.iter().map(|(t, u)| (t.as_str(), Some(u.as_str()))).collect();
        site = site.with_page("/r/2012", listing_page(&cards));
        for m in months {
            let article_url = format!("/a/2012-{m}-q");
            let question = format!("질문 {m}?");
            site = site
                .with_page(&format!("/i/2012-{m}"), listing_page(&[("독자의 질문", Some(article_url.as_str()))]))
                .with_page(&article_url, article_page(None, None, &[question.as_str(), "답변."]));
        }
        site
    }

    #[tokio::test]
    async fn test_one_failing_issue_does_not_sink_the_year() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = five_issue_year();
        site.fail("/i/2012-03");
        let crawler = Crawler::new(&site, &test_config(dir.path())).unwrap();
        let entry = YearEntry {
            year: "2012".to_string(),
            source_url: Some(format!("{BASE}/y/2012")),
        };

        let records = crawler.process_year(&entry).await.unwrap();

        let questions: Vec<_> = records.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["질문 01?", "질문 02?", "질문 04?", "질문 05?"]);

        let cache = ResourceCache::new(dir.path().join("cache"));
        let year_hit: Option<Vec<QuestionRecord>> = cache
            .get(&CacheKey::Year {
                year: "2012".to_string(),
            })
            .await
            .unwrap();
        assert!(year_hit.is_none());
        let issue_hit: Option<Vec<QuestionRecord>> = cache
            .get(&CacheKey::Issue {
                year: "2012".to_string(),
                title: "2012년 04월호".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(issue_hit.map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn test_slow_first_issue_keeps_issue_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = SlowSite::new(five_issue_year()).delay("/i/2012-01", Duration::from_millis(80));
        let crawler = Crawler::new(&site, &test_config(dir.path())).unwrap();
        let entry = YearEntry {
            year: "2012".to_string(),
            source_url: Some(format!("{BASE}/y/2012")),
        };

        let records = crawler.process_year(&entry).await.unwrap();

        let order: Vec<_> = records.iter().map(|r| (r.issue.as_str(), r.question.as_str())).collect();
        assert_eq!(
            order,
            vec![
                ("2012년 01월호", "질문 01?"),
                ("2012년 02월호", "질문 02?"),
                ("2012년 03월호", "질문 03?"),
                ("2012년 04월호", "질문 04?"),
                ("2012년 05월호", "질문 05?"),
            ]
        );
        // the second issue really did finish first
        let requests = site.site().requests();
        let first = requests.iter().position(|u| u.ends_with("/i/2012-01")).unwrap();
        let second = requests.iter().position(|u| u.ends_with("/i/2012-02")).unwrap();
        assert!(second < first);
    }

    #[tokio::test]
    async fn test_slow_first_year_keeps_year_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = SlowSite::new(archive()).delay("/y/2010", Duration::from_millis(80));

        Crawler::new(&site, &test_config(dir.path())).unwrap().run().await.unwrap();

        let records = CheckpointStore::new(dir.path()).load_dataset().await.unwrap();
        let years: Vec<_> = records.iter().map(|r| r.year.as_str()).collect();
        assert_eq!(years, vec!["2010", "2010", "2005"]);
        let requests = site.site().requests();
        let slow = requests.iter().position(|u| u.ends_with("/y/2010")).unwrap();
        let fast = requests.iter().position(|u| u.ends_with("/y/2005")).unwrap();
        assert!(fast < slow);
    }

    #[tokio::test]
    async fn test_failed_article_keeps_siblings_and_skips_issue_cache() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = crate::testing::FakeSite::new()
            .with_page(
                "/i/x",
                listing_page(&[("독자의 질문 1", Some("/a/x1")), ("독자의 질문 2", Some("/a/x2"))]),
            )
            .with_page("/a/x2", article_page(None, None, &["둘째?", "답."]));
        site.fail("/a/x1");
        let crawler = Crawler::new(&site, &test_config(dir.path())).unwrap();
        let issue = IssueEntry {
            title: "X호".to_string(),
            source_url: format!("{BASE}/i/x"),
        };

        let harvest = crawler.process_issue("2011", &issue).await.unwrap();

        assert!(!harvest.complete);
        assert_eq!(harvest.records.len(), 1);
        assert_eq!(harvest.records[0].question, "둘째?");
        let cache = ResourceCache::new(dir.path().join("cache"));
        let hit: Option<Vec<QuestionRecord>> = cache
            .get(&CacheKey::Issue {
                year: "2011".to_string(),
                title: "X호".to_string(),
            })
            .await
            .unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_failing_year_does_not_abort_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = archive();
        site.fail("/y/2010");

        let summary = Crawler::new(&site, &test_config(dir.path())).unwrap().run().await.unwrap();

        assert_eq!(summary.years_failed, 1);
        let records = CheckpointStore::new(dir.path()).load_dataset().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].year, "2005");
    }

    #[tokio::test]
    async fn test_unreachable_index_still_saves_dataset() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save_dataset(&[record("2001", "1월 15일호", "kept")]).await.unwrap();
        let site = archive();
        site.fail(START);

        let summary = Crawler::new(&site, &test_config(dir.path())).unwrap().run().await.unwrap();

        assert_eq!(summary.records_total, 1);
        assert_eq!(store.load_dataset().await.unwrap().len(), 1);
        let cache = ResourceCache::new(dir.path().join("cache"));
        let years: Option<Vec<YearEntry>> = cache.get(&CacheKey::Years).await.unwrap();
        assert!(years.is_none());
    }

    #[tokio::test]
    async fn test_missing_research_edition_yields_empty_year() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = crate::testing::FakeSite::new()
            .with_page("/y/2014", listing_page(&[("파수대 (일반용)", Some("/p/2014"))]));
        let crawler = Crawler::new(&site, &test_config(dir.path())).unwrap();
        let entry = YearEntry {
            year: "2014".to_string(),
            source_url: Some(format!("{BASE}/y/2014")),
        };

        let records = crawler.process_year(&entry).await.unwrap();

        assert!(records.is_empty());
        let cache = ResourceCache::new(dir.path().join("cache"));
        let research: Option<String> = cache
            .get(&CacheKey::ResearchEdition {
                year_url: format!("{BASE}/y/2014"),
            })
            .await
            .unwrap();
        assert!(research.is_none());
    }

    #[tokio::test]
    async fn test_invalid_year_label_is_a_unit_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let site = crate::testing::FakeSite::new();
        let crawler = Crawler::new(&site, &test_config(dir.path())).unwrap();
        let entry = YearEntry {
            year: "20a0".to_string(),
            source_url: Some(format!("{BASE}/y/20a0")),
        };
        assert!(matches!(
            crawler.process_year(&entry).await,
            Err(UnitError::InvalidYear(_))
        ));
        assert!(site.requests().is_empty());
    }

    #[test]
    fn test_append_new_skips_known_records() {
        let mut records = vec![record("2010", "1월호", "a")];
        let mut seen: HashSet<_> = records.iter().map(RecordIdentity::of).collect();
        let added = append_new(
            &mut records,
            &mut seen,
            vec![record("2010", "1월호", "a"), record("2010", "1월호", "b")],
        );
        assert_eq!(added, 1);
        assert_eq!(records.len(), 2);
        assert!(records[1].url.ends_with("/b"));
    }
}
