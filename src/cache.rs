//! On-disk memoization of structured crawl results.
//!
//! Every entry is one pretty-printed JSON file `<cache_dir>/<key>.json` whose
//! content is exactly what the corresponding walker or stage produced. An
//! entry's presence means "this fetch/extraction is complete and trusted":
//! entries never expire, because published archive pages do not change. The
//! cache therefore doubles as the fine-grained resume mechanism below the
//! per-batch checkpoint.
//!
//! Raw markup is never stored here, only the parsed result.
//!
//! # Keys
//!
//! | Key | Payload |
//! |-----|---------|
//! | `years` | `Vec<YearEntry>` |
//! | `research-<seg>` | research edition URL of a year page |
//! | `monthly-<seg>` | `Vec<IssueEntry>` of a research edition page |
//! | `15thday-<seg>` | `Vec<IssueEntry>` of a pre-2008 year page |
//! | `articles-<seg>` | `Vec<ArticleEntry>` of an issue page |
//! | `question-<seg>` | `QuestionContent` of an article page |
//! | `issue-<year>-<title>` | `Vec<QuestionRecord>` of a whole issue |
//! | `year-<year>` | `Vec<QuestionRecord>` of a whole year |
//!
//! `<seg>` is the last path segment of the page URL; `<title>` is the issue
//! title with whitespace runs replaced by `-`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{StorageError, UnitError};
use crate::utils::{dash_whitespace, last_path_segment, read_json, write_json_atomic};

/// Logical name of a cached resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Years,
    ResearchEdition { year_url: String },
    MonthlyIssues { research_url: String },
    FifteenthDayIssues { year_url: String },
    Articles { issue_url: String },
    Question { article_url: String },
    Issue { year: String, title: String },
    Year { year: String },
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Years => write!(f, "years"),
            CacheKey::ResearchEdition { year_url } => write!(f, "research-{}", last_path_segment(year_url)),
            CacheKey::MonthlyIssues { research_url } => write!(f, "monthly-{}", last_path_segment(research_url)),
            CacheKey::FifteenthDayIssues { year_url } => write!(f, "15thday-{}", last_path_segment(year_url)),
            CacheKey::Articles { issue_url } => write!(f, "articles-{}", last_path_segment(issue_url)),
            CacheKey::Question { article_url } => write!(f, "question-{}", last_path_segment(article_url)),
            CacheKey::Issue { year, title } => write!(f, "issue-{}-{}", year, dash_whitespace(title)),
            CacheKey::Year { year } => write!(f, "year-{}", year),
        }
    }
}

impl CacheKey {
    /// File name for this key; path separators inside titles are neutralised.
    fn file_name(&self) -> String {
        let stem: String = self
            .to_string()
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
            .collect();
        format!("{stem}.json")
    }
}

/// Directory-backed resource cache.
#[derive(Debug, Clone)]
pub struct ResourceCache {
    dir: PathBuf,
}

impl ResourceCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Stored payload for `key`, or `None` on a miss. Never touches the network.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, StorageError> {
        let hit = read_json(&self.path_for(key)).await?;
        if hit.is_some() {
            info!(key = %key, "Cache hit");
        }
        Ok(hit)
    }

    /// Commit `value` under `key`. The entry becomes visible only once fully written.
    pub async fn put<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;
        write_json_atomic(&self.path_for(key), value).await?;
        debug!(key = %key, "Cached");
        Ok(())
    }

    /// Return the cached payload for `key`, or run `produce`, persist its
    /// result and then return it.
    ///
    /// # Arguments
    ///
    /// * `key` - Logical name of the resource
    /// * `produce` - Fetch-and-walk step, only invoked on a miss
    ///
    /// # Returns
    ///
    /// The stored payload on a hit, otherwise the freshly produced one. A
    /// failing `produce` (or a failed write) is returned as an error and
    /// leaves no entry behind.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let issues: Vec<IssueEntry> = cache
    ///     .get_or_fetch(&CacheKey::MonthlyIssues { research_url: url.clone() }, || async move {
    ///         let html = source.fetch(&url).await?;
    ///         Ok(index::monthly_issues(&html, &base))
    ///     })
    ///     .await?;
    /// ```
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &CacheKey, produce: F) -> Result<T, UnitError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, UnitError>>,
    {
        if let Some(hit) = self.get(key).await? {
            return Ok(hit);
        }
        let value = produce().await?;
        self.put(key, &value).await?;
        Ok(value)
    }
}
