//! Runtime configuration: defaults, optional YAML file, CLI overrides.
//!
//! Precedence is CLI flag > config file > built-in default. The file uses
//! camelCase keys, so the recognised tunables read as `batchSize`,
//! `issueBatchSize`, `delayMs`, `retryCount` and `enrichmentStartIndex`:
//!
//! ```yaml
//! dataDir: ./data
//! batchSize: 3
//! issueBatchSize: 2
//! delayMs: 500
//! retryCount: 3
//! enrichmentStartIndex: 68
//! enrichment:
//!   batchSize: 10
//!   saveEveryBatches: 5
//! markers:
//!   reader: 독자
//!   question: 질문
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::error::ConfigError;
use crate::fetch::{Backoff, DEFAULT_USER_AGENT, Throttle};

/// Locale-specific label fragments the walkers match on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Markers {
    /// Text immediately before the four digit year on root index cards.
    pub year_prefix: String,
    /// Label of the research edition card on a 2008+ year page.
    pub research_edition: String,
    /// Label fragment of the 15th-day issues on a pre-2008 year page.
    pub fifteenth_day: String,
    pub reader: String,
    pub question: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            year_prefix: "파수대—".to_string(),
            research_edition: "연구용".to_string(),
            fifteenth_day: "15일".to_string(),
            reader: "독자".to_string(),
            question: "질문".to_string(),
        }
    }
}

/// Tunables of the subtitle enrichment pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnrichmentConfig {
    /// Records fetched concurrently per batch.
    pub batch_size: usize,
    /// Base pause before each article request.
    pub delay_ms: u64,
    /// Random extra pause on top of `delay_ms`.
    pub jitter_ms: u64,
    /// Total attempts per article.
    pub retry_count: usize,
    /// Backoff grows by this much with every failed attempt.
    pub retry_step_ms: u64,
    /// Persist the dataset after every this many batches.
    pub save_every_batches: usize,
    pub batch_pause_min_ms: u64,
    pub batch_pause_max_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            delay_ms: 200,
            jitter_ms: 500,
            retry_count: 4,
            retry_step_ms: 2000,
            save_every_batches: 5,
            batch_pause_min_ms: 1000,
            batch_pause_max_ms: 3000,
        }
    }
}

impl EnrichmentConfig {
    pub fn request_throttle(&self) -> Throttle {
        Throttle::jittered(Duration::from_millis(self.delay_ms), Duration::from_millis(self.jitter_ms))
    }

    pub fn batch_pause(&self) -> Throttle {
        Throttle::between(
            Duration::from_millis(self.batch_pause_min_ms),
            Duration::from_millis(self.batch_pause_max_ms),
        )
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::Linear {
            step: Duration::from_millis(self.retry_step_ms),
        }
    }
}

/// Everything the crawl and the enrichment pass need to know.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrawlConfig {
    /// Root of the cache, checkpoint and dataset files.
    pub data_dir: PathBuf,
    /// Origin that relative links on listing pages resolve against.
    pub base_url: String,
    /// Root index listing every year.
    pub start_url: String,
    /// Years processed concurrently per checkpointed batch.
    pub batch_size: usize,
    /// Issues of one year in flight at once.
    pub issue_batch_size: usize,
    /// Pause before every crawl request; retries back off by twice this.
    pub delay_ms: u64,
    /// Total attempts per crawl request.
    pub retry_count: usize,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// First dataset index the enrichment pass visits.
    pub enrichment_start_index: usize,
    pub enrichment: EnrichmentConfig,
    pub markers: Markers,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            base_url: "https://wol.jw.org".to_string(),
            start_url: "https://wol.jw.org/ko/wol/lv/r8/lp-ko/0/20383".to_string(),
            batch_size: 3,
            issue_batch_size: 2,
            delay_ms: 500,
            retry_count: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 15,
            enrichment_start_index: 0,
            enrichment: EnrichmentConfig::default(),
            markers: Markers::default(),
        }
    }
}

impl CrawlConfig {
    /// Read a YAML config file. Keys that are absent keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Defaults, then the `--config` file if given, then CLI flags; validated.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.data_dir {
            self.data_dir = dir.clone();
        }
        match &cli.command {
            Command::Crawl(args) => {
                if let Some(n) = args.batch_size {
                    self.batch_size = n;
                }
                if let Some(n) = args.issue_batch_size {
                    self.issue_batch_size = n;
                }
                if let Some(ms) = args.delay_ms {
                    self.delay_ms = ms;
                }
                if let Some(n) = args.retry_count {
                    self.retry_count = n;
                }
            }
            Command::Enrich(args) => {
                if let Some(i) = args.start_index {
                    self.enrichment_start_index = i;
                }
                if let Some(n) = args.batch_size {
                    self.enrichment.batch_size = n;
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("batchSize", self.batch_size),
            ("issueBatchSize", self.issue_batch_size),
            ("retryCount", self.retry_count),
            ("enrichment.batchSize", self.enrichment.batch_size),
            ("enrichment.retryCount", self.enrichment.retry_count),
            ("enrichment.saveEveryBatches", self.enrichment.save_every_batches),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("requestTimeoutSecs must be at least 1".to_string()));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::Invalid(format!("baseUrl '{}' is not a URL", self.base_url)));
        }
        Ok(())
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn request_throttle(&self) -> Throttle {
        Throttle::fixed(Duration::from_millis(self.delay_ms))
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::Constant(Duration::from_millis(self.delay_ms.saturating_mul(2)))
    }
}
