//! Error types for fetching, persistence, configuration and per-unit crawl work.
//!
//! Walkers never produce errors: a missing element on a page is an empty
//! result, not a failure. Everything that touches the network or the disk
//! returns one of the types below, and the crawl driver converts a failed
//! unit (year, issue, article, enrichment record) into zero results after
//! logging it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A single HTTP GET that did not produce a usable body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Reading or writing a JSON file under the data directory failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why one unit of crawl work produced nothing.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("year label '{0}' is not a four digit year")]
    InvalidYear(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
