//! Utility functions for string shaping, timestamps and JSON file persistence.
//!
//! This module provides helper functions used throughout the application:
//! - Slug and key fragments derived from titles and URLs
//! - String truncation for log previews
//! - Atomic pretty-JSON writes and optional JSON reads
//! - File system validation for the data directory

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fs as stdfs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::StorageError;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Replace every run of whitespace with a single `-`.
///
/// Used to build cache keys and per-record file names from issue and article
/// titles.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(dash_whitespace("2015년  1월 15일호"), "2015년-1월-15일호");
/// ```
pub fn dash_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s, "-").into_owned()
}

/// The final `/`-separated segment of a URL, used to key per-page cache entries.
pub fn last_path_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped characters appended. Counting is by `char`, so Korean text is
/// never split inside a code point.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Current time as RFC 3339 UTC with millisecond precision, e.g. `2025-02-28T09:15:02.123Z`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize `value` as 2-space pretty JSON and commit it to `path`.
///
/// The bytes go to a sibling `.tmp` file first and are then renamed over the
/// target, so a reader never observes a partially written file.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = tmp_path(path);
    fs::write(&tmp, &json).await.map_err(|source| StorageError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).await.map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = json.len(), "Wrote JSON file");
    Ok(())
}

/// Read and deserialize `path`, returning `Ok(None)` when the file does not exist.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Data directory is writable");
    Ok(())
}
