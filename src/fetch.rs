//! HTTP page fetching with retry/backoff and request pacing.
//!
//! This module is the only place that talks to the network. It does no
//! caching and knows nothing about the archive's structure.
//!
//! # Architecture
//!
//! The module uses a trait-based design so policies stack as decorators:
//! - [`PageSource`]: core trait, one GET returning the response body
//! - [`HttpFetcher`]: `reqwest` implementation with a configurable request [`Identity`]
//! - [`RetryFetch`]: decorator that retries any `PageSource` with a [`Backoff`] schedule
//! - [`Throttled`]: decorator that waits on an injected [`Throttle`] before every request
//!
//! The crawl uses `Throttled<RetryFetch<HttpFetcher>>` with a fixed identity,
//! 3 attempts and a constant backoff. The enrichment pass uses a rotating
//! identity, 4 attempts and a linearly growing backoff.

use rand::{Rng, rng};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, REFERER, USER_AGENT};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::error::FetchError;

/// Fixed user agent for the primary crawl.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36";

const ROTATING_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPad; CPU OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
];

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const KOREAN_FIRST_LANGUAGES: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

/// Something that can turn a URL into a response body.
///
/// Implementors must surface every failure (network, timeout, non-2xx) as an
/// error; swallowing is left to the caller.
pub trait PageSource {
    /// Perform one GET of `url` and return the body as text.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

impl<T: PageSource + ?Sized> PageSource for &T {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }
}

/// Headers presented to the upstream server.
#[derive(Debug, Clone)]
pub enum Identity {
    /// The same user agent on every request.
    Fixed { user_agent: String },
    /// A random user agent from a pool per request, with the target's origin
    /// as referer and browser-like accept/no-cache headers.
    Rotating,
}

/// `reqwest` backed [`PageSource`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    identity: Identity,
}

impl HttpFetcher {
    /// Build a client with the given identity and per-request timeout.
    pub fn new(identity: Identity, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, identity })
    }
}

impl PageSource for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let request = match &self.identity {
            Identity::Fixed { user_agent } => self.client.get(url).header(USER_AGENT, user_agent.as_str()),
            Identity::Rotating => self
                .client
                .get(url)
                .header(USER_AGENT, random_user_agent())
                .header(ACCEPT, BROWSER_ACCEPT)
                .header(ACCEPT_LANGUAGE, KOREAN_FIRST_LANGUAGES)
                .header(REFERER, origin_of(url)?)
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache")
                .header("DNT", "1"),
        };

        let t0 = Instant::now();
        let response = request.send().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Fetched page"
        );
        Ok(body)
    }
}

fn random_user_agent() -> &'static str {
    let i = rng().random_range(0..ROTATING_USER_AGENTS.len());
    ROTATING_USER_AGENTS[i]
}

/// `scheme://host/` of `url`, used as the referer.
fn origin_of(url: &str) -> Result<String, FetchError> {
    let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    Ok(format!("{}://{}/", parsed.scheme(), parsed.host_str().unwrap_or_default()))
}

/// Delay schedule between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure.
    Constant(Duration),
    /// `step * n` after the n-th failure.
    Linear { step: Duration },
}

impl Backoff {
    /// Delay to wait after the `failures`-th failed attempt (1-based).
    pub fn delay(&self, failures: usize) -> Duration {
        match *self {
            Backoff::Constant(d) => d,
            Backoff::Linear { step } => step.saturating_mul(failures as u32),
        }
    }
}

/// Wrapper that retries any [`PageSource`] up to a fixed number of attempts.
///
/// Exhausting the attempts returns the last error unchanged.
pub struct RetryFetch<T> {
    inner: T,
    /// Total attempts, first try included.
    max_attempts: usize,
    backoff: Backoff,
}

impl<T: PageSource> RetryFetch<T> {
    /// Create a retry wrapper around an existing [`PageSource`].
    ///
    /// # Arguments
    ///
    /// * `inner` - The source that performs each attempt
    /// * `max_attempts` - Total attempts including the first; `0` is treated as `1`
    /// * `backoff` - Delay schedule applied after each failed attempt
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new(Identity::Rotating, Duration::from_secs(15))?;
    /// let source = RetryFetch::new(http, 4, Backoff::Linear { step: Duration::from_secs(2) });
    /// ```
    pub fn new(inner: T, max_attempts: usize, backoff: Backoff) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl<T: PageSource> PageSource for RetryFetch<T> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt >= self.max_attempts => {
                    error!(
                        attempt,
                        max = self.max_attempts,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        error = %e,
                        %url,
                        "fetch exhausted retries"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        ?delay,
                        error = %e,
                        %url,
                        "fetch attempt failed; retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Politeness delay: `base` plus a uniformly random `0..=jitter`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Throttle {
    base: Duration,
    jitter: Duration,
}

impl Throttle {
    pub fn fixed(base: Duration) -> Self {
        Self {
            base,
            jitter: Duration::ZERO,
        }
    }

    pub fn jittered(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    /// Uniform pause in `min..=max`; `max` below `min` is treated as `min`.
    pub fn between(min: Duration, max: Duration) -> Self {
        Self::jittered(min, max.saturating_sub(min))
    }

    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.base;
        }
        self.base + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

/// Waits on a [`Throttle`] before handing each request to the inner source.
#[derive(Debug)]
pub struct Throttled<T> {
    inner: T,
    throttle: Throttle,
}

impl<T: PageSource> Throttled<T> {
    pub fn new(inner: T, throttle: Throttle) -> Self {
        Self { inner, throttle }
    }
}

impl<T: PageSource> PageSource for Throttled<T> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.throttle.pause().await;
        debug!(%url, "Requesting");
        self.inner.fetch(url).await
    }
}
