//! Cached HTTP GET with per-host throttling.

use super::cache::{Cache, CachedPayload};
use super::resilient_http::{REQUEST_TIMEOUT, resilient_get};
use super::throttler::HostThrottles;
use chrono::Utc;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::Arc;

const LOG_TARGET: &str = "   fetcher";

/// Text stored in the cache in place of a resource that does not exist.
pub const MISSING_RESOURCE: &str = "(None)";

/// Why a fetch failed.
#[derive(Debug)]
pub enum FetchError {
    /// The server answered with a non-success status.
    Http { status: u16, url: String },

    /// The body could not be decoded as JSON.
    Parse { url: String, source: serde_json::Error },

    /// The request never produced a response, even after retrying.
    Transport { url: String, source: ohno::AppError },
}

impl FetchError {
    /// The HTTP status, when the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Parse { .. } | Self::Transport { .. } => None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Http { url, .. } | Self::Parse { url, .. } | Self::Transport { url, .. } => url,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status, url } => write!(f, "HTTP {status} from '{url}'"),
            Self::Parse { url, source } => write!(f, "invalid JSON from '{url}': {source}"),
            Self::Transport { url, source } => write!(f, "could not reach '{url}': {source:#}"),
        }
    }
}

impl core::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Http { .. } | Self::Transport { .. } => None,
            Self::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadKind {
    Json,
    Text,
}

/// Fetches remote resources through the on-disk cache.
///
/// A cache hit returns immediately. A miss issues a GET under the target host's
/// throttler, retrying transient failures, stores the payload, then keeps the host's
/// slot for the configured delay so consecutive requests to one host are spaced out.
#[derive(Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    cache: Cache,
    throttles: HostThrottles,
    delay_after_miss: Option<Duration>,
    requests_issued: Arc<AtomicU64>,
}

impl Fetcher {
    /// Create a fetcher with a default HTTP client.
    pub fn new(cache: Cache, delay_after_miss: Option<Duration>, max_concurrent_per_host: usize) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("oss4climate/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self::with_client(client, cache, delay_after_miss, max_concurrent_per_host))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, cache: Cache, delay_after_miss: Option<Duration>, max_concurrent_per_host: usize) -> Self {
        Self {
            client,
            cache,
            throttles: HostThrottles::new(max_concurrent_per_host),
            delay_after_miss,
            requests_issued: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of requests that actually went out to the network.
    #[must_use]
    pub fn requests_issued(&self) -> u64 {
        self.requests_issued.load(Ordering::Relaxed)
    }

    /// Fetch and decode a JSON document.
    pub async fn get_json(&self, url: &str, headers: &HeaderMap) -> Result<Value, FetchError> {
        match self.get(url, headers, PayloadKind::Json).await? {
            CachedPayload::Json(value) => Ok(value),
            CachedPayload::Text(text) => serde_json::from_str(&text).map_err(|source| FetchError::Parse {
                url: url.to_string(),
                source,
            }),
        }
    }

    /// Fetch a text resource. A 404 yields `Ok(None)` and is cached as such.
    pub async fn get_text(&self, url: &str, headers: &HeaderMap) -> Result<Option<String>, FetchError> {
        match self.get(url, headers, PayloadKind::Text).await? {
            CachedPayload::Text(text) if text == MISSING_RESOURCE => Ok(None),
            CachedPayload::Text(text) => Ok(Some(text)),
            CachedPayload::Json(value) => Ok(Some(value.to_string())),
        }
    }

    async fn get(&self, url: &str, headers: &HeaderMap, kind: PayloadKind) -> Result<CachedPayload, FetchError> {
        if let Some(entry) = self.cache.load(url) {
            log::debug!(target: LOG_TARGET, "Cache hit for '{url}'");
            return Ok(entry.payload);
        }

        let throttler = self.throttles.for_host(host_of(url));
        let permit = throttler.acquire().await;

        log::info!(target: LOG_TARGET, "Web GET '{url}'");
        let requests_issued = Arc::clone(&self.requests_issued);
        let host = host_of(url).to_string();
        let paused = Arc::clone(&throttler);

        let resp = resilient_get(
            &self.client,
            url,
            headers,
            move || {
                let _ = requests_issued.fetch_add(1, Ordering::Relaxed);
            },
            move |wait| {
                log::warn!(target: LOG_TARGET, "Rate limited by '{host}', pausing for {}s", wait.as_secs());
                let _ = paused.pause_for(wait);
            },
        )
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        let payload = decode(url, resp, kind).await?;

        if let Err(e) = self.cache.store(url, &payload, Utc::now()) {
            log::warn!(target: LOG_TARGET, "Could not cache '{url}': {e:#}");
        }

        if let Some(delay) = self.delay_after_miss {
            tokio::time::sleep(delay).await;
        }

        drop(permit);
        Ok(payload)
    }
}

async fn decode(url: &str, resp: reqwest::Response, kind: PayloadKind) -> Result<CachedPayload, FetchError> {
    let status = resp.status();

    if kind == PayloadKind::Text && status == StatusCode::NOT_FOUND {
        return Ok(CachedPayload::Text(MISSING_RESOURCE.to_string()));
    }

    if !status.is_success() {
        return Err(FetchError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let transport = |source: reqwest::Error| FetchError::Transport {
        url: url.to_string(),
        source: source.into(),
    };

    match kind {
        PayloadKind::Json => {
            let body = resp.bytes().await.map_err(transport)?;
            serde_json::from_slice(&body)
                .map(CachedPayload::Json)
                .map_err(|source| FetchError::Parse {
                    url: url.to_string(),
                    source,
                })
        }
        PayloadKind::Text => resp.text().await.map(CachedPayload::Text).map_err(transport),
    }
}

/// Returns the host portion of a URL, used to pick a throttler.
fn host_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme.split(['/', '?', '#']).next().unwrap_or(without_scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_of_strips_scheme_and_path() {
        assert_eq!(host_of("https://api.github.com/repos/a/b"), "api.github.com");
        assert_eq!(host_of("http://127.0.0.1:4000/x?y=1"), "127.0.0.1:4000");
        assert_eq!(host_of("https://gitlab.com"), "gitlab.com");
    }

    #[test]
    fn fetch_error_display() {
        let err = FetchError::Http {
            status: 404,
            url: "https://api.github.com/repos/a/b".into(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from 'https://api.github.com/repos/a/b'");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.url(), "https://api.github.com/repos/a/b");
    }
}
