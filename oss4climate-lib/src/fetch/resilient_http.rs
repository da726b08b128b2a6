//! HTTP GET wrapped in retry and timeout middleware.
//!
//! Transport errors, server errors and rate-limit rejections are retried with
//! exponential backoff. A rate-limit rejection waits for as long as the server asked.

use chrono::{DateTime, Utc};
use core::time::Duration;
use layered::{Execute, Service, Stack};
use ohno::app_err;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use seatbelt::retry::{Backoff, Retry};
use seatbelt::timeout::Timeout;
use seatbelt::{RecoveryInfo, ResilienceContext};
use tick::Clock;

const LOG_TARGET: &str = "     retry";

/// Timeout of a single attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum retry attempts (on top of the original request).
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between retries.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on how long a single rate-limit pause may last.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(3600);

/// Pause applied to a 429 response that carries no hint about when to retry.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(5);

/// Decide whether a response is a rate-limit rejection and how long to wait before retrying.
fn rate_limit_wait(status: StatusCode, headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(secs) = header("retry-after").and_then(|v| v.trim().parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs.max(1)).min(MAX_RATE_LIMIT_WAIT));
    }

    let remaining = header("x-ratelimit-remaining").and_then(|v| v.parse::<u64>().ok());
    let reset_at = header("x-ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|ts| DateTime::from_timestamp(ts, 0));

    if remaining == Some(0)
        && let Some(reset_at) = reset_at
    {
        let secs = u64::try_from((reset_at - now).num_seconds()).unwrap_or(0);
        return Some(Duration::from_secs(secs.max(1)).min(MAX_RATE_LIMIT_WAIT));
    }

    // A bare 403 is a permission problem, not a rate limit
    (status == StatusCode::TOO_MANY_REQUESTS).then_some(DEFAULT_RATE_LIMIT_WAIT)
}

/// Classify the outcome of one attempt for retry purposes.
fn recovery_for(result: &crate::Result<reqwest::Response>, on_rate_limit: &(dyn Fn(Duration) + Send + Sync)) -> RecoveryInfo {
    match result {
        Err(_) => RecoveryInfo::retry(),
        Ok(resp) if resp.status().is_server_error() => RecoveryInfo::retry(),
        Ok(resp) => match rate_limit_wait(resp.status(), resp.headers(), Utc::now()) {
            Some(wait) => {
                on_rate_limit(wait);
                RecoveryInfo::retry().delay(wait)
            }
            None => RecoveryInfo::never(),
        },
    }
}

/// Send an HTTP GET with automatic retry and timeout.
///
/// `on_attempt` runs before every attempt that goes out to the network and
/// `on_rate_limit` receives the wait of every rate-limit rejection. The last response
/// is returned as is once the retries are exhausted.
pub async fn resilient_get<A, R>(
    client: &reqwest::Client,
    url: &str,
    headers: &HeaderMap,
    on_attempt: A,
    on_rate_limit: R,
) -> crate::Result<reqwest::Response>
where
    A: Fn() + Send + Sync + 'static,
    R: Fn(Duration) + Send + Sync + 'static,
{
    let clock = Clock::new_tokio();
    let context = ResilienceContext::new(&clock).name("http_get");

    let client = client.clone();
    let headers = headers.clone();
    let service = (
        Retry::layer("retry", &context)
            .clone_input()
            .recovery_with(move |result: &crate::Result<reqwest::Response>, _| recovery_for(result, &on_rate_limit))
            .max_retry_attempts(MAX_RETRY_ATTEMPTS)
            .base_delay(RETRY_BASE_DELAY)
            .backoff(Backoff::Exponential)
            .on_retry(|_output, args| {
                log::debug!(
                    target: LOG_TARGET,
                    "Retrying HTTP GET (attempt {}, delay {}ms)",
                    args.attempt().index() + 1,
                    args.retry_delay().as_millis(),
                );
            }),
        Timeout::layer("timeout", &context)
            .timeout_error(|_| app_err!("HTTP request timed out"))
            .timeout(REQUEST_TIMEOUT),
        Execute::new(move |url: String| {
            on_attempt();
            let request = client.get(&url).headers(headers.clone());
            async move { request.send().await.map_err(ohno::AppError::from) }
        }),
    )
        .into_service();

    service.execute(url.to_string()).await
}
