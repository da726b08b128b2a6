//! Cached, rate-limited access to remote resources.

mod cache;
mod cache_lock;
mod fetcher;
mod path_utils;
mod resilient_http;
mod throttler;

pub use cache::{Cache, CacheEntry, CachedPayload};
pub use cache_lock::{CacheLockGuard, acquire_cache_lock};
pub use fetcher::{FetchError, Fetcher, MISSING_RESOURCE};
pub use path_utils::sanitize_path_component;
pub use throttler::{HostThrottles, Throttler};
