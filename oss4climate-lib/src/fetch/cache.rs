//! Persistent URL-keyed cache backed by JSON envelope files.
//!
//! Every remote payload is stored once per request URL, together with the time it was
//! fetched. Entries are never mutated and never expire: staleness is handled by
//! deleting or rotating the cache directory.

use super::path_utils::cache_file_name;
use crate::Result;
use chrono::{DateTime, Utc};
use core::sync::atomic::{AtomicU64, Ordering};
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "     cache";

/// Distinguishes temporary files written concurrently by this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A payload as received from the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CachedPayload {
    /// A decoded JSON document.
    Json(serde_json::Value),

    /// Raw text, such as a README or an HTML page.
    Text(String),
}

/// On-disk representation of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The exact request URL.
    pub key: String,
    pub fetched_at: DateTime<Utc>,
    pub payload: CachedPayload,
}

/// A directory-backed cache keyed by request URL.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    ignore: bool,
}

impl Cache {
    /// Create a new cache rooted at `cache_dir`.
    ///
    /// When `ignore_cache` is set, lookups always miss but fresh payloads are still stored.
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>, ignore_cache: bool) -> Self {
        Self {
            dir: cache_dir.into(),
            ignore: ignore_cache,
        }
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up the entry stored for `key`.
    #[must_use]
    pub fn load(&self, key: &str) -> Option<CacheEntry> {
        if self.ignore {
            return None;
        }

        let path = self.dir.join(cache_file_name(key));

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                log::trace!(target: LOG_TARGET, "Cache miss for '{key}': {e:#}");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_reader(BufReader::new(file)) {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Cache miss for '{key}', unreadable entry: {e:#}");
                return None;
            }
        };

        // Two keys can sanitize to the same file name
        if entry.key != key {
            log::debug!(target: LOG_TARGET, "Cache miss for '{key}', file holds '{}'", entry.key);
            return None;
        }

        Some(entry)
    }

    /// Store `payload` under `key`.
    ///
    /// The entry is written to a temporary file and renamed into place, so readers never
    /// observe a partial entry and concurrent writers of the same key resolve as last-write-wins.
    pub fn store(&self, key: &str, payload: &CachedPayload, fetched_at: DateTime<Utc>) -> Result<()> {
        let path = self.dir.join(cache_file_name(key));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
        }

        let tmp_path = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let entry = CacheEntry {
            key: key.to_string(),
            fetched_at,
            payload: payload.clone(),
        };

        {
            let file = File::create(&tmp_path).into_app_err_with(|| format!("creating cache file '{}'", tmp_path.display()))?;
            let mut writer = BufWriter::new(file);

            #[cfg(debug_assertions)]
            let result = serde_json::to_writer_pretty(&mut writer, &entry);
            #[cfg(not(debug_assertions))]
            let result = serde_json::to_writer(&mut writer, &entry);

            result.into_app_err_with(|| format!("writing cache file '{}'", tmp_path.display()))?;
            writer
                .flush()
                .into_app_err_with(|| format!("flushing cache file '{}'", tmp_path.display()))?;
        }

        fs::rename(&tmp_path, &path).into_app_err_with(|| format!("moving cache file into place at '{}'", path.display()))?;
        log::trace!(target: LOG_TARGET, "Stored '{key}' at '{}'", path.display());
        Ok(())
    }
}
