use crate::Result;
use fs4::fs_std::FileExt;
use ohno::IntoAppError;
use std::fs::{File, OpenOptions};
use std::path::Path;

const LOG_TARGET: &str = "     cache";

/// Guard that releases the cache lock when dropped
#[derive(Debug)]
pub struct CacheLockGuard(File);

impl Drop for CacheLockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.unlock() {
            log::warn!(target: LOG_TARGET, "Could not unlock cache: {e:#}");
        }
    }
}

/// Take an advisory lock on the cache directory, so two crawls never share it
///
/// The directory is created if it does not exist yet.
pub async fn acquire_cache_lock(cache_dir: &Path) -> Result<CacheLockGuard> {
    std::fs::create_dir_all(cache_dir).into_app_err_with(|| format!("creating cache directory '{}'", cache_dir.display()))?;

    let lock_path = cache_dir.join("cache.lock");
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .into_app_err_with(|| format!("opening cache lock file at '{}'", lock_path.display()))?;

    // Blocks until another crawl releases the lock
    let file = tokio::task::spawn_blocking(move || {
        file.lock_exclusive()
            .into_app_err_with(|| format!("acquiring exclusive lock on cache at '{}'", lock_path.display()))?;
        log::debug!(target: LOG_TARGET, "Acquired cache lock at '{}'", lock_path.display());
        Ok::<_, ohno::AppError>(file)
    })
    .await
    .into_app_err("lock task panicked")??;

    Ok(CacheLockGuard(file))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn creates_missing_directory_and_lock_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache_dir = temp_dir.path().join("nested").join("cache");

        let guard = acquire_cache_lock(&cache_dir).await.unwrap();
        assert!(cache_dir.join("cache.lock").exists());
        drop(guard);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn lock_can_be_reacquired_after_drop() {
        let temp_dir = tempfile::tempdir().unwrap();

        drop(acquire_cache_lock(temp_dir.path()).await.unwrap());
        drop(acquire_cache_lock(temp_dir.path()).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn second_holder_waits_for_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().to_path_buf();
        let released = Arc::new(AtomicBool::new(false));

        let first = acquire_cache_lock(&dir).await.unwrap();

        let released_clone = Arc::clone(&released);
        let waiter = tokio::spawn(async move {
            let guard = acquire_cache_lock(&dir).await.unwrap();
            assert!(released_clone.load(Ordering::SeqCst));
            drop(guard);
        });

        tokio::time::sleep(core::time::Duration::from_millis(50)).await;
        released.store(true, Ordering::SeqCst);
        drop(first);

        waiter.await.unwrap();
    }
}
