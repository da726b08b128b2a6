use crate::HashMap;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

/// Limits concurrency against one remote host and supports temporary pausing.
///
/// Call [`Throttler::acquire`] before each request. At most `max_concurrent` requests
/// run at once. Any task can call [`Throttler::pause_for`] when the host signals a rate
/// limit; the longest active pause wins.
#[derive(Debug)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
    paused: AtomicBool,
    resume: Notify,
    resume_at: Mutex<Option<Instant>>,
}

impl Throttler {
    /// Minimum extension required for a new pause to override an active one.
    const MIN_PAUSE_EXTENSION: Duration = Duration::from_secs(1);

    /// Create a new throttler that allows at most `max_concurrent` requests at a time.
    #[must_use]
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            paused: AtomicBool::new(false),
            resume: Notify::new(),
            resume_at: Mutex::new(None),
        })
    }

    /// Wait until unpaused, then acquire a request slot.
    ///
    /// The slot is released when the returned permit is dropped.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        loop {
            if self.paused.load(Ordering::Acquire) {
                let notified = self.resume.notified();
                // Re-check so a resume between the load and the registration is not lost
                if self.paused.load(Ordering::Acquire) {
                    notified.await;
                }
                continue;
            }

            return Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .expect("semaphore is never closed");
        }
    }

    /// Returns whether the throttler is currently paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause dispatching for `duration`, then automatically resume.
    ///
    /// In-flight requests are not interrupted. Returns `false` when a pause of similar or
    /// longer duration is already active.
    pub fn pause_for(self: &Arc<Self>, duration: Duration) -> bool {
        let new_resume_at = Instant::now() + duration;

        {
            let mut guard = self.resume_at.lock().expect("lock not poisoned");
            if guard.is_some_and(|existing| existing + Self::MIN_PAUSE_EXTENSION >= new_resume_at) {
                return false;
            }
            *guard = Some(new_resume_at);
        }

        self.paused.store(true, Ordering::Release);
        let this = Arc::clone(self);
        drop(tokio::spawn(async move {
            tokio::time::sleep(duration).await;

            let should_resume = {
                let mut guard = this.resume_at.lock().expect("lock not poisoned");
                if guard.is_some_and(|t| Instant::now() >= t) {
                    *guard = None;
                    true
                } else {
                    false
                }
            };

            if should_resume {
                this.paused.store(false, Ordering::Release);
                this.resume.notify_waiters();
            }
        }));

        true
    }
}

/// Lazily created [`Throttler`] instances, one per remote host.
#[derive(Debug)]
pub struct HostThrottles {
    max_concurrent: usize,
    by_host: Mutex<HashMap<String, Arc<Throttler>>>,
}

impl HostThrottles {
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            by_host: Mutex::new(HashMap::default()),
        }
    }

    /// Returns the throttler for `host`, creating it on first use.
    #[must_use]
    pub fn for_host(&self, host: &str) -> Arc<Throttler> {
        let mut by_host = self.by_host.lock().expect("lock not poisoned");
        Arc::clone(
            by_host
                .entry(host.to_string())
                .or_insert_with(|| Throttler::new(self.max_concurrent)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn single_permit_serializes_requests() {
        let throttler = Throttler::new(1);
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let throttler = Arc::clone(&throttler);
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    let _permit = throttler.acquire().await;
                    let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                    _ = max_seen.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    _ = active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        _ = futures_util::future::join_all(tasks).await;

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn pause_blocks_new_requests() {
        let throttler = Throttler::new(3);

        assert!(throttler.pause_for(Duration::from_millis(200)));
        assert!(throttler.is_paused());

        let start = tokio::time::Instant::now();
        let _permit = throttler.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(150));
        assert!(!throttler.is_paused());
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn shorter_pause_does_not_override_longer() {
        let throttler = Throttler::new(1);

        assert!(throttler.pause_for(Duration::from_secs(5)));
        assert!(!throttler.pause_for(Duration::from_millis(10)));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn hosts_get_independent_throttlers() {
        let throttles = HostThrottles::new(1);

        let github = throttles.for_host("api.github.com");
        let gitlab = throttles.for_host("gitlab.com");
        let github_again = throttles.for_host("api.github.com");

        assert!(Arc::ptr_eq(&github, &github_again));
        assert!(!Arc::ptr_eq(&github, &gitlab));

        // Holding the GitHub slot must not block GitLab
        let _github_permit = github.acquire().await;
        let _gitlab_permit = gitlab.acquire().await;
    }
}
