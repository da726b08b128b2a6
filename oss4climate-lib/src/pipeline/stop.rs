use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "      stop";

/// Exit status after a second Ctrl-C, following the shell's 128 + SIGINT convention.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug)]
struct StopState {
    stopped: AtomicBool,
    interrupted: AtomicBool,
    deadline: Option<Instant>,
}

/// Cooperative cancellation for long runs.
///
/// Once triggered, by [`StopSignal::stop`], Ctrl-C, or the deadline passing, no new
/// fetch starts. Work already in flight is left to complete.
#[derive(Debug, Clone)]
pub struct StopSignal {
    state: Arc<StopState>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new(None)
    }
}

impl StopSignal {
    /// Create a signal that also trips once `time_limit` has elapsed.
    #[must_use]
    pub fn new(time_limit: Option<Duration>) -> Self {
        Self {
            state: Arc::new(StopState {
                stopped: AtomicBool::new(false),
                interrupted: AtomicBool::new(false),
                deadline: time_limit.map(|limit| Instant::now() + limit),
            }),
        }
    }

    pub fn stop(&self) {
        self.state.stopped.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        if self.state.stopped.load(Ordering::Relaxed) {
            return true;
        }

        if self.state.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            self.state.stopped.store(true, Ordering::Relaxed);
            log::warn!(target: LOG_TARGET, "Time limit reached, no new fetches will start");
            return true;
        }

        false
    }

    /// Record an interrupt and trip the signal.
    ///
    /// Returns `true` when an earlier interrupt was already recorded.
    pub fn interrupt(&self) -> bool {
        self.stop();
        self.state.interrupted.swap(true, Ordering::Relaxed)
    }

    /// Trip the signal on the first Ctrl-C and exit the process on the second.
    ///
    /// The returned task should be aborted once the run completes. The Ctrl-C handler
    /// stays installed afterwards, so later presses are ignored until the process exits.
    #[must_use]
    pub fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if signal.interrupt() {
                    log::warn!(target: LOG_TARGET, "Interrupted again, exiting");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
                log::warn!(target: LOG_TARGET, "Interrupted, finishing in-flight fetches (press Ctrl-C again to exit)");
            }
        })
    }
}
