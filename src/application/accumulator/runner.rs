use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::AccumulateError;
use crate::infrastructure::persistence::error::is_deadlock;
use crate::utils::logging;

/// Sleep between retries of a deadlocked accumulation
const DEADLOCK_RETRY_SLEEP: Duration = Duration::from_millis(1);

/// A unit of accumulation work the runner drives to completion
#[async_trait]
pub trait Accumulate: Send + Sync {
    async fn accumulate(&self) -> Result<(), AccumulateError>;
}

/// Admits at most one in-flight accumulation per process.
///
/// `start` returns immediately in every case: the request is dropped when an
/// accumulation is already running, and failures of the background task are
/// logged rather than surfaced to the caller.
pub struct AccumulatorRunner {
    running: AtomicI64,
    lock: Mutex<()>,
}

impl AccumulatorRunner {
    pub fn new() -> Self {
        Self {
            running: AtomicI64::new(0),
            lock: Mutex::new(()),
        }
    }

    /// Number of accumulations currently in flight (0 or 1)
    pub fn in_flight(&self) -> i64 {
        self.running.load(Ordering::SeqCst)
    }

    /// Start a background accumulation and return immediately.
    ///
    /// The initial load is a fast-path check only; admission is decided under
    /// the mutex. The slot is taken before the task is spawned and released
    /// by the guard when the task exits, on failure as well as success.
    pub fn start(self: &Arc<Self>, task: Arc<dyn Accumulate>) {
        if self.running.load(Ordering::SeqCst) != 0 {
            return;
        }

        {
            let _guard = match self.lock.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            if self.running.load(Ordering::SeqCst) != 0 {
                return;
            }
            self.running.fetch_add(1, Ordering::SeqCst);
        }

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            let _slot = RunningSlot { runner };

            loop {
                match task.accumulate().await {
                    Ok(()) => break,
                    Err(err) if is_deadlock(&err) => {
                        tokio::time::sleep(DEADLOCK_RETRY_SLEEP).await;
                    }
                    Err(err) => {
                        logging::log_warning(&format!("Accumulate {}", err));
                        break;
                    }
                }
            }
        });
    }
}

impl Default for AccumulatorRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the runner's single slot when the accumulation task exits
struct RunningSlot {
    runner: Arc<AccumulatorRunner>,
}

impl Drop for RunningSlot {
    fn drop(&mut self) {
        self.runner.running.fetch_add(-1, Ordering::SeqCst);
    }
}
