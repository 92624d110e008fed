//! Runner admission and retry behavior, exercised with stub accumulations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use balance_accumulator::application::accumulator::{Accumulate, AccumulatorRunner};
use balance_accumulator::domain::errors::AccumulateError;
use balance_accumulator::infrastructure::persistence::error::DbError;

/// Poll until the runner's slot is free again
async fn wait_until_idle(runner: &Arc<AccumulatorRunner>) {
    for _ in 0..400 {
        if runner.in_flight() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("accumulation did not finish");
}

/// Accumulation that blocks until released, counting entries
struct BlockingAccumulate {
    entered: AtomicUsize,
    release: Notify,
}

impl BlockingAccumulate {
    fn new() -> Self {
        Self {
            entered: AtomicUsize::new(0),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl Accumulate for BlockingAccumulate {
    async fn accumulate(&self) -> Result<(), AccumulateError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(())
    }
}

/// Accumulation that fails with a deadlock for the first `failures` attempts
struct DeadlockingAccumulate {
    attempts: AtomicUsize,
    failures: usize,
}

#[async_trait]
impl Accumulate for DeadlockingAccumulate {
    async fn accumulate(&self) -> Result<(), AccumulateError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(AccumulateError::Db(DbError::QueryError(
                "Deadlock found when trying to get lock; try restarting transaction".to_string(),
            )));
        }
        Ok(())
    }
}

/// Accumulation that always fails with a non-deadlock error
struct FailingAccumulate {
    attempts: AtomicUsize,
}

#[async_trait]
impl Accumulate for FailingAccumulate {
    async fn accumulate(&self) -> Result<(), AccumulateError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AccumulateError::Processing("claim failed".to_string()))
    }
}

#[tokio::test]
async fn second_start_is_dropped_while_running() {
    let runner = Arc::new(AccumulatorRunner::new());
    let task = Arc::new(BlockingAccumulate::new());

    runner.start(task.clone());
    assert_eq!(runner.in_flight(), 1);

    runner.start(task.clone());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runner.in_flight(), 1);
    assert_eq!(task.entered.load(Ordering::SeqCst), 1);

    task.release.notify_one();
    wait_until_idle(&runner).await;
    assert_eq!(task.entered.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn slot_is_released_after_completion() {
    let runner = Arc::new(AccumulatorRunner::new());
    let task = Arc::new(BlockingAccumulate::new());

    task.release.notify_one();
    runner.start(task.clone());
    wait_until_idle(&runner).await;

    task.release.notify_one();
    runner.start(task.clone());
    wait_until_idle(&runner).await;

    assert_eq!(task.entered.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn deadlocked_runs_are_retried_until_success() {
    let runner = Arc::new(AccumulatorRunner::new());
    let task = Arc::new(DeadlockingAccumulate {
        attempts: AtomicUsize::new(0),
        failures: 3,
    });

    runner.start(task.clone());
    wait_until_idle(&runner).await;

    // Three deadlocks, one success
    assert_eq!(task.attempts.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn other_errors_end_the_run_without_retry() {
    let runner = Arc::new(AccumulatorRunner::new());
    let task = Arc::new(FailingAccumulate {
        attempts: AtomicUsize::new(0),
    });

    runner.start(task.clone());
    wait_until_idle(&runner).await;

    assert_eq!(task.attempts.load(Ordering::SeqCst), 1);

    // The failure released the slot; a new run is admitted
    runner.start(task.clone());
    wait_until_idle(&runner).await;
    assert_eq!(task.attempts.load(Ordering::SeqCst), 2);
}
