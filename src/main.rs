//! Balance accumulator worker.
//!
//! Claims staged output and transaction rows in bounded batches and folds
//! them into the `accumulate_balances` aggregate rows. Runs until Ctrl+C;
//! a run in progress is interrupted at its next transaction boundary.

use std::sync::Arc;
use std::time::Duration;

use balance_accumulator::application::accumulator::{AccumulatorRunner, BalanceAccumulator};
use balance_accumulator::config::AppConfig;
use balance_accumulator::infrastructure::persistence::repositories::{
    AccumulateRepository, BalanceRepository,
};
use balance_accumulator::infrastructure::persistence::DbPool;
use balance_accumulator::utils::logging;
use balance_accumulator::utils::metrics::WorkerMetrics;

#[tokio::main]
async fn main() {
    logging::init_logger();

    let config = AppConfig::from_env();

    // Worker counters are registered once at startup; the consumer and
    // producer stages increment them.
    let metrics = WorkerMetrics::new();
    metrics.init_produce_metrics();
    metrics.init_consume_metrics();

    // Connect to database
    let db_pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            logging::log_error(&format!("Failed to connect to database: {}", e));
            return;
        }
    };

    let accumulator = Arc::new(BalanceAccumulator::new(
        db_pool.get_connection().clone(),
        AccumulateRepository::new(),
        BalanceRepository::new(),
    ));
    let runner = Arc::new(AccumulatorRunner::new());

    let tick_runner = Arc::clone(&runner);
    let tick_accumulator = Arc::clone(&accumulator);
    let tick_interval = Duration::from_millis(config.accumulator.interval_ms);
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        loop {
            interval.tick().await;
            // Dropped silently while a run is already in flight
            tick_runner.start(tick_accumulator.clone());
        }
    });

    logging::log_info("Balance accumulator started");

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for Ctrl+C");

    logging::log_info("Shutting down...");
    ticker.abort();
}
