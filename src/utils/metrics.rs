use std::collections::HashMap;
use std::sync::Mutex;

use prometheus::{IntCounter, Opts, Registry};

use crate::utils::logging;

pub const METRIC_PRODUCE_PROCESSED_COUNT: &str = "produce_records_processed";
pub const METRIC_PRODUCE_SUCCESS_COUNT: &str = "produce_records_success";
pub const METRIC_PRODUCE_FAILURE_COUNT: &str = "produce_records_failure";

pub const METRIC_CONSUME_PROCESSED_COUNT: &str = "consume_records_processed";
pub const METRIC_CONSUME_PROCESS_MILLIS_COUNT: &str = "consume_records_process_millis";
pub const METRIC_CONSUME_SUCCESS_COUNT: &str = "consume_records_success";
pub const METRIC_CONSUME_FAILURE_COUNT: &str = "consume_records_failure";

/// Counter registry for the enclosing worker.
///
/// The worker registers its produce/consume counters once at startup; the
/// accumulator itself never increments them.
pub struct WorkerMetrics {
    registry: Registry,
    counters: Mutex<HashMap<String, IntCounter>>,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Register a counter under `name`. Registering the same name twice is a
    /// no-op so startup paths can share counter sets.
    pub fn counter_init(&self, name: &str, help: &str) {
        let mut counters = match self.counters.lock() {
            Ok(counters) => counters,
            Err(_) => return,
        };
        if counters.contains_key(name) {
            return;
        }

        let counter = match IntCounter::with_opts(Opts::new(name, help)) {
            Ok(counter) => counter,
            Err(e) => {
                logging::log_warning(&format!("Failed to create counter {}: {}", name, e));
                return;
            }
        };

        if let Err(e) = self.registry.register(Box::new(counter.clone())) {
            logging::log_warning(&format!("Failed to register counter {}: {}", name, e));
            return;
        }

        counters.insert(name.to_string(), counter);
    }

    /// Look up a previously registered counter
    pub fn counter(&self, name: &str) -> Option<IntCounter> {
        self.counters
            .lock()
            .ok()
            .and_then(|counters| counters.get(name).cloned())
    }

    /// Register the producer-side counters
    pub fn init_produce_metrics(&self) {
        self.counter_init(METRIC_PRODUCE_PROCESSED_COUNT, "records processed");
        self.counter_init(METRIC_PRODUCE_SUCCESS_COUNT, "records success");
        self.counter_init(METRIC_PRODUCE_FAILURE_COUNT, "records failure");
    }

    /// Register the consumer-side counters
    pub fn init_consume_metrics(&self) {
        self.counter_init(METRIC_CONSUME_PROCESSED_COUNT, "records processed");
        self.counter_init(METRIC_CONSUME_PROCESS_MILLIS_COUNT, "records processed millis");
        self.counter_init(METRIC_CONSUME_SUCCESS_COUNT, "records success");
        self.counter_init(METRIC_CONSUME_FAILURE_COUNT, "records failure");
    }

    /// The backing registry, for exposition endpoints
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_once() {
        let metrics = WorkerMetrics::new();
        metrics.init_consume_metrics();
        metrics.init_consume_metrics();

        let counter = metrics
            .counter(METRIC_CONSUME_PROCESSED_COUNT)
            .expect("counter registered");
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn unregistered_counter_is_absent() {
        let metrics = WorkerMetrics::new();
        metrics.init_produce_metrics();

        assert!(metrics.counter(METRIC_CONSUME_PROCESSED_COUNT).is_none());
        assert!(metrics.counter(METRIC_PRODUCE_PROCESSED_COUNT).is_some());
    }
}
