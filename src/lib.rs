//! Balance accumulator worker.
//!
//! Upstream ingestion stages raw outputs and transaction-address linkages in
//! `output_addresses_accumulate` and `output_txs_accumulate`; this worker
//! claims those rows in bounded batches and folds their deltas into the
//! `accumulate_balances` aggregate rows that downstream query services read.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod utils;
