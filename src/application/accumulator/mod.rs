//! Balance accumulation: the singleton runner and the three-pass loop that
//! drains the staging tables into aggregate balance rows.

pub mod accumulate;
pub mod runner;

pub use accumulate::BalanceAccumulator;
pub use runner::{Accumulate, AccumulatorRunner};
