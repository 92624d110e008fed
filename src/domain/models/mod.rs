pub mod balance;

pub use balance::{balance_key, AccumulateBalance};
