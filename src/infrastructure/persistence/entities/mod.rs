pub mod accumulate_balances;
pub mod output_addresses_accumulate;
pub mod output_txs_accumulate;
