pub mod accumulate_repository;
pub mod balance_repository;

pub use accumulate_repository::{
    AccumulateRepository, OutputAddressRow, OutputBalanceAggregate, OutputDirection, ROW_LIMIT,
};
pub use balance_repository::BalanceRepository;
