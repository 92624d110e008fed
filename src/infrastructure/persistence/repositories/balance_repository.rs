use sea_orm::{ConnectionTrait, DbBackend, Statement};

use crate::domain::models::AccumulateBalance;
use crate::infrastructure::persistence::error::DbError;

/// Repository seeding aggregate balance rows.
#[derive(Clone, Debug, Default)]
pub struct BalanceRepository;

impl BalanceRepository {
    pub fn new() -> Self {
        Self
    }

    /// Insert the aggregate row for `balance` with zeroed counters, inside
    /// the caller's transaction. A duplicate balance key is a success and
    /// leaves the existing counters untouched.
    pub async fn insert_accumulate_balance<C: ConnectionTrait>(
        &self,
        conn: &C,
        balance: &AccumulateBalance,
    ) -> Result<(), DbError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::MySql,
            "INSERT INTO accumulate_balances \
             (id, chain_id, asset_id, address, utxo_count, total_received, total_sent, transaction_count) \
             VALUES (?, ?, ?, ?, 0, 0, 0, 0) \
             ON DUPLICATE KEY UPDATE id = id",
            [
                balance.id.clone().into(),
                balance.chain_id.clone().into(),
                balance.asset_id.clone().into(),
                balance.address.clone().into(),
            ],
        );

        conn.execute(stmt).await.map(|_| ()).map_err(DbError::from)
    }
}
