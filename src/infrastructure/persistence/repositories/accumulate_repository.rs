use std::fmt;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QuerySelect, Statement,
};

use crate::domain::models::AccumulateBalance;
use crate::infrastructure::persistence::entities::{
    accumulate_balances, output_addresses_accumulate, output_txs_accumulate,
};
use crate::infrastructure::persistence::error::DbError;

/// Maximum staging rows one pass claims within a single transaction.
pub const ROW_LIMIT: usize = 100;

/// Which side of an output a pass folds into the aggregate row: `Out` moves
/// `total_received` when the output appears, `In` moves `total_sent` once a
/// redemption record exists for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDirection {
    Out,
    In,
}

impl OutputDirection {
    /// Claim query for this direction. The join on `avm_outputs` filters
    /// staging rows whose output has not been ingested yet; the `In` side
    /// additionally joins `avm_outputs_redeeming` so a redemption can only be
    /// folded after its record exists.
    pub fn claim_sql(&self) -> String {
        match self {
            OutputDirection::Out => format!(
                "SELECT output_addresses_accumulate.id, output_addresses_accumulate.address \
                 FROM output_addresses_accumulate \
                 JOIN avm_outputs ON output_addresses_accumulate.id = avm_outputs.id \
                 WHERE output_addresses_accumulate.processed_out = 0 \
                 LIMIT {} \
                 FOR UPDATE",
                ROW_LIMIT
            ),
            OutputDirection::In => format!(
                "SELECT output_addresses_accumulate.id, output_addresses_accumulate.address \
                 FROM output_addresses_accumulate \
                 JOIN avm_outputs ON output_addresses_accumulate.id = avm_outputs.id \
                 JOIN avm_outputs_redeeming ON output_addresses_accumulate.id = avm_outputs_redeeming.id \
                 WHERE output_addresses_accumulate.processed_in = 0 \
                 LIMIT {} \
                 FOR UPDATE",
                ROW_LIMIT
            ),
        }
    }

    /// Staging flag this direction flips
    pub fn flag_column(&self) -> output_addresses_accumulate::Column {
        match self {
            OutputDirection::Out => output_addresses_accumulate::Column::ProcessedOut,
            OutputDirection::In => output_addresses_accumulate::Column::ProcessedIn,
        }
    }
}

impl fmt::Display for OutputDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputDirection::Out => write!(f, "out"),
            OutputDirection::In => write!(f, "in"),
        }
    }
}

/// A claimed staging row from output_addresses_accumulate
#[derive(Debug, Clone, FromQueryResult)]
pub struct OutputAddressRow {
    pub id: String,
    pub address: String,
}

/// Amounts one (output, address) pair contributes, grouped by balance key
/// components. Both totals carry the same sum; the pass applies only the one
/// its direction moves.
#[derive(Debug, Clone, FromQueryResult)]
pub struct OutputBalanceAggregate {
    pub chain_id: String,
    pub address: String,
    pub asset_id: String,
    pub transaction_count: i64,
    pub total_received: Decimal,
    pub total_sent: Decimal,
}

/// Repository for the staging-side queries of the accumulation passes. Every
/// method runs on the caller's transaction so claims, counter updates and
/// flag flips commit atomically.
#[derive(Clone, Debug, Default)]
pub struct AccumulateRepository;

impl AccumulateRepository {
    pub fn new() -> Self {
        Self
    }

    /// Claim a batch of unprocessed output-address rows, write-locking them
    pub async fn claim_output_rows<C: ConnectionTrait>(
        &self,
        conn: &C,
        direction: OutputDirection,
    ) -> Result<Vec<OutputAddressRow>, DbError> {
        let stmt = Statement::from_string(DbBackend::MySql, direction.claim_sql());

        OutputAddressRow::find_by_statement(stmt)
            .all(conn)
            .await
            .map_err(DbError::from)
    }

    /// Aggregate the amounts a single (output, address) pair contributes,
    /// one row per distinct (chain, address, asset) combination
    pub async fn aggregate_output_balances<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        address: &str,
    ) -> Result<Vec<OutputBalanceAggregate>, DbError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::MySql,
            "SELECT avm_outputs.chain_id, avm_output_addresses.address, avm_outputs.asset_id, \
             COUNT(DISTINCT avm_outputs.transaction_id) AS transaction_count, \
             SUM(avm_outputs.amount) AS total_received, \
             SUM(avm_outputs.amount) AS total_sent \
             FROM avm_outputs \
             JOIN avm_output_addresses ON avm_outputs.id = avm_output_addresses.output_id \
             WHERE avm_outputs.id = ? AND avm_output_addresses.address = ? \
             GROUP BY avm_outputs.chain_id, avm_output_addresses.address, avm_outputs.asset_id",
            [id.into(), address.into()],
        );

        OutputBalanceAggregate::find_by_statement(stmt)
            .all(conn)
            .await
            .map_err(DbError::from)
    }

    /// Re-select aggregate rows by key with write locks. Updating only after
    /// locking the whole key set keeps lock acquisition in stable key order
    /// across concurrent passes.
    pub async fn lock_balances<C: ConnectionTrait>(
        &self,
        conn: &C,
        keys: &[String],
    ) -> Result<(), DbError> {
        accumulate_balances::Entity::find()
            .filter(accumulate_balances::Column::Id.is_in(keys.iter().cloned()))
            .lock_exclusive()
            .all(conn)
            .await
            .map(|_| ())
            .map_err(DbError::from)
    }

    /// Apply one output's delta to its aggregate row
    pub async fn apply_output_delta<C: ConnectionTrait>(
        &self,
        conn: &C,
        direction: OutputDirection,
        balance: &AccumulateBalance,
    ) -> Result<(), DbError> {
        let stmt = match direction {
            OutputDirection::Out => Statement::from_sql_and_values(
                DbBackend::MySql,
                "UPDATE accumulate_balances \
                 SET utxo_count = utxo_count + 1, total_received = total_received + ? \
                 WHERE id = ?",
                [balance.total_received.into(), balance.id.clone().into()],
            ),
            OutputDirection::In => Statement::from_sql_and_values(
                DbBackend::MySql,
                "UPDATE accumulate_balances \
                 SET utxo_count = utxo_count - 1, total_sent = total_sent + ? \
                 WHERE id = ?",
                [balance.total_sent.into(), balance.id.clone().into()],
            ),
        };

        conn.execute(stmt).await.map(|_| ()).map_err(DbError::from)
    }

    /// Flip the direction's processed flag on a claimed staging row
    pub async fn mark_output_processed<C: ConnectionTrait>(
        &self,
        conn: &C,
        direction: OutputDirection,
        id: &str,
        address: &str,
    ) -> Result<(), DbError> {
        output_addresses_accumulate::Entity::update_many()
            .col_expr(direction.flag_column(), Expr::value(1i8))
            .col_expr(
                output_addresses_accumulate::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(output_addresses_accumulate::Column::Id.eq(id))
            .filter(output_addresses_accumulate::Column::Address.eq(address))
            .exec(conn)
            .await
            .map(|_| ())
            .map_err(DbError::from)
    }

    /// Claim a batch of unprocessed output-tx rows with write locks
    pub async fn claim_tx_rows<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<Vec<output_txs_accumulate::Model>, DbError> {
        output_txs_accumulate::Entity::find()
            .filter(output_txs_accumulate::Column::Processed.eq(0))
            .limit(ROW_LIMIT as u64)
            .lock_exclusive()
            .all(conn)
            .await
            .map_err(DbError::from)
    }

    /// Bump the transaction counter of one aggregate row by one
    pub async fn bump_transaction_count<C: ConnectionTrait>(
        &self,
        conn: &C,
        key: &str,
    ) -> Result<(), DbError> {
        accumulate_balances::Entity::update_many()
            .col_expr(
                accumulate_balances::Column::TransactionCount,
                Expr::col(accumulate_balances::Column::TransactionCount).add(1),
            )
            .filter(accumulate_balances::Column::Id.eq(key))
            .exec(conn)
            .await
            .map(|_| ())
            .map_err(DbError::from)
    }

    /// Mark a claimed output-tx staging row processed
    pub async fn mark_tx_processed<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> Result<(), DbError> {
        output_txs_accumulate::Entity::update_many()
            .col_expr(output_txs_accumulate::Column::Processed, Expr::value(1i8))
            .col_expr(
                output_txs_accumulate::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(output_txs_accumulate::Column::Id.eq(id))
            .exec(conn)
            .await
            .map(|_| ())
            .map_err(DbError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_batches_are_capped_and_locked() {
        for direction in [OutputDirection::Out, OutputDirection::In] {
            let sql = direction.claim_sql();
            assert!(sql.contains(&format!("LIMIT {}", ROW_LIMIT)));
            assert!(sql.ends_with("FOR UPDATE"));
        }
    }

    #[test]
    fn redemption_claim_requires_redemption_record() {
        assert!(OutputDirection::In
            .claim_sql()
            .contains("JOIN avm_outputs_redeeming"));
        assert!(!OutputDirection::Out
            .claim_sql()
            .contains("avm_outputs_redeeming"));
    }

    #[test]
    fn each_direction_flips_its_own_flag() {
        assert!(matches!(
            OutputDirection::Out.flag_column(),
            output_addresses_accumulate::Column::ProcessedOut
        ));
        assert!(matches!(
            OutputDirection::In.flag_column(),
            output_addresses_accumulate::Column::ProcessedIn
        ));
    }

    #[test]
    fn directions_render_for_log_lines() {
        assert_eq!(OutputDirection::Out.to_string(), "out");
        assert_eq!(OutputDirection::In.to_string(), "in");
    }
}
