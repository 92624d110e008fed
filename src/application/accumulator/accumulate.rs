use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tokio::time::timeout;

use crate::domain::errors::AccumulateError;
use crate::domain::models::AccumulateBalance;
use crate::infrastructure::persistence::repositories::{
    AccumulateRepository, BalanceRepository, OutputDirection, ROW_LIMIT,
};
use crate::utils::logging;

use super::runner::Accumulate;

/// Deadline for the database work of one pass transaction
const UPDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Consecutive idle sweeps over all three passes before a run ends
const IDLE_SWEEP_LIMIT: u32 = 10;

/// Folds staged output and transaction rows into `accumulate_balances`.
///
/// A run drives three passes in a fixed order: outputs-out first so a UTXO's
/// increment lands before its decrement can be staged, then outputs-in, then
/// transaction counts. Each pass claims bounded batches under row locks and
/// commits every batch atomically with its flag flips.
pub struct BalanceAccumulator {
    conn: DatabaseConnection,
    accumulate: AccumulateRepository,
    persist: BalanceRepository,
}

impl BalanceAccumulator {
    pub fn new(
        conn: DatabaseConnection,
        accumulate: AccumulateRepository,
        persist: BalanceRepository,
    ) -> Self {
        Self {
            conn,
            accumulate,
            persist,
        }
    }

    /// Repeat the passes until the staging queues are quiescent: every pass
    /// claiming a full batch is drained immediately, and any batch with at
    /// least one row restarts the idle-sweep count.
    pub async fn run_to_quiescence(&self) -> Result<(), AccumulateError> {
        let mut idle_sweeps = 0;
        while idle_sweeps < IDLE_SWEEP_LIMIT {
            loop {
                let cnt = self.process_outputs(OutputDirection::Out).await?;
                if cnt > 0 {
                    idle_sweeps = 0;
                }
                if cnt < ROW_LIMIT {
                    break;
                }
            }
            loop {
                let cnt = self.process_outputs(OutputDirection::In).await?;
                if cnt > 0 {
                    idle_sweeps = 0;
                }
                if cnt < ROW_LIMIT {
                    break;
                }
            }
            loop {
                let cnt = self.process_transactions().await?;
                if cnt > 0 {
                    idle_sweeps = 0;
                }
                if cnt < ROW_LIMIT {
                    break;
                }
            }
            idle_sweeps += 1;
        }

        Ok(())
    }

    /// Process one claimed batch of output-address rows for `direction`.
    /// Returns the number of rows claimed.
    async fn process_outputs(&self, direction: OutputDirection) -> Result<usize, AccumulateError> {
        match timeout(UPDATE_TIMEOUT, self.process_outputs_batch(direction)).await {
            Ok(result) => result,
            // The dropped transaction rolls back
            Err(_) => Err(AccumulateError::Timeout(format!(
                "output {} pass exceeded its deadline",
                direction
            ))),
        }
    }

    async fn process_outputs_batch(
        &self,
        direction: OutputDirection,
    ) -> Result<usize, AccumulateError> {
        let txn = self.conn.begin().await?;

        let rows = self.accumulate.claim_output_rows(&txn, direction).await?;
        if rows.is_empty() {
            txn.commit().await?;
            return Ok(0);
        }

        for row in &rows {
            let aggregates = self
                .accumulate
                .aggregate_output_balances(&txn, &row.id, &row.address)
                .await?;

            // The output exists but carries no address linkage; leave the
            // staging row unprocessed so a later run can pick it up.
            if aggregates.is_empty() {
                logging::log_info(&format!(
                    "invalid balance {} {} on {}",
                    row.id, row.address, direction
                ));
                continue;
            }

            let mut balances = Vec::with_capacity(aggregates.len());
            for aggregate in aggregates {
                let mut balance = AccumulateBalance::keyed(
                    aggregate.chain_id,
                    aggregate.asset_id,
                    aggregate.address,
                );
                balance.total_received = aggregate.total_received;
                balance.total_sent = aggregate.total_sent;
                balance.transaction_count = aggregate.transaction_count;

                self.persist
                    .insert_accumulate_balance(&txn, &balance)
                    .await?;
                balances.push(balance);
            }

            let keys: Vec<String> = balances.iter().map(|b| b.id.clone()).collect();
            self.accumulate.lock_balances(&txn, &keys).await?;

            for balance in &balances {
                self.accumulate
                    .apply_output_delta(&txn, direction, balance)
                    .await?;
            }

            self.accumulate
                .mark_output_processed(&txn, direction, &row.id, &row.address)
                .await?;
        }

        txn.commit().await?;
        Ok(rows.len())
    }

    /// Process one claimed batch of output-tx rows. Returns the number of
    /// rows claimed.
    async fn process_transactions(&self) -> Result<usize, AccumulateError> {
        match timeout(UPDATE_TIMEOUT, self.process_transactions_batch()).await {
            Ok(result) => result,
            Err(_) => Err(AccumulateError::Timeout(
                "transaction pass exceeded its deadline".to_string(),
            )),
        }
    }

    async fn process_transactions_batch(&self) -> Result<usize, AccumulateError> {
        let txn = self.conn.begin().await?;

        let rows = self.accumulate.claim_tx_rows(&txn).await?;
        if rows.is_empty() {
            txn.commit().await?;
            return Ok(0);
        }

        let mut balances = Vec::with_capacity(rows.len());
        for row in &rows {
            let balance = AccumulateBalance::keyed(
                row.chain_id.clone(),
                row.asset_id.clone(),
                row.address.clone(),
            );
            self.persist
                .insert_accumulate_balance(&txn, &balance)
                .await?;
            balances.push(balance);
        }

        let keys: Vec<String> = balances.iter().map(|b| b.id.clone()).collect();
        self.accumulate.lock_balances(&txn, &keys).await?;

        // One increment per staging row: several rows in the batch may share
        // a balance key, and each participation counts.
        for balance in &balances {
            self.accumulate
                .bump_transaction_count(&txn, &balance.id)
                .await?;
        }

        for row in &rows {
            self.accumulate.mark_tx_processed(&txn, &row.id).await?;
        }

        txn.commit().await?;
        Ok(rows.len())
    }
}

#[async_trait]
impl Accumulate for BalanceAccumulator {
    async fn accumulate(&self) -> Result<(), AccumulateError> {
        self.run_to_quiescence().await
    }
}
