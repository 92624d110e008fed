use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Precomputed balance aggregate. `id` is the deterministic hash of
/// `(chain_id, asset_id, address)`; the accumulator is the only writer of
/// the counter columns.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accumulate_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub chain_id: String,
    pub asset_id: String,
    pub address: String,
    pub utxo_count: i64,
    #[sea_orm(column_type = "Decimal(Some((65, 0)))")]
    pub total_received: Decimal,
    #[sea_orm(column_type = "Decimal(Some((65, 0)))")]
    pub total_sent: Decimal,
    pub transaction_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
