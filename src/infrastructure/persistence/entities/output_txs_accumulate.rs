use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Staging row for one (transaction, address) participation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "output_txs_accumulate")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub chain_id: String,
    pub asset_id: String,
    pub address: String,
    pub transaction_id: String,
    pub processed: i8,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
