use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Staging row for one (output, address) pair. `processed_out` flips when the
/// output is folded into totals-received, `processed_in` when its redemption
/// is folded into totals-sent; rows are kept afterwards as an audit trail.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "output_addresses_accumulate")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub address: String,
    pub processed_out: i8,
    pub processed_in: i8,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
