//! SeaORM Entity for the BTC dominance time series

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "btc_dominance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Poll cycle timestamp
    pub timestamp: DateTimeWithTimeZone,
    /// BTC share of total market cap, in percent
    #[sea_orm(column_type = "Double")]
    pub btc_dominance: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
