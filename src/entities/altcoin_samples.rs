//! SeaORM Entity for per-asset price/volume samples

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "altcoin_samples")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Poll cycle timestamp, shared with the dominance row of the same cycle
    pub timestamp: DateTimeWithTimeZone,
    /// Provider asset id, e.g. "ethereum"
    pub asset_id: String,
    /// Price in the reference asset
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    #[sea_orm(column_type = "Double", nullable)]
    pub volume: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
