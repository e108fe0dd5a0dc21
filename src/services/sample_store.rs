//! Sample Store
//!
//! Append-only persistence for the dominance series and per-asset
//! price/volume samples, plus the trailing-window reads the trend
//! analysis runs on.

use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, QueryFilter,
    QueryOrder, Set,
};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::entities::{altcoin_samples, btc_dominance, prelude::*};
use crate::models::market::{AssetSnapshot, PricePoint};
use crate::services::trend_analyzer::TrendWindow;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

#[derive(Clone)]
pub struct SampleStore {
    db: DatabaseConnection,
}

impl SampleStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create the sample tables if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        Migrator::up(&self.db, None).await?;
        Ok(())
    }

    pub async fn record_dominance(
        &self,
        dominance: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let row = btc_dominance::ActiveModel {
            timestamp: Set(timestamp.fixed_offset()),
            btc_dominance: Set(dominance),
            ..Default::default()
        };
        row.insert(&self.db).await?;

        Ok(())
    }

    /// Insert one row per asset, all stamped with the same cycle timestamp.
    ///
    /// Returns the number of rows written.
    pub async fn record_asset_samples(
        &self,
        assets: &[AssetSnapshot],
        timestamp: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        if assets.is_empty() {
            return Ok(0);
        }

        let rows = assets.iter().map(|asset| altcoin_samples::ActiveModel {
            timestamp: Set(timestamp.fixed_offset()),
            asset_id: Set(asset.asset_id.clone()),
            price: Set(asset.price),
            volume: Set(asset.volume),
            ..Default::default()
        });

        AltcoinSamples::insert_many(rows).exec(&self.db).await?;

        Ok(assets.len())
    }

    /// Dominance readings at or after `since`, oldest first
    pub async fn dominance_window(&self, since: DateTime<Utc>) -> Result<Vec<f64>, StoreError> {
        let rows = BtcDominance::find()
            .filter(btc_dominance::Column::Timestamp.gte(since.fixed_offset()))
            .order_by(btc_dominance::Column::Timestamp, Order::Asc)
            .order_by(btc_dominance::Column::Id, Order::Asc)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(|r| r.btc_dominance).collect())
    }

    /// Asset samples at or after `since`, grouped by asset, oldest first
    pub async fn asset_window(
        &self,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, Vec<PricePoint>>, StoreError> {
        let rows = AltcoinSamples::find()
            .filter(altcoin_samples::Column::Timestamp.gte(since.fixed_offset()))
            .order_by(altcoin_samples::Column::Timestamp, Order::Asc)
            .order_by(altcoin_samples::Column::Id, Order::Asc)
            .all(&self.db)
            .await?;

        let mut grouped: BTreeMap<String, Vec<PricePoint>> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.asset_id)
                .or_default()
                .push(PricePoint::new(row.price, row.volume));
        }

        Ok(grouped)
    }

    /// Everything the trend analysis needs for the window starting at `since`
    pub async fn load_window(&self, since: DateTime<Utc>) -> Result<TrendWindow, StoreError> {
        let dominance = self.dominance_window(since).await?;
        let assets = self.asset_window(since).await?;

        tracing::debug!(
            dominance_samples = dominance.len(),
            assets = assets.len(),
            since = %since,
            "Loaded trend window"
        );

        Ok(TrendWindow { assets, dominance })
    }
}
