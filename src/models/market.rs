use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One asset's state as reported by the data provider in a single poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub asset_id: String,
    pub symbol: String,
    /// Price in the configured reference asset
    pub price: f64,
    pub volume: Option<f64>,
}

/// A stored (price, volume) reading, oldest first within a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub volume: Option<f64>,
}

impl PricePoint {
    pub fn new(price: f64, volume: Option<f64>) -> Self {
        Self { price, volume }
    }

    /// Missing volume counts as zero
    pub fn volume_or_zero(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }
}

// CoinGecko /global response structure
#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoGlobalResponse {
    pub data: CoinGeckoGlobalData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoGlobalData {
    #[serde(default)]
    pub market_cap_percentage: HashMap<String, f64>,
}

// CoinGecko /coins/markets entry, only the fields we read
#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoMarketEntry {
    pub id: String,
    pub symbol: String,
    pub current_price: Option<f64>,
    pub total_volume: Option<f64>,
}
