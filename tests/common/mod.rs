use async_trait::async_trait;
use dominance_tracker::models::market::AssetSnapshot;
use dominance_tracker::services::coingecko::{FetchError, MarketDataSource};
use dominance_tracker::services::notifier::{Notifier, NotifyError};
use dominance_tracker::services::sample_store::SampleStore;
use reqwest::StatusCode;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Fresh in-memory SQLite database, no schema yet
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    Database::connect(options).await
}

/// Store over a migrated in-memory database
pub async fn setup_test_store() -> SampleStore {
    let db = setup_test_db().await.expect("Failed to open test DB");
    let store = SampleStore::new(db);
    store.ensure_schema().await.expect("Failed to run migrations");
    store
}

pub fn asset(id: &str, price: f64, volume: f64) -> AssetSnapshot {
    AssetSnapshot {
        asset_id: id.to_string(),
        symbol: id.to_string(),
        price,
        volume: Some(volume),
    }
}

/// Market source replaying scripted readings, one per cycle.
///
/// A `None` entry in either queue simulates a failed fetch.
#[derive(Default)]
pub struct ScriptedMarket {
    dominance: Mutex<VecDeque<Option<f64>>>,
    snapshots: Mutex<VecDeque<Option<Vec<AssetSnapshot>>>>,
}

impl ScriptedMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_cycle(&self, dominance: f64, assets: Vec<AssetSnapshot>) {
        self.dominance.lock().unwrap().push_back(Some(dominance));
        self.snapshots.lock().unwrap().push_back(Some(assets));
    }

    /// Dominance reads fine, the snapshot request is rejected
    pub fn push_snapshot_failure(&self, dominance: f64) {
        self.dominance.lock().unwrap().push_back(Some(dominance));
        self.snapshots.lock().unwrap().push_back(None);
    }

    pub fn push_failure(&self) {
        self.dominance.lock().unwrap().push_back(None);
    }
}

#[async_trait]
impl MarketDataSource for ScriptedMarket {
    async fn fetch_btc_dominance(&self) -> Result<f64, FetchError> {
        self.dominance
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or_else(|| FetchError::MissingField("data.market_cap_percentage.btc".to_string()))
    }

    async fn fetch_market_snapshot(&self) -> Result<Vec<AssetSnapshot>, FetchError> {
        match self.snapshots.lock().unwrap().pop_front() {
            Some(Some(assets)) => Ok(assets),
            Some(None) => Err(FetchError::Status {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: "rate limited".to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
