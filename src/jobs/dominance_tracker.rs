//! Dominance Tracker Job
//!
//! STARTUP runs once: ensure the schema exists, announce the tracker.
//! POLLING then runs one cycle per tick until the process is stopped:
//! fetch dominance and the asset snapshot, persist both, analyze the
//! trailing window and dispatch alerts.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{interval, Duration as TokioDuration, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::{
    DominanceThresholds, TrackerConfig, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PRICE_CHANGE_THRESHOLD,
    DEFAULT_WINDOW_DAYS,
};
use crate::services::alerts::{
    accumulation_alerts, evaluate_dominance, evaluate_price_moves, ranking_alert, Alert,
    AlertDispatcher, PriceCache,
};
use crate::services::coingecko::{CoinGeckoService, MarketDataSource};
use crate::services::notifier::{ConsoleNotifier, Notifier, TelegramNotifier};
use crate::services::sample_store::{SampleStore, StoreError};
use crate::services::trend_analyzer::{TrendAnalyzer, TrendSettings};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Sample store failure: {0}")]
    Store(#[from] StoreError),
}

/// Settings the loop reads every cycle
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    pub thresholds: DominanceThresholds,
    pub price_change_threshold: Decimal,
    pub poll_interval: TokioDuration,
    pub window_days: i64,
    pub trend: TrendSettings,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            thresholds: DominanceThresholds::default(),
            price_change_threshold: DEFAULT_PRICE_CHANGE_THRESHOLD,
            poll_interval: TokioDuration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            window_days: DEFAULT_WINDOW_DAYS,
            trend: TrendSettings::default(),
        }
    }
}

impl From<&TrackerConfig> for TrackerSettings {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            price_change_threshold: config.price_change_threshold,
            poll_interval: config.poll_interval,
            window_days: config.window_days,
            trend: config.trend,
        }
    }
}

/// What one completed cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub dominance: f64,
    pub samples_stored: usize,
    pub ranked: usize,
    pub accumulation_signals: usize,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Fetch failed; nothing was stored or sent
    Skipped { reason: String },
}

pub struct DominanceTracker {
    source: Arc<dyn MarketDataSource>,
    store: SampleStore,
    analyzer: TrendAnalyzer,
    dispatcher: AlertDispatcher,
    settings: TrackerSettings,
    price_cache: PriceCache,
}

impl DominanceTracker {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: SampleStore,
        dispatcher: AlertDispatcher,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            source,
            store,
            analyzer: TrendAnalyzer::new(settings.trend),
            dispatcher,
            settings,
            price_cache: PriceCache::new(),
        }
    }

    /// Wire the production collaborators: CoinGecko, the console channel and
    /// Telegram when configured.
    pub fn from_config(db: DatabaseConnection, config: &TrackerConfig) -> Self {
        let mut channels: Vec<Arc<dyn Notifier>> = vec![Arc::new(ConsoleNotifier)];
        if let Some(telegram) = &config.telegram {
            channels.push(Arc::new(TelegramNotifier::new(telegram.clone())));
        }

        Self::new(
            Arc::new(CoinGeckoService::new(config.coingecko.clone())),
            SampleStore::new(db),
            AlertDispatcher::new(channels),
            TrackerSettings::from(config),
        )
    }

    pub fn price_cache(&self) -> &PriceCache {
        &self.price_cache
    }

    pub async fn startup(&self) -> Result<(), TrackerError> {
        info!(
            channels = ?self.dispatcher.channel_names(),
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            window_days = self.settings.window_days,
            "Initializing dominance tracker"
        );

        self.store.ensure_schema().await?;
        self.dispatcher.dispatch(&Alert::Started).await;

        Ok(())
    }

    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, TrackerError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// One poll cycle stamped with `now`.
    ///
    /// Fetch failures skip the cycle; store failures are returned.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome, TrackerError> {
        let dominance = match self.source.fetch_btc_dominance().await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to fetch BTC Dominance, skipping cycle");
                return Ok(CycleOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
        };

        let assets = match self.source.fetch_market_snapshot().await {
            Ok(assets) => assets,
            Err(e) => {
                warn!(error = %e, "Failed to fetch market snapshot, skipping cycle");
                return Ok(CycleOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
        };

        info!("{} - BTC Dominance: {:.2}%", now.format("%Y-%m-%d %H:%M:%S"), dominance);

        self.store.record_dominance(dominance, now).await?;
        let samples_stored = self.store.record_asset_samples(&assets, now).await?;

        let mut alerts = Vec::new();
        alerts.extend(evaluate_dominance(dominance, &self.settings.thresholds));
        alerts.extend(evaluate_price_moves(
            &assets,
            &mut self.price_cache,
            self.settings.price_change_threshold,
        ));

        let since = now - Duration::days(self.settings.window_days);
        let window = self.store.load_window(since).await?;
        let report = self.analyzer.analyze(&window);

        alerts.extend(ranking_alert(&report, self.settings.window_days));
        alerts.extend(accumulation_alerts(&report));

        self.dispatcher.dispatch_all(&alerts).await;

        info!(
            samples_stored = samples_stored,
            ranked = report.ranking.len(),
            accumulation = report.accumulation.len(),
            alerts = alerts.len(),
            "Cycle complete"
        );

        Ok(CycleOutcome::Completed(CycleReport {
            timestamp: now,
            dominance,
            samples_stored,
            ranked: report.ranking.len(),
            accumulation_signals: report.accumulation.len(),
            alerts,
        }))
    }

    /// Poll until Ctrl-C or a store failure
    pub async fn run(mut self) -> Result<(), TrackerError> {
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Dominance tracker polling started");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping dominance tracker");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!(error = %e, "Dominance tracker cycle failed");
                        return Err(e);
                    }
                }
            }
        }

        info!("Dominance tracker stopped");
        Ok(())
    }
}
