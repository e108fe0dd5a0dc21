//! Alert evaluation and dispatch
//!
//! Four independent alert kinds per poll cycle:
//! - dominance threshold breach
//! - per-asset price move against the previous cycle
//! - top-ranked relative strength summary
//! - accumulation (volume spike) signals

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::DominanceThresholds;
use crate::models::market::AssetSnapshot;
use crate::services::notifier::Notifier;
use crate::services::trend_analyzer::{AccumulationSignal, RankedAsset, TrendReport};

#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Started,
    DominanceHigh {
        dominance: f64,
        threshold: f64,
    },
    DominanceLow {
        dominance: f64,
        threshold: f64,
    },
    PriceMove {
        asset_id: String,
        previous: f64,
        current: f64,
    },
    TopRanked {
        window_days: i64,
        ranking: Vec<RankedAsset>,
    },
    Accumulation(AccumulationSignal),
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::Started => write!(f, "BTC Dominance Tracker Started."),
            Alert::DominanceHigh {
                dominance,
                threshold,
            } => write!(
                f,
                "BTC Dominance has risen above {:?}%: {:.2}%",
                threshold, dominance
            ),
            Alert::DominanceLow {
                dominance,
                threshold,
            } => write!(
                f,
                "BTC Dominance has dropped below {:?}%: {:.2}%",
                threshold, dominance
            ),
            Alert::PriceMove {
                asset_id,
                previous,
                current,
            } => write!(
                f,
                "{} price moved from {:.8} to {:.8} ({:+.8})",
                asset_id,
                previous,
                current,
                current - previous
            ),
            Alert::TopRanked {
                window_days,
                ranking,
            } => {
                write!(
                    f,
                    "Top {} altcoins by relative strength ({}d):",
                    ranking.len(),
                    window_days
                )?;
                for (i, asset) in ranking.iter().enumerate() {
                    write!(
                        f,
                        "\n{}. {}: {:+.2}%",
                        i + 1,
                        asset.asset_id,
                        asset.relative_strength * 100.0
                    )?;
                }
                Ok(())
            }
            Alert::Accumulation(signal) => write!(
                f,
                "Accumulation signal: {} volume {:.2} vs average {:.2}",
                signal.asset_id, signal.latest_volume, signal.average_volume
            ),
        }
    }
}

/// Last price seen per asset, kept for the life of the process
#[derive(Debug, Default, Clone)]
pub struct PriceCache {
    last_seen: HashMap<String, f64>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `price` as the latest for `asset_id`, returning what it replaced
    pub fn observe(&mut self, asset_id: &str, price: f64) -> Option<f64> {
        self.last_seen.insert(asset_id.to_string(), price)
    }

    pub fn get(&self, asset_id: &str) -> Option<f64> {
        self.last_seen.get(asset_id).copied()
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

/// High wins when both bounds match, which a valid config never allows
pub fn evaluate_dominance(dominance: f64, thresholds: &DominanceThresholds) -> Option<Alert> {
    if dominance >= thresholds.high {
        Some(Alert::DominanceHigh {
            dominance,
            threshold: thresholds.high,
        })
    } else if dominance <= thresholds.low {
        Some(Alert::DominanceLow {
            dominance,
            threshold: thresholds.low,
        })
    } else {
        None
    }
}

/// Compare every asset against its cached price, then overwrite the cache.
///
/// The first sighting of an asset never alerts.
pub fn evaluate_price_moves(
    assets: &[AssetSnapshot],
    cache: &mut PriceCache,
    threshold: Decimal,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for asset in assets {
        let Some(previous) = cache.observe(&asset.asset_id, asset.price) else {
            continue;
        };

        if price_moved(previous, asset.price, threshold) {
            alerts.push(Alert::PriceMove {
                asset_id: asset.asset_id.clone(),
                previous,
                current: asset.price,
            });
        }
    }

    alerts
}

/// Absolute move check, done in decimal so 0.12 -> 0.10 counts as 0.02
pub fn price_moved(previous: f64, current: f64, threshold: Decimal) -> bool {
    match (to_decimal(previous), to_decimal(current)) {
        (Some(previous), Some(current)) => (current - previous).abs() >= threshold,
        _ => {
            let threshold = threshold.to_f64().unwrap_or(f64::INFINITY);
            (current - previous).abs() >= threshold
        }
    }
}

fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

/// `None` when nothing qualified for the ranking
pub fn ranking_alert(report: &TrendReport, window_days: i64) -> Option<Alert> {
    if report.ranking.is_empty() {
        return None;
    }
    Some(Alert::TopRanked {
        window_days,
        ranking: report.ranking.clone(),
    })
}

pub fn accumulation_alerts(report: &TrendReport) -> Vec<Alert> {
    report
        .accumulation
        .iter()
        .cloned()
        .map(Alert::Accumulation)
        .collect()
}

/// Fans every alert out to all configured channels
#[derive(Clone, Default)]
pub struct AlertDispatcher {
    channels: Vec<Arc<dyn Notifier>>,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { channels }
    }

    pub fn with_channel(mut self, channel: Arc<dyn Notifier>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send to every channel. A failing channel is logged and skipped.
    ///
    /// Returns how many channels accepted the alert.
    pub async fn dispatch(&self, alert: &Alert) -> usize {
        let message = alert.to_string();
        let mut delivered = 0;

        for channel in &self.channels {
            match channel.send(&message).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(channel = channel.name(), error = %e, "Failed to send alert");
                }
            }
        }

        info!(delivered = delivered, "Alert dispatched: {}", message);
        delivered
    }

    pub async fn dispatch_all(&self, alerts: &[Alert]) -> usize {
        let mut delivered = 0;
        for alert in alerts {
            delivered += self.dispatch(alert).await;
        }
        delivered
    }
}
