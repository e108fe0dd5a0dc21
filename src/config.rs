//! Tracker configuration
//!
//! Built once at startup from the process environment (optionally seeded
//! from a `.env` file) and handed to each component at construction.

use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::services::trend_analyzer::{DominanceBaseline, TrendSettings};

const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_COINGECKO_BASE_URL: &str = "COINGECKO_BASE_URL";
const ENV_COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";
const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
const ENV_TELEGRAM_API_URL: &str = "TELEGRAM_API_URL";
const ENV_DOMINANCE_HIGH: &str = "BTC_DOMINANCE_HIGH";
const ENV_DOMINANCE_LOW: &str = "BTC_DOMINANCE_LOW";
const ENV_PRICE_CHANGE_THRESHOLD: &str = "PRICE_CHANGE_THRESHOLD";
const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECS";
const ENV_WINDOW_DAYS: &str = "TREND_WINDOW_DAYS";
const ENV_TOP_RANKED: &str = "TOP_RANKED_COUNT";
const ENV_VOLUME_SPIKE_MULTIPLIER: &str = "VOLUME_SPIKE_MULTIPLIER";
const ENV_VS_CURRENCY: &str = "VS_CURRENCY";
const ENV_MARKET_PAGE_SIZE: &str = "MARKET_PAGE_SIZE";
const ENV_DOMINANCE_SYMBOL: &str = "DOMINANCE_SYMBOL";
const ENV_BASELINE: &str = "RELATIVE_STRENGTH_BASELINE";

pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_DOMINANCE_HIGH: f64 = 55.0;
pub const DEFAULT_DOMINANCE_LOW: f64 = 45.0;
/// 0.02
pub const DEFAULT_PRICE_CHANGE_THRESHOLD: Decimal = Decimal::from_parts(2, 0, 0, false, 2);
/// 5 minutes
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_TOP_RANKED: usize = 5;
pub const DEFAULT_VOLUME_SPIKE_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_VS_CURRENCY: &str = "btc";
pub const DEFAULT_MARKET_PAGE_SIZE: u32 = 50;
pub const DEFAULT_DOMINANCE_SYMBOL: &str = "btc";

/// CoinGecko caps `per_page` at 250
const MAX_MARKET_PAGE_SIZE: u32 = 250;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} is out of range: {reason}")]
    OutOfRange { key: &'static str, reason: String },
    #[error("BTC_DOMINANCE_LOW ({low}) must be below BTC_DOMINANCE_HIGH ({high})")]
    InvertedThresholds { low: f64, high: f64 },
    #[error("TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together")]
    PartialTelegram,
}

/// Dominance breach bounds, inclusive on both sides
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominanceThresholds {
    pub high: f64,
    pub low: f64,
}

impl Default for DominanceThresholds {
    fn default() -> Self {
        Self {
            high: DEFAULT_DOMINANCE_HIGH,
            low: DEFAULT_DOMINANCE_LOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Currency the asset prices are quoted in
    pub vs_currency: String,
    pub page_size: u32,
    /// Key into `market_cap_percentage` of the global endpoint
    pub dominance_symbol: String,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_COINGECKO_BASE_URL.to_string(),
            api_key: None,
            vs_currency: DEFAULT_VS_CURRENCY.to_string(),
            page_size: DEFAULT_MARKET_PAGE_SIZE,
            dominance_symbol: DEFAULT_DOMINANCE_SYMBOL.to_string(),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub chat_id: String,
}

// Keep the bot token out of logs
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_url", &self.api_url)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub database_url: String,
    pub coingecko: CoinGeckoConfig,
    /// `None` leaves only the console channel
    pub telegram: Option<TelegramConfig>,
    pub thresholds: DominanceThresholds,
    /// Minimum absolute price move, in quote currency
    pub price_change_threshold: Decimal,
    pub poll_interval: Duration,
    pub window_days: i64,
    pub trend: TrendSettings,
}

impl TrackerConfig {
    /// Build from the process environment, loading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get(ENV_DATABASE_URL).ok_or(ConfigError::Missing(ENV_DATABASE_URL))?;

        let page_size = parse_or(&get, ENV_MARKET_PAGE_SIZE, DEFAULT_MARKET_PAGE_SIZE)?;
        if page_size == 0 || page_size > MAX_MARKET_PAGE_SIZE {
            return Err(ConfigError::OutOfRange {
                key: ENV_MARKET_PAGE_SIZE,
                reason: format!("expected 1..={}, got {}", MAX_MARKET_PAGE_SIZE, page_size),
            });
        }

        let coingecko = CoinGeckoConfig {
            base_url: get(ENV_COINGECKO_BASE_URL)
                .unwrap_or_else(|| DEFAULT_COINGECKO_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: get(ENV_COINGECKO_API_KEY),
            vs_currency: get(ENV_VS_CURRENCY)
                .unwrap_or_else(|| DEFAULT_VS_CURRENCY.to_string())
                .to_lowercase(),
            page_size,
            dominance_symbol: get(ENV_DOMINANCE_SYMBOL)
                .unwrap_or_else(|| DEFAULT_DOMINANCE_SYMBOL.to_string())
                .to_lowercase(),
        };

        let telegram = match (get(ENV_TELEGRAM_BOT_TOKEN), get(ENV_TELEGRAM_CHAT_ID)) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                api_url: get(ENV_TELEGRAM_API_URL)
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                bot_token,
                chat_id,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTelegram),
        };

        let thresholds = DominanceThresholds {
            high: parse_or(&get, ENV_DOMINANCE_HIGH, DEFAULT_DOMINANCE_HIGH)?,
            low: parse_or(&get, ENV_DOMINANCE_LOW, DEFAULT_DOMINANCE_LOW)?,
        };
        require_finite(ENV_DOMINANCE_HIGH, thresholds.high)?;
        require_finite(ENV_DOMINANCE_LOW, thresholds.low)?;
        if thresholds.low >= thresholds.high {
            return Err(ConfigError::InvertedThresholds {
                low: thresholds.low,
                high: thresholds.high,
            });
        }

        let price_change_threshold =
            parse_or(&get, ENV_PRICE_CHANGE_THRESHOLD, DEFAULT_PRICE_CHANGE_THRESHOLD)?;
        if price_change_threshold <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                key: ENV_PRICE_CHANGE_THRESHOLD,
                reason: format!("expected a positive number, got {}", price_change_threshold),
            });
        }

        let poll_interval_secs = parse_or(&get, ENV_POLL_INTERVAL, DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_interval_secs == 0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_POLL_INTERVAL,
                reason: "must be greater than zero".to_string(),
            });
        }

        let window_days = parse_or(&get, ENV_WINDOW_DAYS, DEFAULT_WINDOW_DAYS)?;
        if window_days <= 0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_WINDOW_DAYS,
                reason: "must be greater than zero".to_string(),
            });
        }

        let top_n = parse_or(&get, ENV_TOP_RANKED, DEFAULT_TOP_RANKED)?;
        if top_n == 0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_TOP_RANKED,
                reason: "must be greater than zero".to_string(),
            });
        }

        let volume_spike_multiplier =
            parse_or(&get, ENV_VOLUME_SPIKE_MULTIPLIER, DEFAULT_VOLUME_SPIKE_MULTIPLIER)?;
        require_positive(ENV_VOLUME_SPIKE_MULTIPLIER, volume_spike_multiplier)?;

        let baseline = parse_or(&get, ENV_BASELINE, DominanceBaseline::default())?;

        Ok(Self {
            database_url,
            coingecko,
            telegram,
            thresholds,
            price_change_threshold,
            poll_interval: Duration::from_secs(poll_interval_secs),
            window_days,
            trend: TrendSettings {
                top_n,
                volume_spike_multiplier,
                baseline,
            },
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn require_finite(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            reason: format!("expected a finite number, got {}", value),
        })
    }
}

fn require_positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            reason: format!("expected a positive number, got {}", value),
        })
    }
}
