use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::CoinGeckoConfig;
use crate::models::market::{AssetSnapshot, CoinGeckoGlobalResponse, CoinGeckoMarketEntry};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CoinGecko API error {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Missing field in payload: {0}")]
    MissingField(String),
}

/// Source of the per-cycle market readings
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Current BTC share of total market cap, in percent
    async fn fetch_btc_dominance(&self) -> Result<f64, FetchError>;

    /// Current price/volume for the tracked basket
    async fn fetch_market_snapshot(&self) -> Result<Vec<AssetSnapshot>, FetchError>;
}

#[derive(Clone)]
pub struct CoinGeckoService {
    client: Client,
    config: CoinGeckoConfig,
}

impl CoinGeckoService {
    pub fn new(config: CoinGeckoConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Pro keys and demo keys travel in different headers
    fn api_key_header(&self) -> Option<(&'static str, &str)> {
        let key = self.config.api_key.as_deref()?;
        if self.config.base_url.contains("pro-api.coingecko.com") {
            Some(("x-cg-pro-api-key", key))
        } else {
            Some(("x-cg-demo-api-key", key))
        }
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        let url = format!("{}{}", self.config.base_url, path);

        let mut request = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(query);
        if let Some((header, key)) = self.api_key_header() {
            request = request.header(header, key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoService {
    async fn fetch_btc_dominance(&self) -> Result<f64, FetchError> {
        tracing::debug!("Fetching global market data from CoinGecko");

        let body = self.get_text("/global", &[]).await?;
        parse_dominance(&body, &self.config.dominance_symbol)
    }

    async fn fetch_market_snapshot(&self) -> Result<Vec<AssetSnapshot>, FetchError> {
        tracing::debug!(
            vs_currency = %self.config.vs_currency,
            per_page = self.config.page_size,
            "Fetching market snapshot from CoinGecko"
        );

        let query = [
            ("vs_currency", self.config.vs_currency.clone()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", self.config.page_size.to_string()),
            ("page", "1".to_string()),
        ];
        let body = self.get_text("/coins/markets", &query).await?;
        let assets = parse_market_snapshot(&body, &self.config.vs_currency)?;

        tracing::debug!("Fetched {} assets from CoinGecko", assets.len());

        Ok(assets)
    }
}

/// Error pages can be whole HTML documents
const MAX_ERROR_BODY_CHARS: usize = 200;

fn status_error(status: StatusCode, body: &str) -> FetchError {
    FetchError::Status {
        status,
        body: body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

/// Extract `data.market_cap_percentage.<symbol>` from a `/global` body
pub fn parse_dominance(body: &str, symbol: &str) -> Result<f64, FetchError> {
    let global: CoinGeckoGlobalResponse = serde_json::from_str(body)?;

    match global.data.market_cap_percentage.get(symbol) {
        Some(value) if value.is_finite() => Ok(*value),
        _ => Err(FetchError::MissingField(format!(
            "data.market_cap_percentage.{}",
            symbol
        ))),
    }
}

/// Convert a `/coins/markets` body into snapshots.
///
/// Entries without a price are dropped. The entry quoted in itself (BTC
/// when `vs_currency` is `btc`) is dropped because its price never moves.
pub fn parse_market_snapshot(body: &str, vs_currency: &str) -> Result<Vec<AssetSnapshot>, FetchError> {
    let entries: Vec<CoinGeckoMarketEntry> = serde_json::from_str(body)?;

    let snapshots = entries
        .into_iter()
        .filter(|entry| !entry.symbol.eq_ignore_ascii_case(vs_currency))
        .filter_map(|entry| {
            let Some(price) = entry.current_price.filter(|p| p.is_finite()) else {
                tracing::debug!(asset = %entry.id, "No price in snapshot, skipping");
                return None;
            };
            Some(AssetSnapshot {
                asset_id: entry.id,
                symbol: entry.symbol,
                price,
                volume: entry.total_volume.filter(|v| v.is_finite()),
            })
        })
        .collect();

    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GLOBAL_BODY: &str = r#"{
        "data": {
            "active_cryptocurrencies": 17000,
            "market_cap_percentage": { "btc": 56.12, "eth": 12.4 },
            "updated_at": 1760860800
        }
    }"#;

    const MARKETS_BODY: &str = r#"[
        {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 1.0, "total_volume": 410000.0},
        {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "current_price": 0.0362, "total_volume": 150000.5},
        {"id": "solana", "symbol": "sol", "name": "Solana", "current_price": 0.00171, "total_volume": null},
        {"id": "ghost", "symbol": "gst", "name": "Ghost", "current_price": null, "total_volume": 12.0}
    ]"#;

    #[test]
    fn test_status_error() {
        let err = status_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#" {"status":{"error_code":429,"error_message":"rate limited"}} "#,
        );
        assert_eq!(
            err.to_string(),
            r#"CoinGecko API error 429 Too Many Requests: {"status":{"error_code":429,"error_message":"rate limited"}}"#
        );

        let page = "x".repeat(5000);
        match status_error(StatusCode::BAD_GATEWAY, &page) {
            FetchError::Status { status, body } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body.len(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_dominance() {
        assert_eq!(parse_dominance(GLOBAL_BODY, "btc").unwrap(), 56.12);
        assert_eq!(parse_dominance(GLOBAL_BODY, "eth").unwrap(), 12.4);
    }

    #[test]
    fn test_parse_dominance_missing_symbol() {
        let err = parse_dominance(GLOBAL_BODY, "doge").unwrap_err();
        assert!(matches!(err, FetchError::MissingField(_)));
        assert!(err.to_string().contains("market_cap_percentage.doge"));
    }

    #[test]
    fn test_parse_dominance_malformed() {
        assert!(matches!(
            parse_dominance(r#"{"status": "rate limited"}"#, "btc"),
            Err(FetchError::Payload(_))
        ));
        assert!(matches!(
            parse_dominance("<html>", "btc"),
            Err(FetchError::Payload(_))
        ));
    }

    #[test]
    fn test_parse_market_snapshot() {
        let assets = parse_market_snapshot(MARKETS_BODY, "btc").unwrap();

        assert_eq!(
            assets,
            vec![
                AssetSnapshot {
                    asset_id: "ethereum".to_string(),
                    symbol: "eth".to_string(),
                    price: 0.0362,
                    volume: Some(150000.5),
                },
                AssetSnapshot {
                    asset_id: "solana".to_string(),
                    symbol: "sol".to_string(),
                    price: 0.00171,
                    volume: None,
                },
            ]
        );
    }

    #[test]
    fn test_parse_market_snapshot_keeps_btc_for_other_currencies() {
        let assets = parse_market_snapshot(MARKETS_BODY, "usd").unwrap();
        assert_eq!(assets.len(), 3);
        assert_eq!(assets[0].asset_id, "bitcoin");
    }

    #[test]
    fn test_api_key_header() {
        let service = CoinGeckoService::new(CoinGeckoConfig::default());
        assert_eq!(service.api_key_header(), None);

        let demo = CoinGeckoService::new(CoinGeckoConfig {
            api_key: Some("key".to_string()),
            ..CoinGeckoConfig::default()
        });
        assert_eq!(demo.api_key_header(), Some(("x-cg-demo-api-key", "key")));

        let pro = CoinGeckoService::new(CoinGeckoConfig {
            api_key: Some("key".to_string()),
            base_url: "https://pro-api.coingecko.com/api/v3".to_string(),
            ..CoinGeckoConfig::default()
        });
        assert_eq!(pro.api_key_header(), Some(("x-cg-pro-api-key", "key")));
    }
}
