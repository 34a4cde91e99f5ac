//! Data pipeline module for fetching prices, price history and news
//! Every upstream call returns a typed `DataResult`; nothing is coerced to a sentinel here

pub mod crypto;
pub mod errors;
pub mod news;
pub mod sentiment;
pub mod stock;

// Re-export commonly used types
pub use crypto::CoinGeckoClient;
pub use errors::{DataError, DataResult};
pub use news::{NewsApiClient, NewsArticle};
pub use sentiment::{SentimentLabel, SentimentReport, SentimentScorer, VaderScorer};
pub use stock::{AlphaVantageClient, PriceFallback, TwelveDataClient};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_HISTORY_DAYS: u32 = 5;
pub const DEFAULT_NEWS_COUNT: usize = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("marketpulse/", env!("CARGO_PKG_VERSION"));

/// Exchange and quote-currency suffixes stripped from asset ids
pub const MARKET_SUFFIXES: &[&str] = &["-USD", ".NS", ":NSE", ".BSE"];

/// One observation of a price series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Crypto,
    Stock,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Crypto => write!(f, "crypto"),
            AssetKind::Stock => write!(f, "stock"),
        }
    }
}

impl FromStr for AssetKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crypto" => Ok(AssetKind::Crypto),
            "stock" | "equity" => Ok(AssetKind::Stock),
            other => Err(DataError::validation_error(
                "kind".to_string(),
                format!("Unknown asset kind '{}' (use crypto or stock)", other),
            )),
        }
    }
}

/// A tradable asset as the upstream services identify it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub kind: AssetKind,
}

impl Asset {
    pub fn new(id: &str, name: &str, kind: AssetKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
        }
    }

    /// Built-in asset list
    pub fn catalog() -> Vec<Asset> {
        vec![
            Asset::new("bitcoin", "Bitcoin (BTC)", AssetKind::Crypto),
            Asset::new("ethereum", "Ethereum (ETH)", AssetKind::Crypto),
            Asset::new("RELIANCE.NS", "Reliance (RELIANCE.NS)", AssetKind::Stock),
            Asset::new("TATASTEEL.NS", "Tata Steel (TATASTEEL.NS)", AssetKind::Stock),
        ]
    }

    /// Look an id up in the catalog, or build an ad hoc asset.
    ///
    /// An explicit `kind` always wins. Otherwise ids carrying an exchange
    /// suffix are stocks and everything else is treated as a CoinGecko id.
    pub fn resolve(id: &str, kind: Option<AssetKind>) -> DataResult<Asset> {
        validation::validate_asset_id(id)?;

        if let Some(known) = Asset::catalog()
            .into_iter()
            .find(|a| a.id.eq_ignore_ascii_case(id))
        {
            if kind.map_or(true, |k| k == known.kind) {
                return Ok(known);
            }
        }

        let kind = kind.unwrap_or_else(|| {
            if has_exchange_suffix(id) {
                AssetKind::Stock
            } else {
                AssetKind::Crypto
            }
        });

        Ok(Asset::new(id, id, kind))
    }
}

fn has_exchange_suffix(id: &str) -> bool {
    let upper = id.to_uppercase();
    [".NS", ".BSE", ":NSE"].iter().any(|s| upper.ends_with(s))
}

/// Current price of an asset
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short provider name used in logs and error messages
    fn name(&self) -> &str;

    async fn fetch_price(&self, asset_id: &str) -> DataResult<f64>;
}

/// Daily price history, ascending by timestamp
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_history(&self, asset_id: &str, days: u32) -> DataResult<Vec<PricePoint>>;
}

/// News about an asset, most recent first
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_articles(&self, asset_id: &str, count: usize) -> DataResult<Vec<NewsArticle>>;

    /// Just the scored text of each article
    async fn fetch_news(&self, asset_id: &str, count: usize) -> DataResult<Vec<String>> {
        let articles = self.fetch_articles(asset_id, count).await?;
        Ok(articles.iter().map(NewsArticle::headline).collect())
    }
}

/// Build the HTTP client shared by one upstream client
pub fn build_http_client(timeout_seconds: u64, user_agent: &str) -> DataResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

/// GET `url` and decode the body as JSON, mapping non-2xx statuses to `DataError::Api`
pub(crate) async fn get_json(
    client: &reqwest::Client,
    url: &str,
    provider: &str,
) -> DataResult<serde_json::Value> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        let status_code = response.status().as_u16();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        tracing::warn!("{} request failed ({}): {}", provider, status_code, error_text);

        return Err(DataError::api_error(
            status_code,
            format!("{}: {}", provider, error_text),
        ));
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| DataError::parse_error(format!("{} returned invalid JSON: {}", provider, e)))
}

/// Hide an API key before a URL is logged
pub(crate) fn redact(url: &str, secret: Option<&str>) -> String {
    match secret {
        Some(s) if !s.is_empty() => url.replace(s, "***"),
        _ => url.to_string(),
    }
}

/// Read a numeric field that providers send either as a JSON number or a string
pub(crate) fn parse_number(
    provider: &str,
    field: &str,
    value: Option<&serde_json::Value>,
) -> DataResult<f64> {
    match value {
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| DataError::parse_error(format!("{} field '{}' is not a float", provider, field))),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            DataError::parse_error(format!("{} field '{}' is not numeric: {:?}", provider, field, s))
        }),
        Some(serde_json::Value::Null) | None => Err(DataError::missing_field(provider, field)),
        Some(other) => Err(DataError::parse_error(format!(
            "{} field '{}' has unexpected type: {}",
            provider, field, other
        ))),
    }
}

/// Validation helpers
pub mod validation {
    use super::*;

    pub fn validate_asset_id(id: &str) -> DataResult<()> {
        if id.trim().is_empty() {
            return Err(DataError::validation_error("asset_id", "Asset id cannot be empty"));
        }

        if id.len() > 64 {
            return Err(DataError::validation_error("asset_id", "Asset id too long (max 64 chars)"));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | ':' | '_'))
        {
            return Err(DataError::validation_error(
                "asset_id",
                "Asset id may only contain letters, digits, '-', '.', ':' and '_'",
            ));
        }

        Ok(())
    }

    pub fn validate_days(days: u32) -> DataResult<()> {
        if days == 0 {
            return Err(DataError::validation_error("days", "History needs at least one day"));
        }
        Ok(())
    }

    /// Prices must be finite and non-negative; zero is a legitimate value
    pub fn validate_price(price: f64) -> DataResult<()> {
        if !price.is_finite() {
            return Err(DataError::validation_error("price", "Price must be a finite number"));
        }
        if price < 0.0 {
            return Err(DataError::validation_error("price", "Price cannot be negative"));
        }
        Ok(())
    }

    pub fn validate_sentiment_score(score: f64) -> DataResult<()> {
        if !(-1.0..=1.0).contains(&score) {
            return Err(DataError::validation_error(
                "sentiment_score",
                "Sentiment score must be between -1.0 and 1.0",
            ));
        }
        Ok(())
    }
}
