//! CoinGecko client for crypto spot prices and market charts

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::Value;

use super::validation::{validate_asset_id, validate_days, validate_price};
use super::{get_json, DataError, DataResult, HistorySource, PricePoint, PriceSource};

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
const PROVIDER: &str = "coingecko";

pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Latest USD price for a CoinGecko coin id (e.g. "bitcoin")
    pub async fn fetch_price(&self, coin_id: &str) -> DataResult<f64> {
        validate_asset_id(coin_id)?;
        let coin_id = coin_id.to_lowercase();
        tracing::info!("Fetching {} price from CoinGecko", coin_id);

        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url,
            urlencoding::encode(&coin_id)
        );
        tracing::debug!("CoinGecko request: GET {}", url);

        let body = get_json(&self.client, &url, PROVIDER).await?;
        parse_simple_price(&body, &coin_id)
    }

    /// USD price points covering the last `days` days
    pub async fn fetch_market_chart(&self, coin_id: &str, days: u32) -> DataResult<Vec<PricePoint>> {
        validate_asset_id(coin_id)?;
        validate_days(days)?;
        let coin_id = coin_id.to_lowercase();
        tracing::info!("Fetching {} market chart (last {} days)", coin_id, days);

        let url = format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}",
            self.base_url,
            urlencoding::encode(&coin_id),
            days
        );
        tracing::debug!("CoinGecko request: GET {}", url);

        let body = get_json(&self.client, &url, PROVIDER).await?;
        let points = parse_market_chart(&body)?;

        tracing::info!("Fetched {} price points from CoinGecko for {}", points.len(), coin_id);
        Ok(points)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_price(&self, asset_id: &str) -> DataResult<f64> {
        CoinGeckoClient::fetch_price(self, asset_id).await
    }
}

#[async_trait]
impl HistorySource for CoinGeckoClient {
    async fn fetch_history(&self, asset_id: &str, days: u32) -> DataResult<Vec<PricePoint>> {
        self.fetch_market_chart(asset_id, days).await
    }
}

/// `{"bitcoin": {"usd": 67000.1}}`
pub(crate) fn parse_simple_price(body: &Value, coin_id: &str) -> DataResult<f64> {
    let coin = body
        .get(coin_id)
        .ok_or_else(|| DataError::missing_field(PROVIDER, coin_id))?;

    let price = coin
        .get("usd")
        .and_then(Value::as_f64)
        .ok_or_else(|| DataError::missing_field(PROVIDER, format!("{}.usd", coin_id)))?;

    validate_price(price)?;
    Ok(price)
}

/// `{"prices": [[1711929600000, 70744.2], ...]}` with millisecond timestamps.
/// Points whose price is `null` are skipped; any other malformed entry rejects the series.
pub(crate) fn parse_market_chart(body: &Value) -> DataResult<Vec<PricePoint>> {
    let pairs = body
        .get("prices")
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::missing_field(PROVIDER, "prices"))?;

    let mut points = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let (millis, price) = match pair.as_array().map(Vec::as_slice) {
            Some([millis, price]) => (millis, price),
            _ => {
                return Err(DataError::parse_error(format!(
                    "Malformed CoinGecko price point: {}",
                    pair
                )))
            }
        };

        let millis = millis
            .as_f64()
            .ok_or_else(|| DataError::parse_error(format!("Invalid timestamp: {}", millis)))?;
        let timestamp = DateTime::from_timestamp_millis(millis as i64).ok_or_else(|| {
            DataError::parse_error(format!("Invalid timestamp: {}", millis))
        })?;

        if price.is_null() {
            tracing::warn!("Skipping CoinGecko point at {} with no price", timestamp);
            continue;
        }
        let price = price
            .as_f64()
            .ok_or_else(|| DataError::parse_error(format!("Invalid price: {}", price)))?;
        validate_price(price)?;
        points.push(PricePoint { timestamp, price });
    }

    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_price() {
        let body = json!({"bitcoin": {"usd": 67012.5}});
        assert_eq!(parse_simple_price(&body, "bitcoin").unwrap(), 67012.5);
    }

    #[test]
    fn test_parse_simple_price_unknown_coin() {
        let body = json!({});
        let err = parse_simple_price(&body, "notacoin").unwrap_err();
        assert!(matches!(err, DataError::MissingField { .. }));

        let body = json!({"bitcoin": {}});
        let err = parse_simple_price(&body, "bitcoin").unwrap_err();
        assert!(err.to_string().contains("bitcoin.usd"));
    }

    #[test]
    fn test_parse_market_chart() {
        let body = json!({
            "prices": [
                [1704153600000_i64, 44187.1],
                [1704067200000_i64, 42265.2],
            ],
            "market_caps": [],
            "total_volumes": []
        });

        let points = parse_market_chart(&body).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points[0].timestamp < points[1].timestamp);
        assert_eq!(points[0].price, 42265.2);
        assert_eq!(points[0].timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_market_chart_missing_prices() {
        let body = json!({"error": "coin not found"});
        assert!(matches!(
            parse_market_chart(&body),
            Err(DataError::MissingField { .. })
        ));
    }

    #[test]
    fn test_parse_market_chart_skips_null_prices() {
        let body = json!({
            "prices": [
                [1704067200000_i64, 42265.2],
                [1704153600000_i64, null],
                [1704240000000_i64, 44950.0],
            ]
        });

        let points = parse_market_chart(&body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].price, 42265.2);
        assert_eq!(points[1].price, 44950.0);
    }

    #[test]
    fn test_parse_market_chart_rejects_malformed_point() {
        let body = json!({"prices": [[1704067200000_i64, "lots"]]});
        assert!(matches!(parse_market_chart(&body), Err(DataError::Parse { .. })));

        let body = json!({"prices": [[1704067200000_i64]]});
        assert!(matches!(parse_market_chart(&body), Err(DataError::Parse { .. })));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = CoinGeckoClient::new(reqwest::Client::new(), "http://localhost:9000/api/v3/");
        assert_eq!(client.base_url, "http://localhost:9000/api/v3");
    }
}
