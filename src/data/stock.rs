//! Equity quotes and daily series
//! Twelve Data is the primary source (NSE symbols as `SYMBOL:NSE`), Alpha Vantage the
//! secondary quote source (`SYMBOL.BSE`). `PriceFallback` chains the two.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use super::validation::{validate_asset_id, validate_days, validate_price};
use super::{
    get_json, parse_number, redact, DataError, DataResult, HistorySource, PricePoint, PriceSource,
};

pub const TWELVE_DATA_API_URL: &str = "https://api.twelvedata.com";
pub const ALPHA_VANTAGE_API_URL: &str = "https://www.alphavantage.co/query";

const TWELVE_DATA: &str = "twelvedata";
const ALPHA_VANTAGE: &str = "alphavantage";

/// `RELIANCE.NS` -> `RELIANCE:NSE`
pub fn twelve_data_symbol(asset_id: &str) -> String {
    asset_id.replace(".NS", ":NSE")
}

/// `RELIANCE.NS` -> `RELIANCE.BSE`
pub fn alpha_vantage_symbol(asset_id: &str) -> String {
    asset_id.replace(".NS", ".BSE")
}

fn require_key<'a>(key: &'a Option<String>, env_name: &str) -> DataResult<&'a str> {
    key.as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| DataError::Config(format!("{} is not configured", env_name)))
}

pub struct TwelveDataClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TwelveDataClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub async fn fetch_quote(&self, asset_id: &str) -> DataResult<f64> {
        validate_asset_id(asset_id)?;
        let api_key = require_key(&self.api_key, "TWELVE_DATA_API_KEY")?;
        let symbol = twelve_data_symbol(asset_id);
        tracing::info!("Fetching {} quote from Twelve Data", symbol);

        let url = format!(
            "{}/quote?symbol={}&apikey={}",
            self.base_url,
            urlencoding::encode(&symbol),
            urlencoding::encode(api_key)
        );
        tracing::debug!("Twelve Data request: GET {}", redact(&url, Some(api_key)));

        let body = get_json(&self.client, &url, TWELVE_DATA).await?;
        parse_twelve_quote(&body)
    }

    /// Daily closes, at most `days` of them, oldest first
    pub async fn fetch_time_series(&self, asset_id: &str, days: u32) -> DataResult<Vec<PricePoint>> {
        validate_asset_id(asset_id)?;
        validate_days(days)?;
        let api_key = require_key(&self.api_key, "TWELVE_DATA_API_KEY")?;
        let symbol = twelve_data_symbol(asset_id);
        tracing::info!("Fetching {} daily series from Twelve Data (last {} days)", symbol, days);

        let url = format!(
            "{}/time_series?symbol={}&interval=1day&outputsize={}&apikey={}",
            self.base_url,
            urlencoding::encode(&symbol),
            days,
            urlencoding::encode(api_key)
        );
        tracing::debug!("Twelve Data request: GET {}", redact(&url, Some(api_key)));

        let body = get_json(&self.client, &url, TWELVE_DATA).await?;
        let points = parse_twelve_time_series(&body)?;

        tracing::info!("Fetched {} daily closes from Twelve Data for {}", points.len(), symbol);
        Ok(points)
    }
}

#[async_trait]
impl PriceSource for TwelveDataClient {
    fn name(&self) -> &str {
        TWELVE_DATA
    }

    async fn fetch_price(&self, asset_id: &str) -> DataResult<f64> {
        self.fetch_quote(asset_id).await
    }
}

#[async_trait]
impl HistorySource for TwelveDataClient {
    async fn fetch_history(&self, asset_id: &str, days: u32) -> DataResult<Vec<PricePoint>> {
        self.fetch_time_series(asset_id, days).await
    }
}

pub struct AlphaVantageClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AlphaVantageClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    pub async fn fetch_global_quote(&self, asset_id: &str) -> DataResult<f64> {
        validate_asset_id(asset_id)?;
        let api_key = require_key(&self.api_key, "ALPHA_VANTAGE_API_KEY")?;
        let symbol = alpha_vantage_symbol(asset_id);
        tracing::info!("Fetching {} quote from Alpha Vantage", symbol);

        let url = format!(
            "{}?function=GLOBAL_QUOTE&symbol={}&apikey={}",
            self.base_url,
            urlencoding::encode(&symbol),
            urlencoding::encode(api_key)
        );
        tracing::debug!("Alpha Vantage request: GET {}", redact(&url, Some(api_key)));

        let body = get_json(&self.client, &url, ALPHA_VANTAGE).await?;
        parse_global_quote(&body)
    }
}

#[async_trait]
impl PriceSource for AlphaVantageClient {
    fn name(&self) -> &str {
        ALPHA_VANTAGE
    }

    async fn fetch_price(&self, asset_id: &str) -> DataResult<f64> {
        self.fetch_global_quote(asset_id).await
    }
}

/// Ask `primary` once, then `secondary` once. No retries, no backoff.
pub struct PriceFallback {
    primary: Arc<dyn PriceSource>,
    secondary: Arc<dyn PriceSource>,
}

impl PriceFallback {
    pub fn new(primary: Arc<dyn PriceSource>, secondary: Arc<dyn PriceSource>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl PriceSource for PriceFallback {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn fetch_price(&self, asset_id: &str) -> DataResult<f64> {
        let primary_err = match self.primary.fetch_price(asset_id).await {
            Ok(price) => return Ok(price),
            Err(e) => e,
        };

        tracing::warn!(
            "{} price failed for {}: {}, falling back to {}",
            self.primary.name(),
            asset_id,
            primary_err,
            self.secondary.name()
        );

        match self.secondary.fetch_price(asset_id).await {
            Ok(price) => {
                tracing::info!("{} price {:.2} served by {}", asset_id, price, self.secondary.name());
                Ok(price)
            }
            Err(secondary_err) => {
                tracing::warn!(
                    "{} price failed for {}: {}",
                    self.secondary.name(),
                    asset_id,
                    secondary_err
                );
                Err(DataError::AllSourcesFailed {
                    primary: Box::new(primary_err),
                    secondary: Box::new(secondary_err),
                })
            }
        }
    }
}

/// Twelve Data answers errors with HTTP 200 and `{"status": "error", "code": 404, "message": ..}`
fn check_twelve_error(body: &Value) -> DataResult<()> {
    if body.get("status").and_then(Value::as_str) == Some("error") {
        let status_code = body
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(400);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return Err(DataError::api_error(status_code, format!("{}: {}", TWELVE_DATA, message)));
    }
    Ok(())
}

pub(crate) fn parse_twelve_quote(body: &Value) -> DataResult<f64> {
    check_twelve_error(body)?;
    let price = parse_number(TWELVE_DATA, "close", body.get("close"))?;
    validate_price(price)?;
    Ok(price)
}

pub(crate) fn parse_twelve_time_series(body: &Value) -> DataResult<Vec<PricePoint>> {
    check_twelve_error(body)?;

    let values = body
        .get("values")
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::missing_field(TWELVE_DATA, "values"))?;

    let mut points = Vec::with_capacity(values.len());
    for value in values {
        let raw = value
            .get("datetime")
            .and_then(Value::as_str)
            .ok_or_else(|| DataError::missing_field(TWELVE_DATA, "values[].datetime"))?;
        let timestamp = parse_datetime(raw)?;
        let price = parse_number(TWELVE_DATA, "values[].close", value.get("close"))?;
        validate_price(price)?;
        points.push(PricePoint { timestamp, price });
    }

    // newest first on the wire
    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

/// `2024-01-02` (daily bars) or `2024-01-02 15:30:00` (intraday), taken as UTC
fn parse_datetime(raw: &str) -> DataResult<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .map_err(|_| DataError::parse_error(format!("Invalid datetime: {}", raw)))
}

/// Alpha Vantage also reports problems with HTTP 200: `Error Message` for bad
/// symbols, `Note`/`Information` for throttling and premium-only endpoints
pub(crate) fn parse_global_quote(body: &Value) -> DataResult<f64> {
    if let Some(message) = body.get("Error Message").and_then(Value::as_str) {
        return Err(DataError::api_error(400, format!("{}: {}", ALPHA_VANTAGE, message)));
    }
    for key in ["Note", "Information"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return Err(DataError::api_error(429, format!("{}: {}", ALPHA_VANTAGE, message)));
        }
    }

    let quote = body
        .get("Global Quote")
        .ok_or_else(|| DataError::missing_field(ALPHA_VANTAGE, "Global Quote"))?;

    let price = match quote.get("05. price") {
        Some(v) => parse_number(ALPHA_VANTAGE, "Global Quote.05. price", Some(v))?,
        None => return Err(DataError::missing_field(ALPHA_VANTAGE, "Global Quote.05. price")),
    };

    validate_price(price)?;
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_symbol_conventions() {
        assert_eq!(twelve_data_symbol("RELIANCE.NS"), "RELIANCE:NSE");
        assert_eq!(alpha_vantage_symbol("RELIANCE.NS"), "RELIANCE.BSE");
        assert_eq!(twelve_data_symbol("AAPL"), "AAPL");
    }

    #[test]
    fn test_parse_twelve_quote() {
        let body = json!({"symbol": "RELIANCE", "exchange": "NSE", "close": "2931.45000"});
        assert!((parse_twelve_quote(&body).unwrap() - 2931.45).abs() < 1e-9);
    }

    #[test]
    fn test_parse_twelve_quote_error_payload() {
        let body = json!({"code": 401, "message": "apikey parameter is incorrect", "status": "error"});
        match parse_twelve_quote(&body) {
            Err(DataError::Api { status_code, message }) => {
                assert_eq!(status_code, 401);
                assert!(message.contains("apikey"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_twelve_quote_missing_close() {
        let body = json!({"symbol": "RELIANCE"});
        assert!(matches!(
            parse_twelve_quote(&body),
            Err(DataError::MissingField { .. })
        ));
    }

    #[test]
    fn test_parse_twelve_time_series_sorts_ascending() {
        let body = json!({
            "meta": {"symbol": "RELIANCE", "interval": "1day"},
            "values": [
                {"datetime": "2024-01-03", "open": "1", "close": "2600.5"},
                {"datetime": "2024-01-02", "open": "1", "close": "2590.0"},
                {"datetime": "2024-01-01", "open": "1", "close": "2580.25"}
            ],
            "status": "ok"
        });

        let points = parse_twelve_time_series(&body).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].price, 2580.25);
        assert_eq!(points[2].price, 2600.5);
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert_eq!(
            parse_datetime("2024-01-02").unwrap().to_rfc3339(),
            "2024-01-02T00:00:00+00:00"
        );
        assert_eq!(
            parse_datetime("2024-01-02 15:30:00").unwrap().to_rfc3339(),
            "2024-01-02T15:30:00+00:00"
        );
        assert!(parse_datetime("02/01/2024").is_err());
    }

    #[test]
    fn test_parse_global_quote() {
        let body = json!({
            "Global Quote": {
                "01. symbol": "RELIANCE.BSE",
                "05. price": "2928.3500"
            }
        });
        assert!((parse_global_quote(&body).unwrap() - 2928.35).abs() < 1e-9);
    }

    #[test]
    fn test_parse_global_quote_failures() {
        let empty = json!({"Global Quote": {}});
        assert!(matches!(
            parse_global_quote(&empty),
            Err(DataError::MissingField { .. })
        ));

        let throttled = json!({"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"});
        let err = parse_global_quote(&throttled).unwrap_err();
        assert!(err.is_transient());

        let bad_symbol = json!({"Error Message": "Invalid API call."});
        let err = parse_global_quote(&bad_symbol).unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let client = TwelveDataClient::new(reqwest::Client::new(), TWELVE_DATA_API_URL, None);
        let err = client.fetch_quote("RELIANCE.NS").await.unwrap_err();
        assert!(matches!(err, DataError::Config(_)));

        let client = AlphaVantageClient::new(
            reqwest::Client::new(),
            ALPHA_VANTAGE_API_URL,
            Some(String::new()),
        );
        let err = client.fetch_global_quote("RELIANCE.NS").await.unwrap_err();
        assert!(err.to_string().contains("ALPHA_VANTAGE_API_KEY"));
    }
}
