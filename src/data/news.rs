use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::validate_asset_id;
use super::{get_json, redact, DataError, DataResult, NewsSource, MARKET_SUFFIXES};

pub const NEWS_API_URL: &str = "https://newsapi.org/v2";
const PROVIDER: &str = "newsapi";
/// NewsAPI rejects larger page sizes
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub source: String,
    pub published_at: Option<String>,
}

impl NewsArticle {
    /// Title and description joined by a space; the text that gets scored
    pub fn headline(&self) -> String {
        format!("{} {}", self.title, self.description.as_deref().unwrap_or(""))
    }
}

/// Asset id with exchange and quote-currency suffixes removed
pub fn base_query_term(asset_id: &str) -> String {
    MARKET_SUFFIXES
        .iter()
        .fold(asset_id.to_string(), |acc, suffix| acc.replace(suffix, ""))
}

/// Search query for an asset's headlines
pub fn build_query(asset_id: &str) -> String {
    let base = base_query_term(asset_id);
    match base.to_lowercase().as_str() {
        "bitcoin" | "btc" => format!("{} OR BTC finance", base),
        _ => format!("{} stock OR finance", base),
    }
}

pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl NewsApiClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Fetch up to `count` articles about an asset, most recent first
    pub async fn fetch_articles(&self, asset_id: &str, count: usize) -> DataResult<Vec<NewsArticle>> {
        validate_asset_id(asset_id)?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DataError::Config("NEWS_API_KEY is not configured".to_string()))?;

        let query = build_query(asset_id);
        tracing::info!("Fetching news for {} (query: {:?})", asset_id, query);

        let url = format!(
            "{}/everything?q={}&apiKey={}&language=en&sortBy=publishedAt&pageSize={}",
            self.base_url,
            urlencoding::encode(&query),
            urlencoding::encode(api_key),
            count.min(MAX_PAGE_SIZE)
        );
        tracing::debug!("NewsAPI request: GET {}", redact(&url, Some(api_key)));

        let body = get_json(&self.client, &url, PROVIDER).await?;
        let mut articles = parse_articles(&body)?;
        articles.truncate(count);

        tracing::info!("Fetched {} news articles from NewsAPI", articles.len());
        Ok(articles)
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn fetch_articles(&self, asset_id: &str, count: usize) -> DataResult<Vec<NewsArticle>> {
        NewsApiClient::fetch_articles(self, asset_id, count).await
    }
}

pub(crate) fn parse_articles(body: &Value) -> DataResult<Vec<NewsArticle>> {
    if body.get("status").and_then(Value::as_str) == Some("error") {
        let code = body.get("code").and_then(Value::as_str).unwrap_or("unknown");
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        let status_code = if code == "rateLimited" { 429 } else { 400 };
        return Err(DataError::api_error(
            status_code,
            format!("NewsAPI error ({}): {}", code, message),
        ));
    }

    let articles = body
        .get("articles")
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::missing_field(PROVIDER, "articles"))?;

    let news_articles = articles
        .iter()
        .map(|article| NewsArticle {
            title: article["title"].as_str().unwrap_or("").to_string(),
            description: article["description"].as_str().map(String::from),
            url: article["url"].as_str().map(String::from),
            source: article["source"]["name"].as_str().unwrap_or("Unknown").to_string(),
            published_at: article["publishedAt"].as_str().map(String::from),
        })
        .collect();

    Ok(news_articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_query_term_strips_suffixes() {
        assert_eq!(base_query_term("BTC-USD"), "BTC");
        assert_eq!(base_query_term("RELIANCE.NS"), "RELIANCE");
        assert_eq!(base_query_term("TATASTEEL:NSE"), "TATASTEEL");
        assert_eq!(base_query_term("RELIANCE.BSE"), "RELIANCE");
        assert_eq!(base_query_term("ethereum"), "ethereum");
    }

    #[test]
    fn test_build_query() {
        assert_eq!(build_query("bitcoin"), "bitcoin OR BTC finance");
        assert_eq!(build_query("Bitcoin"), "Bitcoin OR BTC finance");
        assert_eq!(build_query("BTC-USD"), "BTC OR BTC finance");
        assert_eq!(build_query("ethereum"), "ethereum stock OR finance");
        assert_eq!(build_query("RELIANCE.NS"), "RELIANCE stock OR finance");
    }

    #[test]
    fn test_parse_articles_builds_headlines() {
        let body = json!({
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {
                    "source": {"id": null, "name": "Reuters"},
                    "title": "Bitcoin rallies",
                    "description": "Prices jump after ETF news",
                    "url": "https://example.com/a",
                    "publishedAt": "2024-03-01T10:00:00Z"
                },
                {
                    "source": {"id": null, "name": "CoinDesk"},
                    "title": "Miners sell",
                    "description": null,
                    "url": "https://example.com/b",
                    "publishedAt": "2024-03-01T09:00:00Z"
                }
            ]
        });

        let articles = parse_articles(&body).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].headline(), "Bitcoin rallies Prices jump after ETF news");
        assert_eq!(articles[1].headline(), "Miners sell ");
        assert_eq!(articles[1].source, "CoinDesk");
    }

    #[test]
    fn test_parse_articles_error_payload() {
        let body = json!({
            "status": "error",
            "code": "apiKeyInvalid",
            "message": "Your API key is invalid or incorrect."
        });
        let err = parse_articles(&body).unwrap_err();
        assert!(err.to_string().contains("apiKeyInvalid"));
        assert!(!err.is_transient());

        let body = json!({"status": "error", "code": "rateLimited", "message": "slow down"});
        assert!(parse_articles(&body).unwrap_err().is_transient());
    }

    #[test]
    fn test_parse_articles_missing_array() {
        assert!(matches!(
            parse_articles(&json!({"status": "ok"})),
            Err(DataError::MissingField { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_count_skips_request() {
        let client = NewsApiClient::new(reqwest::Client::new(), "http://127.0.0.1:1", None);
        assert!(client.fetch_news("bitcoin", 0).await.unwrap().is_empty());
    }
}
