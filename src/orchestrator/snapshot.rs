//! One dashboard update: price → news → sentiment → history, in that order.
//! Each fetch failure is recorded next to the data instead of aborting the update.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::data::sentiment::aggregate;
use crate::data::{
    build_http_client, AlphaVantageClient, Asset, AssetKind, CoinGeckoClient, DataError,
    DataResult, HistorySource, NewsApiClient, NewsArticle, NewsSource, PriceFallback, PricePoint,
    PriceSource, SentimentReport, SentimentScorer, TwelveDataClient, VaderScorer,
    DEFAULT_HISTORY_DAYS, DEFAULT_NEWS_COUNT,
};

/// Upstream sources, one per asset kind and data type
pub struct DataSources {
    pub crypto_prices: Arc<dyn PriceSource>,
    pub crypto_history: Arc<dyn HistorySource>,
    pub stock_prices: Arc<dyn PriceSource>,
    pub stock_history: Arc<dyn HistorySource>,
    pub news: Arc<dyn NewsSource>,
}

impl DataSources {
    /// CoinGecko for crypto, Twelve Data with Alpha Vantage fallback for stock
    /// quotes, Twelve Data for stock history, NewsAPI for headlines
    pub fn from_config(config: &Config) -> DataResult<Self> {
        let http = build_http_client(config.http.timeout_seconds, &config.http.user_agent)?;

        let coingecko = Arc::new(CoinGeckoClient::new(
            http.clone(),
            &config.endpoints.coingecko_url,
        ));
        let twelve_data = Arc::new(TwelveDataClient::new(
            http.clone(),
            &config.endpoints.twelve_data_url,
            config.apis.twelve_data_api_key.clone(),
        ));
        let alpha_vantage = Arc::new(AlphaVantageClient::new(
            http.clone(),
            &config.endpoints.alpha_vantage_url,
            config.apis.alpha_vantage_api_key.clone(),
        ));
        let news = Arc::new(NewsApiClient::new(
            http,
            &config.endpoints.news_api_url,
            config.apis.news_api_key.clone(),
        ));

        Ok(Self {
            crypto_prices: coingecko.clone(),
            crypto_history: coingecko,
            stock_prices: Arc::new(PriceFallback::new(twelve_data.clone(), alpha_vantage)),
            stock_history: twelve_data,
            news,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStage {
    Price,
    News,
    History,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Price => write!(f, "price"),
            FetchStage::News => write!(f, "news"),
            FetchStage::History => write!(f, "history"),
        }
    }
}

/// Why one stage of an update produced no data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    pub stage: FetchStage,
    pub message: String,
    pub transient: bool,
}

impl FetchFailure {
    fn new(stage: FetchStage, asset: &Asset, error: &DataError) -> Self {
        warn!(asset = %asset.id, stage = %stage, transient = error.is_transient(), "Fetch failed: {}", error);
        Self {
            stage,
            message: error.to_string(),
            transient: error.is_transient(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SnapshotOptions {
    pub history_days: u32,
    pub news_count: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            history_days: DEFAULT_HISTORY_DAYS,
            news_count: DEFAULT_NEWS_COUNT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub asset: Asset,
    /// `None` when every price source failed
    pub price: Option<f64>,
    pub headlines: Vec<String>,
    pub sentiment: SentimentReport,
    pub history: Vec<PricePoint>,
    pub failures: Vec<FetchFailure>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn failure(&self, stage: FetchStage) -> Option<&FetchFailure> {
        self.failures.iter().find(|f| f.stage == stage)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Dashboard {
    sources: DataSources,
    scorer: Box<dyn SentimentScorer>,
}

impl Dashboard {
    pub fn new(sources: DataSources, scorer: Box<dyn SentimentScorer>) -> Self {
        Self { sources, scorer }
    }

    /// Live sources from `config`, VADER for scoring
    pub fn from_config(config: &Config) -> DataResult<Self> {
        let sources = DataSources::from_config(config)?;
        Ok(Self::new(sources, Box::new(VaderScorer::new())))
    }

    pub async fn price(&self, asset: &Asset) -> DataResult<f64> {
        match asset.kind {
            AssetKind::Crypto => self.sources.crypto_prices.fetch_price(&asset.id).await,
            AssetKind::Stock => self.sources.stock_prices.fetch_price(&asset.id).await,
        }
    }

    pub async fn history(&self, asset: &Asset, days: u32) -> DataResult<Vec<PricePoint>> {
        match asset.kind {
            AssetKind::Crypto => self.sources.crypto_history.fetch_history(&asset.id, days).await,
            AssetKind::Stock => self.sources.stock_history.fetch_history(&asset.id, days).await,
        }
    }

    pub async fn articles(&self, asset: &Asset, count: usize) -> DataResult<Vec<NewsArticle>> {
        self.sources.news.fetch_articles(&asset.id, count).await
    }

    pub async fn headlines(&self, asset: &Asset, count: usize) -> DataResult<Vec<String>> {
        self.sources.news.fetch_news(&asset.id, count).await
    }

    pub fn score<T: AsRef<str>>(&self, texts: &[T]) -> SentimentReport {
        aggregate(&*self.scorer, texts)
    }

    /// Run the full update for one asset. Never fails as a whole; missing
    /// pieces are listed in `Snapshot::failures`.
    pub async fn refresh(&self, asset: &Asset, options: &SnapshotOptions) -> Snapshot {
        info!(asset = %asset.id, kind = %asset.kind, "Refreshing snapshot");
        let mut failures = Vec::new();

        let price = match self.price(asset).await {
            Ok(price) => Some(price),
            Err(e) => {
                failures.push(FetchFailure::new(FetchStage::Price, asset, &e));
                None
            }
        };

        let headlines = match self.headlines(asset, options.news_count).await {
            Ok(headlines) => headlines,
            Err(e) => {
                failures.push(FetchFailure::new(FetchStage::News, asset, &e));
                Vec::new()
            }
        };

        let sentiment = self.score(&headlines);

        let history = match self.history(asset, options.history_days).await {
            Ok(history) => history,
            Err(e) => {
                failures.push(FetchFailure::new(FetchStage::History, asset, &e));
                Vec::new()
            }
        };

        info!(
            asset = %asset.id,
            price = ?price,
            headlines = headlines.len(),
            history_points = history.len(),
            failures = failures.len(),
            "Snapshot ready"
        );

        Snapshot {
            asset: asset.clone(),
            price,
            headlines,
            sentiment,
            history,
            failures,
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SnapshotOptions::default();
        assert_eq!(options.history_days, 5);
        assert_eq!(options.news_count, 10);
    }

    #[test]
    fn test_sources_build_from_default_config() {
        assert!(DataSources::from_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_failure_lookup() {
        let snapshot = Snapshot {
            asset: Asset::new("bitcoin", "Bitcoin (BTC)", AssetKind::Crypto),
            price: None,
            headlines: Vec::new(),
            sentiment: SentimentReport::empty(),
            history: Vec::new(),
            failures: vec![FetchFailure {
                stage: FetchStage::Price,
                message: "timeout".to_string(),
                transient: true,
            }],
            fetched_at: Utc::now(),
        };

        assert!(!snapshot.is_complete());
        assert!(snapshot.failure(FetchStage::Price).is_some());
        assert!(snapshot.failure(FetchStage::History).is_none());
    }
}
