// MarketPulse - crypto and equity prices with news sentiment
// Fetches quotes, price history and headlines from public market APIs and
// summarises headline sentiment with a lexicon model.

#![deny(clippy::unwrap_used)]

pub mod cli;
pub mod config;
pub mod data;
pub mod orchestrator;

// Re-export commonly used items
pub use config::Config;
pub use data::{Asset, AssetKind, DataError, DataResult, PricePoint, SentimentLabel, SentimentReport};
pub use orchestrator::{Dashboard, Snapshot};
