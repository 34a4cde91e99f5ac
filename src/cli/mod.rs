use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::data::{AssetKind, DEFAULT_HISTORY_DAYS, DEFAULT_NEWS_COUNT};

pub mod commands;

#[derive(Parser)]
#[command(
    name = "marketpulse",
    about = "Crypto and stock prices with news sentiment",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path (defaults to $MARKETPULSE_CONFIG or config/config.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the built-in assets
    Assets {
        #[arg(long)]
        json: bool,
    },

    /// Fetch price, headlines, sentiment and price history for one asset
    Snapshot {
        /// Asset id (catalog id, CoinGecko id or exchange symbol)
        #[arg(short, long, default_value = "bitcoin")]
        asset: String,

        /// Asset kind when the id is not in the catalog (crypto or stock)
        #[arg(short, long)]
        kind: Option<AssetKind>,

        /// Days of price history
        #[arg(short, long, default_value_t = DEFAULT_HISTORY_DAYS)]
        days: u32,

        /// Number of headlines to score
        #[arg(short = 'n', long, default_value_t = DEFAULT_NEWS_COUNT)]
        count: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Fetch the current price of an asset
    Price {
        #[arg(short, long, default_value = "bitcoin")]
        asset: String,

        #[arg(short, long)]
        kind: Option<AssetKind>,

        #[arg(long)]
        json: bool,
    },

    /// Fetch daily price history for an asset
    History {
        #[arg(short, long, default_value = "bitcoin")]
        asset: String,

        #[arg(short, long)]
        kind: Option<AssetKind>,

        #[arg(short, long, default_value_t = DEFAULT_HISTORY_DAYS)]
        days: u32,

        #[arg(long)]
        json: bool,
    },

    /// Fetch recent news articles about an asset
    News {
        #[arg(short, long, default_value = "bitcoin")]
        asset: String,

        #[arg(short = 'n', long, default_value_t = DEFAULT_NEWS_COUNT)]
        count: usize,

        #[arg(long)]
        json: bool,
    },

    /// Score arbitrary texts with the sentiment aggregator
    Sentiment {
        /// Texts to score
        #[arg(required = true)]
        texts: Vec<String>,

        #[arg(long)]
        json: bool,
    },
}

/// Execute CLI command with resolved configuration
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Assets { json } => {
            commands::assets(json)?;
        }
        Commands::Snapshot {
            asset,
            kind,
            days,
            count,
            json,
        } => {
            info!("Running snapshot for {}", asset);
            commands::snapshot(&config, &asset, kind, days, count, json).await?;
        }
        Commands::Price { asset, kind, json } => {
            info!("Fetching price for {}", asset);
            commands::price(&config, &asset, kind, json).await?;
        }
        Commands::History {
            asset,
            kind,
            days,
            json,
        } => {
            info!("Fetching {} days of history for {}", days, asset);
            commands::history(&config, &asset, kind, days, json).await?;
        }
        Commands::News { asset, count, json } => {
            info!("Fetching {} news articles for {}", count, asset);
            commands::news(&config, &asset, count, json).await?;
        }
        Commands::Sentiment { texts, json } => {
            info!("Scoring {} texts", texts.len());
            commands::sentiment(&texts, json)?;
        }
    }
    Ok(())
}
