use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::data::{Asset, AssetKind, PricePoint, SentimentLabel, SentimentReport};
use crate::orchestrator::{Dashboard, FetchStage, Snapshot, SnapshotOptions};

/// Headlines shown in text output
const HEADLINES_SHOWN: usize = 5;

fn resolve_asset(id: &str, kind: Option<AssetKind>) -> Result<Asset> {
    Asset::resolve(id, kind).with_context(|| format!("Unknown or invalid asset '{}'", id))
}

fn dashboard(config: &Config) -> Result<Dashboard> {
    Dashboard::from_config(config).context("Failed to build HTTP clients")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) => format!("${:.2}", p),
        None => "N/A".to_string(),
    }
}

/// List the built-in assets
pub fn assets(json: bool) -> Result<()> {
    let catalog = Asset::catalog();
    if json {
        return print_json(&catalog);
    }

    println!("🔎 Available assets:");
    for asset in catalog {
        println!("   {:<14} {:<7} {}", asset.id, asset.kind, asset.name);
    }
    Ok(())
}

/// Run the dashboard update sequence for one asset
pub async fn snapshot(
    config: &Config,
    asset_id: &str,
    kind: Option<AssetKind>,
    days: u32,
    count: usize,
    json: bool,
) -> Result<()> {
    let asset = resolve_asset(asset_id, kind)?;
    let dashboard = dashboard(config)?;
    let options = SnapshotOptions {
        history_days: days,
        news_count: count,
    };

    let snapshot = dashboard.refresh(&asset, &options).await;

    if json {
        return print_json(&snapshot);
    }

    print_snapshot(&snapshot, days);
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot, days: u32) {
    let sentiment = &snapshot.sentiment;

    println!("\n📊 {} [{}]", snapshot.asset.name, snapshot.asset.kind);
    println!("   💰 Current Price:   {}", format_price(snapshot.price));
    println!("   📰 News Articles:   {}", snapshot.headlines.len());
    println!(
        "   😊 Sentiment Score: {:.2} ({}, delta {:+.1})",
        sentiment.average,
        sentiment.overall(),
        sentiment.average * 100.0
    );

    if !snapshot.headlines.is_empty() {
        println!("\n📰 Latest News Headlines");
        for (i, text) in snapshot.headlines.iter().take(HEADLINES_SHOWN).enumerate() {
            println!("   {}. {}", i + 1, text);
        }
    }

    if !snapshot.history.is_empty() {
        println!("\n📈 Price (last {} days)", days);
        print_history_summary(&snapshot.history);
    }

    if !sentiment.is_empty() {
        println!("\n🥧 News Sentiment Distribution");
        print_breakdown(sentiment);
    }

    if !snapshot.is_complete() {
        println!("\n⚠️  Unavailable:");
        for stage in [FetchStage::Price, FetchStage::News, FetchStage::History] {
            if let Some(failure) = snapshot.failure(stage) {
                let hint = if failure.transient { " (temporary, try again)" } else { "" };
                println!("   {}: {}{}", failure.stage, failure.message, hint);
            }
        }
    } else {
        println!("\n✅ Data updated successfully!");
    }
}

fn print_history_summary(history: &[PricePoint]) {
    let (first, last) = match (history.first(), history.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return,
    };

    let low = history.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
    let high = history.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);

    println!(
        "   {} points, {} → {}",
        history.len(),
        first.timestamp.format("%Y-%m-%d %H:%M"),
        last.timestamp.format("%Y-%m-%d %H:%M")
    );
    println!("   Open {:.2}  Last {:.2}  Low {:.2}  High {:.2}", first.price, last.price, low, high);
    if first.price > 0.0 {
        println!("   Change {:+.2}%", (last.price - first.price) / first.price * 100.0);
    }
}

fn print_breakdown(report: &SentimentReport) {
    let breakdown = report.breakdown();
    for label in [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ] {
        println!(
            "   {:<9} {:>3} ({:.1}%)",
            label.to_string(),
            breakdown.count(label),
            breakdown.share(label) * 100.0
        );
    }
}

/// Fetch the current price of an asset
pub async fn price(config: &Config, asset_id: &str, kind: Option<AssetKind>, json: bool) -> Result<()> {
    let asset = resolve_asset(asset_id, kind)?;
    let dashboard = dashboard(config)?;

    let result = dashboard.price(&asset).await;

    if json {
        return print_json(&serde_json::json!({
            "asset": asset,
            "price": result.as_ref().ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        }));
    }

    match result {
        Ok(p) => println!("💰 {}: {}", asset.name, format_price(Some(p))),
        Err(e) => println!("💰 {}: N/A ({})", asset.name, e),
    }
    Ok(())
}

/// Fetch and print a price series
pub async fn history(
    config: &Config,
    asset_id: &str,
    kind: Option<AssetKind>,
    days: u32,
    json: bool,
) -> Result<()> {
    let asset = resolve_asset(asset_id, kind)?;
    let dashboard = dashboard(config)?;

    let result = dashboard.history(&asset, days).await;

    if json {
        return print_json(&serde_json::json!({
            "asset": asset,
            "history": result.as_ref().ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        }));
    }

    match result {
        Ok(points) if points.is_empty() => println!("📈 {}: no data", asset.name),
        Ok(points) => {
            info!("Printing {} price points", points.len());
            println!("📈 {} (last {} days)", asset.name, days);
            for point in &points {
                println!("   {}  {:>14.2}", point.timestamp.format("%Y-%m-%d %H:%M"), point.price);
            }
        }
        Err(e) => println!("📈 {}: no data ({})", asset.name, e),
    }
    Ok(())
}

/// Fetch recent articles and score them
pub async fn news(config: &Config, asset_id: &str, count: usize, json: bool) -> Result<()> {
    let asset = resolve_asset(asset_id, None)?;
    let dashboard = dashboard(config)?;

    let articles = match dashboard.articles(&asset, count).await {
        Ok(articles) => articles,
        Err(e) => {
            if json {
                return print_json(&serde_json::json!({ "asset": asset, "articles": [], "error": e.to_string() }));
            }
            println!("📰 {}: no news ({})", asset.name, e);
            return Ok(());
        }
    };

    let headlines: Vec<String> = articles.iter().map(|a| a.headline()).collect();
    let report = dashboard.score(&headlines);

    if json {
        return print_json(&serde_json::json!({
            "asset": asset,
            "articles": articles,
            "sentiment": report,
        }));
    }

    println!("📰 {} news ({} articles)", asset.name, articles.len());
    for ((article, label), i) in articles.iter().zip(&report.labels).zip(1..) {
        println!(
            "   {}. [{}] {} ({}{})",
            i,
            label,
            article.title,
            article.source,
            article
                .published_at
                .as_deref()
                .map(|t| format!(", {}", t))
                .unwrap_or_default()
        );
    }
    println!("   Average sentiment: {:.2} ({})", report.average, report.overall());
    Ok(())
}

/// Score texts given on the command line
pub fn sentiment(texts: &[String], json: bool) -> Result<()> {
    let scorer = crate::data::VaderScorer::new();
    let report = crate::data::sentiment::aggregate(&scorer, texts);

    if json {
        return print_json(&report);
    }

    println!("😊 Sentiment Score: {:.4} ({})", report.average, report.overall());
    for (text, label) in texts.iter().zip(&report.labels) {
        println!("   {:<9} {}", label.to_string(), text);
    }
    print_breakdown(&report);
    Ok(())
}
