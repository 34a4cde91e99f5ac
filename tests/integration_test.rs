use std::collections::HashMap;
use std::fs;

use marketpulse::config::{Config, FileConfig};
use marketpulse::data::{Asset, AssetKind, DataError};
use tempfile::TempDir;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_config_file_and_env_precedence() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "news_api_key": "file-news-key",
            "twelve_data_api_key": "file-twelve-key",
            "coingecko_url": "http://localhost:9000/api/v3/",
            "timeout_seconds": 30
        }"#,
    )
    .unwrap();

    let file = FileConfig::read(&path).unwrap().expect("config file should exist");
    let config = Config::resolve(
        &file,
        env_from(&[("NEWS_API_KEY", "env-news-key"), ("TWELVE_DATA_API_KEY", "   ")]),
    )
    .unwrap();

    // env beats file, blank env falls through to file
    assert_eq!(config.apis.news_api_key.as_deref(), Some("env-news-key"));
    assert_eq!(config.apis.twelve_data_api_key.as_deref(), Some("file-twelve-key"));
    assert_eq!(config.apis.alpha_vantage_api_key, None);

    assert_eq!(config.endpoints.coingecko_url, "http://localhost:9000/api/v3/");
    assert_eq!(config.endpoints.news_api_url, "https://newsapi.org/v2");
    assert_eq!(config.http.timeout_seconds, 30);
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    assert!(FileConfig::read(&path).unwrap().is_none());

    let config = Config::resolve(&FileConfig::default(), env_from(&[])).unwrap();
    assert_eq!(config.http.timeout_seconds, 10);
    assert!(config.apis.news_api_key.is_none());
    assert!(config.http.user_agent.starts_with("marketpulse/"));
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ \"news_api_key\": ").unwrap();

    let err = FileConfig::read(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid JSON"));
}

#[test]
fn test_invalid_timeout_is_rejected() {
    let err = Config::resolve(&FileConfig::default(), env_from(&[("HTTP_TIMEOUT_SECONDS", "soon")]))
        .unwrap_err();
    assert!(err.to_string().contains("HTTP_TIMEOUT_SECONDS"));

    assert!(Config::resolve(&FileConfig::default(), env_from(&[("HTTP_TIMEOUT_SECONDS", "0")])).is_err());
}

#[test]
fn test_catalog_and_ad_hoc_assets() {
    let catalog = Asset::catalog();
    let ids: Vec<&str> = catalog.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["bitcoin", "ethereum", "RELIANCE.NS", "TATASTEEL.NS"]);

    assert_eq!(Asset::resolve("solana", None).unwrap().kind, AssetKind::Crypto);
    assert_eq!(Asset::resolve("INFY.NS", None).unwrap().kind, AssetKind::Stock);
    assert_eq!(
        Asset::resolve("AAPL", Some(AssetKind::Stock)).unwrap().kind,
        AssetKind::Stock
    );

    assert!(matches!(
        Asset::resolve("", None),
        Err(DataError::Validation { .. })
    ));
}
