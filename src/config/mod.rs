use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::data::crypto::COINGECKO_API_URL;
use crate::data::news::NEWS_API_URL;
use crate::data::stock::{ALPHA_VANTAGE_API_URL, TWELVE_DATA_API_URL};
use crate::data::{DEFAULT_TIMEOUT_SECONDS, DEFAULT_USER_AGENT};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";
pub const CONFIG_PATH_ENV: &str = "MARKETPULSE_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub apis: ApiConfig,
    pub endpoints: EndpointConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub news_api_key: Option<String>,
    pub twelve_data_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub coingecko_url: String,
    pub twelve_data_url: String,
    pub alpha_vantage_url: String,
    pub news_api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// The JSON config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub news_api_key: Option<String>,
    pub twelve_data_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub coingecko_url: Option<String>,
    pub twelve_data_url: Option<String>,
    pub alpha_vantage_url: Option<String>,
    pub news_api_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

impl FileConfig {
    /// Read and parse `path`. A missing file is `Ok(None)`; a malformed one is an error.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            tracing::debug!("No config file at {}", path.display());
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in config file {}", path.display()))?;

        Ok(Some(file))
    }
}

impl Config {
    /// Resolve settings from the process environment (after `.env`), then the
    /// config file, then built-in defaults.
    ///
    /// The file is `path` if given, else `$MARKETPULSE_CONFIG`, else
    /// `config/config.json`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // Load .env file - this sets env vars that aren't already set
        dotenv::dotenv().ok();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let file = FileConfig::read(&path)?.unwrap_or_default();
        Self::resolve(&file, |key| env::var(key).ok())
    }

    /// Merge `file` with an environment lookup. Environment values win;
    /// blank values on either side count as unset.
    pub fn resolve<F>(file: &FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let pick = |key: &str, file_value: &Option<String>| {
            from_env(key).or_else(|| file_value.clone().filter(|v| !v.trim().is_empty()))
        };

        let timeout_seconds = match from_env("HTTP_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse()
                .context("Invalid HTTP_TIMEOUT_SECONDS value")?,
            None => file.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        };
        if timeout_seconds == 0 {
            bail!("HTTP timeout must be at least 1 second");
        }

        let config = Config {
            apis: ApiConfig {
                news_api_key: pick("NEWS_API_KEY", &file.news_api_key),
                twelve_data_api_key: pick("TWELVE_DATA_API_KEY", &file.twelve_data_api_key),
                alpha_vantage_api_key: pick("ALPHA_VANTAGE_API_KEY", &file.alpha_vantage_api_key),
            },
            endpoints: EndpointConfig {
                coingecko_url: pick("COINGECKO_API_URL", &file.coingecko_url)
                    .unwrap_or_else(|| COINGECKO_API_URL.to_string()),
                twelve_data_url: pick("TWELVE_DATA_API_URL", &file.twelve_data_url)
                    .unwrap_or_else(|| TWELVE_DATA_API_URL.to_string()),
                alpha_vantage_url: pick("ALPHA_VANTAGE_API_URL", &file.alpha_vantage_url)
                    .unwrap_or_else(|| ALPHA_VANTAGE_API_URL.to_string()),
                news_api_url: pick("NEWS_API_URL", &file.news_api_url)
                    .unwrap_or_else(|| NEWS_API_URL.to_string()),
            },
            http: HttpConfig {
                timeout_seconds,
                user_agent: pick("MARKETPULSE_USER_AGENT", &file.user_agent)
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
        };

        tracing::debug!(
            news_api_key = config.apis.news_api_key.is_some(),
            twelve_data_api_key = config.apis.twelve_data_api_key.is_some(),
            alpha_vantage_api_key = config.apis.alpha_vantage_api_key.is_some(),
            timeout_seconds = config.http.timeout_seconds,
            "Configuration resolved"
        );

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apis: ApiConfig::default(),
            endpoints: EndpointConfig {
                coingecko_url: COINGECKO_API_URL.to_string(),
                twelve_data_url: TWELVE_DATA_API_URL.to_string(),
                alpha_vantage_url: ALPHA_VANTAGE_API_URL.to_string(),
                news_api_url: NEWS_API_URL.to_string(),
            },
            http: HttpConfig {
                timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
        }
    }
}
