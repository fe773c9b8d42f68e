//! Loads the TOML configuration (source endpoint, analytics, logging) and
//! normalizes it into `AppConfig`.
use std::path::Path;

use serde::Deserialize;
use tokio::fs;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub aggregates_base_url: String,
    pub user_agent: String,
    pub beacon_endpoint: String,
    pub do_not_track: bool,
    pub beacon_queue_depth: usize,
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    source: RawSource,
    #[serde(default)]
    analytics: RawAnalytics,
    #[serde(default)]
    logging: RawLogging,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    base_url: String,
    #[serde(default = "default_user_agent")]
    user_agent: String,
}

#[derive(Debug, Deserialize, Default)]
struct RawAnalytics {
    #[serde(default = "default_beacon_endpoint")]
    endpoint: String,
    #[serde(default)]
    do_not_track: bool,
    #[serde(default = "default_queue_depth")]
    queue_depth: usize,
}

#[derive(Debug, Deserialize, Default)]
struct RawLogging {
    level: Option<String>,
}

fn default_user_agent() -> String {
    "telechart/0.1".to_string()
}

fn default_beacon_endpoint() -> String {
    "https://telemetry.mozilla.org/generic/".to_string()
}

fn default_queue_depth() -> usize {
    16
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub async fn load(path: &Path) -> Result<AppConfig, ConfigError> {
        let text = fs::read_to_string(path).await?;
        let raw: RawFile = toml::from_str(&text)?;
        if raw.source.base_url.is_empty() {
            return Err(ConfigError::Invalid("source.base_url is empty".to_string()));
        }
        if raw.analytics.queue_depth == 0 {
            return Err(ConfigError::Invalid(
                "analytics.queue_depth must be positive".to_string(),
            ));
        }
        Ok(AppConfig {
            aggregates_base_url: raw.source.base_url.trim_end_matches('/').to_string(),
            user_agent: raw.source.user_agent,
            beacon_endpoint: raw.analytics.endpoint,
            do_not_track: raw.analytics.do_not_track,
            beacon_queue_depth: raw.analytics.queue_depth,
            log_level: raw.logging.level.unwrap_or_else(|| "info".to_string()),
        })
    }
}
