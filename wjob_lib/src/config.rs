//! Service configuration, read once at startup.
//!
//! Sources in increasing priority: built-in defaults, an optional TOML file
//! (`WJOB_CONFIG`, default `wjob.toml`), then environment variables. A `.env`
//! file is loaded into the environment first if one is found.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::debug;

use crate::{batch::RateLimit, error::ConfigError, retry::RetryConfig};

pub const DEFAULT_PROVIDER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_CONFIG_FILE: &str = "wjob.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub provider_url: String,
    pub api_key: String,
    /// ordered city ids every job fetches
    pub city_ids: Vec<u64>,
    /// batch size, at most this many lookups start per rolling minute
    pub max_cities_per_minute: usize,
    /// how often a job checks whether its rate window has elapsed
    pub wait_interval_secs: f64,
    pub data_file: PathBuf,
    pub request_timeout_secs: u64,
    /// extra attempts per city on transient provider errors
    pub max_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            api_key: String::new(),
            city_ids: Vec::new(),
            max_cities_per_minute: 60,
            wait_interval_secs: 1.0,
            data_file: PathBuf::from("weather_data.json"),
            request_timeout_secs: 10,
            max_retries: 0,
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// apply overrides from a variable lookup, usually the process environment
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut issues = Vec::new();

        if let Some(url) = lookup("OPENWEATHER_API_URL") {
            self.provider_url = url;
        }
        if let Some(key) = lookup("OPENWEATHER_API_KEY") {
            self.api_key = key;
        }
        if let Some(raw) = lookup("CITIES_IDS") {
            match parse_city_ids(&raw) {
                Ok(ids) => self.city_ids = ids,
                Err(issue) => issues.push(issue),
            }
        }
        if let Some(raw) = lookup("MAX_CITIES_PER_MINUTE") {
            match raw.trim().parse() {
                Ok(max) => self.max_cities_per_minute = max,
                Err(_) => issues.push("MAX_CITIES_PER_MINUTE must be an integer".to_string()),
            }
        }
        if let Some(raw) = lookup("DEFAULT_WAIT_INTERVAL") {
            match raw.trim().parse() {
                Ok(secs) => self.wait_interval_secs = secs,
                Err(_) => {
                    issues.push("DEFAULT_WAIT_INTERVAL must be a number of seconds".to_string())
                }
            }
        }
        if let Some(path) = lookup("JSON_FILE_NAME") {
            self.data_file = PathBuf::from(path);
        }
        if let Some(raw) = lookup("WJOB_MAX_RETRIES") {
            match raw.trim().parse() {
                Ok(retries) => self.max_retries = retries,
                Err(_) => issues.push("WJOB_MAX_RETRIES must be an integer".to_string()),
            }
        }
        if let Some(raw) = lookup("WJOB_REQUEST_TIMEOUT_SECS") {
            match raw.trim().parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => {
                    issues.push("WJOB_REQUEST_TIMEOUT_SECS must be an integer".to_string())
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();
        if self.api_key.trim().is_empty() {
            issues.push("OPENWEATHER_API_KEY is required".to_string());
        }
        if self.provider_url.trim().is_empty() {
            issues.push("provider url must not be empty".to_string());
        }
        if self.city_ids.is_empty() {
            issues.push("city id list must contain at least one city".to_string());
        }
        if self.max_cities_per_minute == 0 {
            issues.push("max cities per minute must be > 0".to_string());
        }
        match Duration::try_from_secs_f64(self.wait_interval_secs) {
            Ok(interval) if !interval.is_zero() => {}
            _ => issues.push(format!(
                "wait interval must be a positive number of seconds, got {}",
                self.wait_interval_secs
            )),
        }
        if self.request_timeout_secs == 0 {
            issues.push("request timeout must be > 0 seconds".to_string());
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    pub fn rate_limit(&self) -> RateLimit {
        let poll_interval = Duration::try_from_secs_f64(self.wait_interval_secs)
            .unwrap_or_else(|_| Duration::from_secs(1));
        RateLimit::per_minute(self.max_cities_per_minute, poll_interval)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            ..RetryConfig::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_city_ids(raw: &str) -> Result<Vec<u64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u64>()
                .map_err(|_| format!("CITIES_IDS contains an invalid city id: {:?}", id))
        })
        .collect()
}

/// load the configuration from `.env`, the optional TOML file and the environment
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    if let Err(e) = dotenvy::dotenv() {
        debug!("no .env file loaded: {}", e);
    }

    let path = std::env::var("WJOB_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let path = Path::new(&path);
    let mut config = if path.exists() {
        debug!("reading config file {}", path.display());
        ServiceConfig::from_toml_file(path)?
    } else {
        ServiceConfig::default()
    };

    config.apply_env(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}
