//! Current-weather lookups against an OpenWeather-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;

/// Temperature and humidity of one city at lookup time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub temperature_celsius: f64,
    pub humidity: f64,
}

/// Source of per-city readings.
/// `Ok(None)` means the provider answered without usable data for the city.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city_id: u64) -> Result<Option<Reading>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainBlock,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("wjob/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, city_id: u64) -> Result<Option<Reading>, ProviderError> {
        debug!("fetching current weather for city {}", city_id);
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("id", city_id.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        parse_reading(&body)
    }
}

/// parse a current-weather body, empty or falsy payloads carry no data
pub fn parse_reading(body: &str) -> Result<Option<Reading>, ProviderError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("invalid json: {}", e)))?;
    if is_falsy(&value) {
        return Ok(None);
    }
    let weather: CurrentWeather = serde_json::from_value(value)
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;
    Ok(Some(Reading {
        temperature_celsius: weather.main.temp,
        humidity: weather.main.humidity,
    }))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}
