//! Background weather jobs: admission, rate-limited fetching, progress tracking
//! and an append-only result store.

pub mod batch;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod job_pool;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod store;
pub mod util;

use std::sync::Arc;

pub use config::{load_config, ServiceConfig};
pub use error::{ConfigError, ProviderError, StoreError};
pub use job_pool::{JobHandle, JobPool};
pub use wjob_data::{CityWeather, JobStatus, StatusResponse, SubmitResponse, WeatherRecord};

use fetcher::BatchFetcher;
use provider::{OpenWeatherClient, WeatherProvider};
use store::WeatherStore;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("could not build weather client: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// wire up a pool from `config` with the given provider and recover earlier jobs
pub async fn start_pool_with(
    config: &ServiceConfig,
    provider: Arc<dyn WeatherProvider>,
) -> Result<JobPool, StoreError> {
    let fetcher = Arc::new(BatchFetcher::new(
        provider,
        config.city_ids.clone(),
        config.rate_limit(),
        config.retry(),
    ));
    let store = Arc::new(WeatherStore::new(config.data_file.clone()));
    JobPool::recover(store, fetcher).await
}

/// wire up a pool talking to the configured OpenWeather endpoint
pub async fn start_pool(config: &ServiceConfig) -> Result<JobPool, StartupError> {
    let provider = OpenWeatherClient::new(
        &config.provider_url,
        &config.api_key,
        config.request_timeout(),
    )?;
    Ok(start_pool_with(config, Arc::new(provider)).await?)
}
