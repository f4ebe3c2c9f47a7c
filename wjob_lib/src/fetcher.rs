//! Fetches the configured cities batch by batch under the provider's rate limit.
//!
//! The city list is cut into batches of at most `max_per_window` ids and looked
//! up one city after another. Every request, retries included, takes a slot in
//! the job's rolling rate window, so the next batch starts once the window of
//! the previous one has elapsed and a retry may have to wait for a slot too.
//! Nothing waits after the last batch. Progress is reported to the registry
//! after every stored reading.
//!
//! A city without data, or whose lookup still fails after the configured
//! retries, is skipped: it is logged, not counted and the job carries on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use wjob_data::CityWeather;

use crate::{
    batch::{partition, RateLimit},
    provider::WeatherProvider,
    registry::JobRegistry,
    retry::{with_retry, RetryConfig},
    util::progress_percent,
};

#[derive(Clone, Debug, PartialEq)]
pub struct FetchOutcome {
    pub started_at: DateTime<Utc>,
    pub results: Vec<CityWeather>,
    /// cities dropped for lack of data or after errors
    pub skipped: usize,
}

pub struct BatchFetcher {
    provider: Arc<dyn WeatherProvider>,
    city_ids: Vec<u64>,
    limit: RateLimit,
    retry: RetryConfig,
}

impl BatchFetcher {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        city_ids: Vec<u64>,
        limit: RateLimit,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            city_ids,
            limit,
            retry,
        }
    }

    pub fn city_ids(&self) -> &[u64] {
        &self.city_ids
    }

    /// fetch every configured city for `user_id`, reporting progress to `registry`
    pub async fn fetch(&self, registry: &JobRegistry, user_id: i64) -> FetchOutcome {
        let started_at = Utc::now();
        let total = self.city_ids.len();
        let batches = partition(&self.city_ids, self.limit.max_per_window);
        let batch_count = batches.len();
        let mut results = Vec::with_capacity(total);
        let mut skipped = 0;

        let window = &self.limit.start_window();
        let provider = &self.provider;

        for (index, batch) in batches.into_iter().enumerate() {
            debug!(
                "job {} batch {}/{} with {} cities",
                user_id,
                index + 1,
                batch_count,
                batch.len()
            );
            for &city_id in batch {
                let lookup = with_retry(&self.retry, || async move {
                    window.acquire().await;
                    provider.current(city_id).await
                })
                .await;
                match lookup {
                    Ok(Some(reading)) => {
                        results.push(CityWeather {
                            city_id,
                            temperature_celsius: reading.temperature_celsius,
                            humidity: reading.humidity,
                        });
                        registry
                            .set_progress(user_id, progress_percent(results.len(), total))
                            .await;
                    }
                    Ok(None) => {
                        debug!("job {} no data for city {}, skipping", user_id, city_id);
                        skipped += 1;
                    }
                    Err(err) => {
                        warn!(
                            "job {} lookup of city {} failed, skipping: {}",
                            user_id, city_id, err
                        );
                        skipped += 1;
                    }
                }
            }

            if results.len() == total || index + 1 == batch_count {
                break;
            }
        }

        info!(
            "job {} fetched {} of {} cities, {} skipped",
            user_id,
            results.len(),
            total,
            skipped
        );
        FetchOutcome {
            started_at,
            results,
            skipped,
        }
    }
}
