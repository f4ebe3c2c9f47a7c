use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, instrument, Instrument};
use wjob_data::{JobStatus, StatusResponse, WeatherRecord};

use crate::{
    error::StoreError,
    fetcher::BatchFetcher,
    registry::JobRegistry,
    store::WeatherStore,
    util::record_timestamp,
};

/// Handle to an admitted job's background task.
/// Dropping it detaches the task, the job keeps running.
pub struct JobHandle {
    user_id: i64,
    task: JoinHandle<()>,
}

impl JobHandle {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// wait until the job reached a terminal status
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            error!("job {} supervisor task failed: {}", self.user_id, err);
        }
    }
}

/// Admits weather jobs, runs them in the background and answers status queries.
pub struct JobPool {
    registry: Arc<JobRegistry>,
    store: Arc<WeatherStore>,
    fetcher: Arc<BatchFetcher>,
}

impl JobPool {
    pub fn new(
        registry: Arc<JobRegistry>,
        store: Arc<WeatherStore>,
        fetcher: Arc<BatchFetcher>,
    ) -> Self {
        Self {
            registry,
            store,
            fetcher,
        }
    }

    /// build a pool whose registry knows every job already in `store`
    /// creates the store if it does not exist, a corrupted store is an error
    #[instrument(skip_all, fields(path = %store.path().display()))]
    pub async fn recover(
        store: Arc<WeatherStore>,
        fetcher: Arc<BatchFetcher>,
    ) -> Result<Self, StoreError> {
        let registry = Arc::new(JobRegistry::new());
        match store.load().await? {
            Some(records) => {
                for record in &records {
                    registry.insert_completed(record.user_id).await;
                }
                info!("recovered {} completed jobs", records.len());
            }
            None => {
                info!("no store found, initializing an empty one");
                store.initialize_empty().await?;
            }
        }
        Ok(Self::new(registry, store, fetcher))
    }

    /// admit and start a job for `user_id`
    /// returns None without touching anything if the id was seen before,
    /// the job runs on its own task and this returns right after scheduling it
    #[instrument(skip(self))]
    pub async fn submit(&self, user_id: i64) -> Option<JobHandle> {
        if !self.registry.try_admit(user_id).await {
            info!("rejecting duplicated job");
            return None;
        }
        info!("job admitted, spawning");
        let registry = self.registry.clone();
        let store = self.store.clone();
        let fetcher = self.fetcher.clone();
        let task = tokio::spawn(supervise(user_id, registry, store, fetcher).in_current_span());
        Some(JobHandle { user_id, task })
    }

    pub async fn status(&self, user_id: i64) -> StatusResponse {
        let (status, progress) = self.registry.get(user_id).await;
        StatusResponse {
            user_id,
            status,
            progress,
        }
    }

    pub async fn records(&self) -> Result<Vec<WeatherRecord>, StoreError> {
        self.store.records().await
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }
}

/// run the job on a nested task so a panic still ends in a terminal status
async fn supervise(
    user_id: i64,
    registry: Arc<JobRegistry>,
    store: Arc<WeatherStore>,
    fetcher: Arc<BatchFetcher>,
) {
    let run = tokio::spawn(run_job(user_id, registry.clone(), store, fetcher).in_current_span());
    if let Err(join_error) = run.await {
        error!("job {} aborted: {}", user_id, join_error);
        registry.set_status(user_id, JobStatus::Failed).await;
    }
}

async fn run_job(
    user_id: i64,
    registry: Arc<JobRegistry>,
    store: Arc<WeatherStore>,
    fetcher: Arc<BatchFetcher>,
) {
    registry.set_status(user_id, JobStatus::Running).await;
    let outcome = fetcher.fetch(&registry, user_id).await;
    let record = WeatherRecord {
        user_id,
        datetime: record_timestamp(outcome.started_at),
        weather_data: outcome.results,
    };
    match store.append(record).await {
        Ok(()) => {
            registry.set_status(user_id, JobStatus::Completed).await;
            info!("job {} completed", user_id);
        }
        Err(err) => {
            error!("job {} could not store its result: {}", user_id, err);
            registry.set_status(user_id, JobStatus::Failed).await;
        }
    }
}
