use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, warn};
use wjob_data::JobStatus;

/// In-memory status and progress of every job this process knows about.
///
/// Status and progress live behind separate locks. A reader may see them out
/// of step (e.g. completed while progress is still catching up), which is
/// fine for polling clients. Lock order is status before progress.
#[derive(Default)]
pub struct JobRegistry {
    statuses: RwLock<HashMap<i64, JobStatus>>,
    progress: RwLock<HashMap<i64, f64>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// admit a job if the id has never been seen
    /// check and insert happen under the status write lock, so of several
    /// concurrent calls with the same id exactly one returns true
    pub async fn try_admit(&self, user_id: i64) -> bool {
        let mut statuses = self.statuses.write().await;
        if statuses.contains_key(&user_id) {
            return false;
        }
        statuses.insert(user_id, JobStatus::Started);
        self.progress.write().await.insert(user_id, 0.0);
        true
    }

    /// register a job finished in an earlier run
    pub async fn insert_completed(&self, user_id: i64) {
        let mut statuses = self.statuses.write().await;
        statuses.insert(user_id, JobStatus::Completed);
        self.progress.write().await.insert(user_id, 100.0);
    }

    /// move a job forward, returns false if the id is unknown or the
    /// transition would go backwards
    pub async fn set_status(&self, user_id: i64, status: JobStatus) -> bool {
        let mut statuses = self.statuses.write().await;
        match statuses.get_mut(&user_id) {
            Some(current) if current.can_advance_to(status) => {
                debug!("job {} {:?} -> {:?}", user_id, current, status);
                *current = status;
                true
            }
            Some(current) => {
                warn!(
                    "ignoring status change of job {} from {:?} to {:?}",
                    user_id, current, status
                );
                false
            }
            None => {
                warn!("status change for unknown job {}", user_id);
                false
            }
        }
    }

    /// record progress in percent, values are clamped to [0, 100] and never
    /// lower what was already reported
    pub async fn set_progress(&self, user_id: i64, value: f64) {
        let value = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 100.0)
        };
        let mut progress = self.progress.write().await;
        match progress.get_mut(&user_id) {
            Some(current) => *current = current.max(value),
            None => warn!("progress update for unknown job {}", user_id),
        }
    }

    pub async fn status(&self, user_id: i64) -> Option<JobStatus> {
        self.statuses.read().await.get(&user_id).copied()
    }

    pub async fn progress(&self, user_id: i64) -> Option<f64> {
        self.progress.read().await.get(&user_id).copied()
    }

    /// status and progress, read one after the other
    pub async fn get(&self, user_id: i64) -> (Option<JobStatus>, Option<f64>) {
        let status = self.status(user_id).await;
        let progress = self.progress(user_id).await;
        (status, progress)
    }

    pub async fn len(&self) -> usize {
        self.statuses.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.statuses.read().await.is_empty()
    }
}
