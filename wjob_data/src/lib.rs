use serde::{Deserialize, Serialize};

/// Lifecycle of a weather job.
/// Serialized lowercase, which is what the status endpoint reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Started,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    fn rank(self) -> u8 {
        match self {
            JobStatus::Started => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// true if a job currently in `self` may move to `next`.
    /// status only ever moves forward and never leaves a terminal state
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Weather of one city as stored in a record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CityWeather {
    pub city_id: u64,
    pub temperature_celsius: f64,
    pub humidity: f64,
}

/// One completed job's result, one element of the persisted JSON array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub user_id: i64,
    /// fetch start time, `YYYY-MM-DD HH:MM:SS` in UTC
    pub datetime: String,
    pub weather_data: Vec<CityWeather>,
}

pub const STATUS_STARTED: &str = "Started";
pub const STATUS_DUPLICATED: &str = "Not started due to duplicated user_id";

/// Body returned by `POST /get_weather_data/<user_id>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub user_id: i64,
    pub status: String,
}

impl SubmitResponse {
    pub fn new(user_id: i64, accepted: bool) -> Self {
        let status = if accepted {
            STATUS_STARTED
        } else {
            STATUS_DUPLICATED
        };
        Self {
            user_id,
            status: status.to_string(),
        }
    }

    pub fn accepted(&self) -> bool {
        self.status == STATUS_STARTED
    }
}

/// Body returned by `GET /get_weather_data_status/<user_id>`.
/// both fields are null for an id that was never submitted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub user_id: i64,
    pub status: Option<JobStatus>,
    pub progress: Option<f64>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_moves_forward_only() {
        assert!(JobStatus::Started.can_advance_to(JobStatus::Running));
        assert!(JobStatus::Running.can_advance_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_advance_to(JobStatus::Failed));
        assert!(JobStatus::Started.can_advance_to(JobStatus::Failed));
        assert!(!JobStatus::Running.can_advance_to(JobStatus::Started));
        assert!(!JobStatus::Completed.can_advance_to(JobStatus::Started));
        assert!(!JobStatus::Completed.can_advance_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_advance_to(JobStatus::Completed));
    }

    #[test]
    fn test_unknown_status_serializes_null() {
        let response = StatusResponse {
            user_id: -3,
            status: None,
            progress: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            serde_json::json!({"user_id": -3, "status": null, "progress": null}),
            json
        );
    }

    #[test]
    fn test_status_is_lowercase_on_the_wire() {
        let response = StatusResponse {
            user_id: 7,
            status: Some(JobStatus::Completed),
            progress: Some(100.0),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!("completed", json["status"]);
        assert_eq!(100.0, json["progress"]);
    }

    #[test]
    fn test_submit_response_text() {
        assert_eq!("Started", SubmitResponse::new(1, true).status);
        let rejected = SubmitResponse::new(1, false);
        assert_eq!("Not started due to duplicated user_id", rejected.status);
        assert!(!rejected.accepted());
    }
}
