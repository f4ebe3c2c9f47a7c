use std::{thread, time::Duration};

use reqwest::blocking::Client;
use wjob_data::{StatusResponse, SubmitResponse, WeatherRecord};

pub fn submit(http_client: &Client, url: &str, user_id: i64) -> reqwest::Result<String> {
    let response: SubmitResponse = http_client
        .post(format!("{}/get_weather_data/{}", url, user_id))
        .send()?
        .error_for_status()?
        .json()?;
    Ok(format!("{}: {}", response.user_id, response.status))
}

pub fn fetch_status(
    http_client: &Client,
    url: &str,
    user_id: i64,
) -> reqwest::Result<StatusResponse> {
    http_client
        .get(format!("{}/get_weather_data_status/{}", url, user_id))
        .send()?
        .error_for_status()?
        .json()
}

pub fn status(http_client: &Client, url: &str, user_id: i64) -> reqwest::Result<String> {
    fetch_status(http_client, url, user_id).map(|status| format_status(&status))
}

/// poll the status until the job is completed or failed
pub fn watch(
    http_client: &Client,
    url: &str,
    user_id: i64,
    interval: Duration,
) -> reqwest::Result<String> {
    loop {
        let status = fetch_status(http_client, url, user_id)?;
        match status.status {
            Some(job_status) if !job_status.is_terminal() => {
                println!("{}", format_status(&status));
                thread::sleep(interval);
            }
            _ => return Ok(format_status(&status)),
        }
    }
}

pub fn records(http_client: &Client, url: &str) -> reqwest::Result<String> {
    let records: Vec<WeatherRecord> = http_client
        .get(format!("{}/weather_data", url))
        .send()?
        .error_for_status()?
        .json()?;
    let lines: Vec<String> = records
        .iter()
        .map(|record| {
            format!(
                "{} at {}: {} cities",
                record.user_id,
                record.datetime,
                record.weather_data.len()
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

fn format_status(status: &StatusResponse) -> String {
    match (status.status, status.progress) {
        (Some(job_status), Some(progress)) => {
            format!("{}: {:?} {:.1}%", status.user_id, job_status, progress)
        }
        (Some(job_status), None) => format!("{}: {:?}", status.user_id, job_status),
        (None, _) => format!("{}: job not found", status.user_id),
    }
}

#[cfg(test)]
mod test {
    use wjob_data::{JobStatus, StatusResponse};

    use super::format_status;

    #[test]
    fn test_format_status() {
        let running = StatusResponse {
            user_id: 3,
            status: Some(JobStatus::Running),
            progress: Some(100.0 / 3.0),
        };
        assert_eq!("3: Running 33.3%", format_status(&running));
        let unknown = StatusResponse {
            user_id: -3,
            status: None,
            progress: None,
        };
        assert_eq!("-3: job not found", format_status(&unknown));
    }
}
