//! OpenWeatherClient against a mock HTTP server.

use std::{sync::Arc, time::Duration};

use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wjob_lib::{
    provider::{OpenWeatherClient, WeatherProvider},
    start_pool_with, JobStatus, ProviderError, ServiceConfig,
};

const WEATHER_PATH: &str = "/data/2.5/weather";

fn client(server: &MockServer) -> OpenWeatherClient {
    OpenWeatherClient::new(
        &format!("{}{}", server.uri(), WEATHER_PATH),
        "test-key",
        Duration::from_secs(5),
    )
    .unwrap()
}

fn current_weather(temp: f64, humidity: u32) -> serde_json::Value {
    serde_json::json!({
        "weather": [{"id": 800, "main": "Clear"}],
        "main": {"temp": temp, "feels_like": temp - 1.0, "humidity": humidity},
        "name": "Montevideo"
    })
}

#[tokio::test]
async fn test_current_sends_expected_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .and(query_param("id", "3439525"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather(17.3, 71)))
        .expect(1)
        .mount(&server)
        .await;

    let reading = client(&server).current(3439525).await.unwrap().unwrap();
    assert_eq!(17.3, reading.temperature_celsius);
    assert_eq!(71.0, reading.humidity);
}

#[tokio::test]
async fn test_empty_object_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    assert_eq!(None, client(&server).current(1).await.unwrap());
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key."
        })))
        .mount(&server)
        .await;

    match client(&server).current(1).await {
        Err(err @ ProviderError::Status { status: 401, .. }) => assert!(!err.is_retryable()),
        r => panic!("expected 401 status error, got: {:?}", r),
    }
}

#[tokio::test]
async fn test_job_against_mock_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .and(query_param("id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather(10.0, 50)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .and(query_param("id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .and(query_param("id", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather(30.0, 90)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = ServiceConfig {
        api_key: "test-key".to_string(),
        city_ids: vec![1, 2, 3],
        data_file: dir.path().join("weather_data.json"),
        ..ServiceConfig::default()
    };
    let pool = start_pool_with(&config, Arc::new(client(&server)))
        .await
        .unwrap();

    pool.submit(42).await.unwrap().join().await;

    let status = pool.status(42).await;
    assert_eq!(Some(JobStatus::Completed), status.status);
    let progress = status.progress.unwrap();
    assert!((progress - 200.0 / 3.0).abs() < 1e-9);

    let records = pool.records().await.unwrap();
    assert_eq!(1, records.len());
    let cities: Vec<u64> = records[0].weather_data.iter().map(|w| w.city_id).collect();
    assert_eq!(vec![1, 3], cities);
}
