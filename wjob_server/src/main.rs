use rocket::{
    get,
    http::Status,
    post,
    response::status,
    routes,
    serde::json::Json,
    Build, Rocket, State,
};
use tracing::error;
use tracing_subscriber::EnvFilter;
use wjob_lib::{
    load_config, start_pool, JobPool, StartupError, StatusResponse, SubmitResponse, WeatherRecord,
};

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] wjob_lib::ConfigError),
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("server failed: {0}")]
    Rocket(#[from] rocket::Error),
}

#[post("/get_weather_data/<user_id>")]
async fn start_job(pool: &State<JobPool>, user_id: i64) -> Json<SubmitResponse> {
    // the handle is dropped, the job keeps running after the response is sent
    let accepted = pool.submit(user_id).await.is_some();
    Json(SubmitResponse::new(user_id, accepted))
}

#[get("/get_weather_data_status/<user_id>")]
async fn get_status(pool: &State<JobPool>, user_id: i64) -> Json<StatusResponse> {
    Json(pool.status(user_id).await)
}

#[get("/weather_data")]
async fn get_records(
    pool: &State<JobPool>,
) -> Result<Json<Vec<WeatherRecord>>, status::Custom<String>> {
    match pool.records().await {
        Ok(records) => Ok(Json(records)),
        Err(err) => {
            error!("could not read store: {}", err);
            Err(status::Custom(Status::InternalServerError, err.to_string()))
        }
    }
}

fn build(pool: JobPool) -> Rocket<Build> {
    rocket::build()
        .manage(pool)
        .mount("/", routes![start_job, get_status, get_records])
}

#[rocket::main]
async fn main() -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config()?;
    let pool = start_pool(&config).await?;
    let _rocket = build(pool).launch().await?;
    Ok(())
}
