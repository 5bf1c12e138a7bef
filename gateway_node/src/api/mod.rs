//! HTTP surface of the gateway.

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use crate::config::ServerConfig;
use crate::platform::PlatformClient;
use crate::storage::RecordStore;
use crate::types::Address;

pub mod errors;
pub mod handlers;
pub mod scratch;
pub mod validation;


use handlers::{datasets, jobs, status};

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub platform: Arc<dyn PlatformClient>,
    /// Dispatcher that receives compute jobs
    pub dispatcher: Address,
    pub scratch_dir: PathBuf,
}

/// Build the gateway router with CORS, request timeout and upload limit.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(status::health_check))
        .route("/upload", post(datasets::upload_dataset))
        .route("/datasets", get(datasets::list_datasets))
        .route("/dataset/", get(datasets::missing_address))
        .route("/dataset/:address", get(datasets::download_dataset))
        .route("/compute", post(jobs::submit_job))
        .route("/jobs", get(jobs::list_jobs))
        .route("/job/", get(jobs::missing_job_id))
        .route("/job/:job_id", get(jobs::get_job_status))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
        .layer(cors)
        .with_state(state)
}
