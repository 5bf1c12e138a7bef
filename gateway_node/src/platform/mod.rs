//! Client side of the confidential-computing platform.
//!
//! The gateway never encrypts, schedules or executes anything itself; it only
//! drives the platform through [`PlatformClient`] and [`Dispatcher`]. The
//! production implementation is [`HttpPlatformClient`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::types::{Address, JobCompletionStatus, RawJobId};

pub mod http;

pub use self::http::HttpPlatformClient;

pub type Result<T> = std::result::Result<T, PlatformError>;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("platform request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("platform rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid platform response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Token proving the caller may act on the platform, plus the address the
/// platform knows the caller by.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub address: Address,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub title: String,
}

/// A dataset stored on the platform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetHandle {
    pub address: Address,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Input dataset of a job. Keys other than `address` are passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDataset {
    pub address: Address,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Output dataset of a job, owned by the submitting identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDataset {
    pub owner: Address,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub name: String,
    pub docker_image: String,
    pub input_datasets: Vec<InputDataset>,
    pub output_datasets: Vec<OutputDataset>,
    pub cmd: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutput {
    pub address: Address,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Dispatcher view of a job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobInfo {
    pub status: JobCompletionStatus,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub outputs: Vec<JobOutput>,
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Obtain an identity token for the configured credentials.
    async fn get_token_identity(&self) -> Result<Identity>;

    async fn upload_dataset(
        &self,
        data: Vec<u8>,
        metadata: &DatasetMetadata,
        identity: &Identity,
    ) -> Result<DatasetHandle>;

    async fn connect_dataset(&self, address: &Address, identity: &Identity)
        -> Result<DatasetHandle>;

    /// Download the dataset content into `path`, replacing anything there.
    async fn download_to_path(
        &self,
        dataset: &DatasetHandle,
        identity: &Identity,
        path: &Path,
    ) -> Result<()>;

    async fn connect_dispatcher(
        &self,
        dispatcher: &Address,
        identity: &Identity,
    ) -> Result<Box<dyn Dispatcher>>;
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn submit_job(&self, job: JobRequest) -> Result<RawJobId>;

    async fn get_job_info(&self, job_id: &RawJobId) -> Result<JobInfo>;
}
