use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod rocksdb_store;

pub use self::memory::MemoryRecordStore;
pub use self::rocksdb_store::RocksDbRecordStore;

// Storage-specific Result type
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Write error: {0}")]
    WriteError(String),

    #[error("Read error: {0}")]
    ReadError(String),

    #[error("Invalid data: {0}")]
    InvalidData(#[from] serde_json::Error),
}

/// Local mirror of a dataset uploaded through this gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub title: String,
    pub address: String,
}

/// One output dataset of a finished job. `metadata` holds whatever else the
/// platform reports next to the address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutputRecord {
    pub address: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Local mirror of a submitted compute job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeJobRecord {
    pub job_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub outputs: Vec<JobOutputRecord>,
}

impl ComputeJobRecord {
    /// Record as created right after submission, before any status poll.
    pub fn submitted(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: String::new(),
            info: String::new(),
            outputs: Vec::new(),
        }
    }
}

/// Fields overwritten by a status poll.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusUpdate {
    pub status: String,
    pub info: String,
    pub outputs: Vec<JobOutputRecord>,
}

/// Document store holding dataset and job records. Datasets are keyed by
/// address and jobs by job id; inserting an existing key replaces the record.
/// Listing order is whatever the backend iterates in.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_dataset(&self, record: &DatasetRecord) -> Result<()>;
    async fn list_datasets(&self) -> Result<Vec<DatasetRecord>>;

    async fn insert_job(&self, record: &ComputeJobRecord) -> Result<()>;
    async fn list_jobs(&self) -> Result<Vec<ComputeJobRecord>>;
    async fn find_job(&self, job_id: &str) -> Result<Option<ComputeJobRecord>>;

    /// Replace `status`, `info` and `outputs` of the job with `job_id`.
    /// Returns `false` when no such record exists; nothing is written then.
    async fn update_job_status(&self, job_id: &str, update: JobStatusUpdate) -> Result<bool>;

    /// Flush pending writes and release the backend.
    async fn close(&self) -> Result<()>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}
