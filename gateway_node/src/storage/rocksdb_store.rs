use super::{
    ComputeJobRecord, DatasetRecord, JobStatusUpdate, RecordStore, Result, StoreError,
};
use async_trait::async_trait;
use log::debug;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

const DATASETS_CF: &str = "datasets";
const JOBS_CF: &str = "jobs";

/// RocksDB-backed record store. Each record kind lives in its own column
/// family as a JSON document; datasets are keyed by address, jobs by job id.
/// Every database call runs on the blocking thread pool.
#[derive(Clone)]
pub struct RocksDbRecordStore {
    db: Arc<DB>,
}

impl RocksDbRecordStore {
    /// Open the store, creating the database and column families if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new(DATASETS_CF, Options::default()),
            ColumnFamilyDescriptor::new(JOBS_CF, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::ConnectionError(format!("Failed to open RocksDB: {}", e)))?;

        debug!("Opened record store at {}", path.as_ref().display());
        Ok(Self { db: Arc::new(db) })
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&RocksDbRecordStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| StoreError::ConnectionError(format!("store task failed: {}", e)))?
    }

    fn put_document<T: Serialize>(&self, cf_name: &str, key: &str, doc: &T) -> Result<()> {
        let cf = self.column_family(cf_name)?;
        let value = serde_json::to_vec(doc)?;
        self.db
            .put_cf(&cf, key.as_bytes(), value)
            .map_err(|e| StoreError::WriteError(format!("{}/{}: {}", cf_name, key, e)))
    }

    fn get_document<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> Result<Option<T>> {
        let cf = self.column_family(cf_name)?;
        let value = self
            .db
            .get_cf(&cf, key.as_bytes())
            .map_err(|e| StoreError::ReadError(format!("{}/{}: {}", cf_name, key, e)))?;
        match value {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_documents<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.column_family(cf_name)?;
        let mut documents = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) =
                item.map_err(|e| StoreError::ReadError(format!("DB iteration error: {}", e)))?;
            documents.push(serde_json::from_slice(&value)?);
        }
        Ok(documents)
    }

    fn column_family(&self, name: &str) -> Result<Arc<rocksdb::BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::ConnectionError(format!("{} column family not found", name)))
    }
}

#[async_trait]
impl RecordStore for RocksDbRecordStore {
    async fn insert_dataset(&self, record: &DatasetRecord) -> Result<()> {
        let record = record.clone();
        self.run_blocking(move |store| store.put_document(DATASETS_CF, &record.address, &record))
            .await
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetRecord>> {
        self.run_blocking(|store| store.scan_documents(DATASETS_CF)).await
    }

    async fn insert_job(&self, record: &ComputeJobRecord) -> Result<()> {
        let record = record.clone();
        self.run_blocking(move |store| store.put_document(JOBS_CF, &record.job_id, &record))
            .await
    }

    async fn list_jobs(&self) -> Result<Vec<ComputeJobRecord>> {
        self.run_blocking(|store| store.scan_documents(JOBS_CF)).await
    }

    async fn find_job(&self, job_id: &str) -> Result<Option<ComputeJobRecord>> {
        let job_id = job_id.to_string();
        self.run_blocking(move |store| store.get_document(JOBS_CF, &job_id))
            .await
    }

    async fn update_job_status(&self, job_id: &str, update: JobStatusUpdate) -> Result<bool> {
        let job_id = job_id.to_string();
        self.run_blocking(move |store| {
            let Some(mut job) = store.get_document::<ComputeJobRecord>(JOBS_CF, &job_id)? else {
                return Ok(false);
            };
            job.status = update.status;
            job.info = update.info;
            job.outputs = update.outputs;
            store.put_document(JOBS_CF, &job_id, &job)?;
            Ok(true)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        self.run_blocking(|store| {
            for name in [DATASETS_CF, JOBS_CF] {
                let cf = store.column_family(name)?;
                store
                    .db
                    .flush_cf(&cf)
                    .map_err(|e| StoreError::WriteError(format!("flush {}: {}", name, e)))?;
            }
            Ok(())
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "rocksdb"
    }
}
