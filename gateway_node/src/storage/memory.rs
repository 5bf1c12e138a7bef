use super::{
    ComputeJobRecord, DatasetRecord, JobStatusUpdate, RecordStore, Result, StoreError,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Records {
    datasets: Vec<DatasetRecord>,
    jobs: Vec<ComputeJobRecord>,
}

/// In-memory record store, insertion ordered. Used by tests and for
/// throwaway runs. Records are keyed like the RocksDB store: inserting an
/// existing dataset address or job id replaces that record in place.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    data: Arc<Mutex<Records>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>> {
        self.data
            .lock()
            .map_err(|e| StoreError::ConnectionError(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_dataset(&self, record: &DatasetRecord) -> Result<()> {
        let mut records = self.lock()?;
        match records.datasets.iter_mut().find(|d| d.address == record.address) {
            Some(existing) => *existing = record.clone(),
            None => records.datasets.push(record.clone()),
        }
        Ok(())
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetRecord>> {
        Ok(self.lock()?.datasets.clone())
    }

    async fn insert_job(&self, record: &ComputeJobRecord) -> Result<()> {
        let mut records = self.lock()?;
        match records.jobs.iter_mut().find(|job| job.job_id == record.job_id) {
            Some(existing) => *existing = record.clone(),
            None => records.jobs.push(record.clone()),
        }
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<ComputeJobRecord>> {
        Ok(self.lock()?.jobs.clone())
    }

    async fn find_job(&self, job_id: &str) -> Result<Option<ComputeJobRecord>> {
        Ok(self
            .lock()?
            .jobs
            .iter()
            .find(|job| job.job_id == job_id)
            .cloned())
    }

    async fn update_job_status(&self, job_id: &str, update: JobStatusUpdate) -> Result<bool> {
        let mut records = self.lock()?;
        match records.jobs.iter_mut().find(|job| job.job_id == job_id) {
            Some(job) => {
                job.status = update.status;
                job.info = update.info;
                job.outputs = update.outputs;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JobOutputRecord;

    #[tokio::test]
    async fn test_datasets_keep_insertion_order() {
        let store = MemoryRecordStore::new();
        for (title, address) in [("b", "0x02"), ("a", "0x01")] {
            store
                .insert_dataset(&DatasetRecord {
                    title: title.to_string(),
                    address: address.to_string(),
                })
                .await
                .unwrap();
        }

        let titles: Vec<_> = store
            .list_datasets()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(titles, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_update_overwrites_wholesale() {
        let store = MemoryRecordStore::new();
        store.insert_job(&ComputeJobRecord::submitted("01")).await.unwrap();

        let first = JobStatusUpdate {
            status: "Success".to_string(),
            info: "done".to_string(),
            outputs: vec![JobOutputRecord {
                address: "0xaa".to_string(),
                metadata: serde_json::Map::new(),
            }],
        };
        assert!(store.update_job_status("01", first).await.unwrap());

        let second = JobStatusUpdate {
            status: "Pending".to_string(),
            info: String::new(),
            outputs: Vec::new(),
        };
        assert!(store.update_job_status("01", second).await.unwrap());

        let job = store.find_job("01").await.unwrap().unwrap();
        assert_eq!(job, ComputeJobRecord {
            job_id: "01".to_string(),
            status: "Pending".to_string(),
            info: String::new(),
            outputs: Vec::new(),
        });
    }

    #[tokio::test]
    async fn test_insert_replaces_same_key() {
        let store = MemoryRecordStore::new();
        for title in ["first", "second"] {
            store
                .insert_dataset(&DatasetRecord {
                    title: title.to_string(),
                    address: "0x01".to_string(),
                })
                .await
                .unwrap();
        }
        let datasets = store.list_datasets().await.unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].title, "second");

        store.insert_job(&ComputeJobRecord::submitted("01")).await.unwrap();
        let done = JobStatusUpdate {
            status: "Success".to_string(),
            info: String::new(),
            outputs: Vec::new(),
        };
        assert!(store.update_job_status("01", done).await.unwrap());
        store.insert_job(&ComputeJobRecord::submitted("01")).await.unwrap();
        assert_eq!(
            store.list_jobs().await.unwrap(),
            vec![ComputeJobRecord::submitted("01")]
        );
    }

    #[tokio::test]
    async fn test_update_missing_job_is_noop() {
        let store = MemoryRecordStore::new();
        let update = JobStatusUpdate {
            status: "Success".to_string(),
            info: String::new(),
            outputs: Vec::new(),
        };
        assert!(!store.update_job_status("ff", update).await.unwrap());
        assert!(store.list_jobs().await.unwrap().is_empty());
    }
}
