use crate::app::ports::JobStorePort;
use crate::domain::{Job, ProviderRecord};
use crate::error::{Result, ValidatorError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Job and record storage held in process memory; used by the CLI and tests
#[derive(Clone)]
pub struct InMemoryJobStore {
    jobs: Arc<Mutex<HashMap<String, Job>>>,
    /// Records per job, in ingestion order
    records: Arc<Mutex<HashMap<String, Vec<ProviderRecord>>>>,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|e| ValidatorError::Store {
        message: format!("store lock poisoned: {}", e),
    })
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Ingest a batch of records as a new pending job
    pub fn create_job(&self, name: &str, records: Vec<ProviderRecord>) -> Result<Job> {
        let job = Job::new(name, records.len());

        lock(&self.jobs)?.insert(job.job_id.clone(), job.clone());
        lock(&self.records)?.insert(job.job_id.clone(), records);

        debug!("Created job: {} with id {} ({} records)", name, job.job_id, job.total_providers);
        Ok(job)
    }

    pub fn job(&self, job_id: &str) -> Result<Option<Job>> {
        Ok(lock(&self.jobs)?.get(job_id).cloned())
    }

    pub fn get_record(&self, job_id: &str, record_id: Uuid) -> Result<Option<ProviderRecord>> {
        Ok(lock(&self.records)?
            .get(job_id)
            .and_then(|records| records.iter().find(|r| r.id == record_id))
            .cloned())
    }

    pub fn records(&self, job_id: &str) -> Result<Vec<ProviderRecord>> {
        Ok(lock(&self.records)?.get(job_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl JobStorePort for InMemoryJobStore {
    async fn get_job(&self, job_id: &str) -> anyhow::Result<Option<Job>> {
        Ok(self.job(job_id)?)
    }

    async fn list_records(&self, job_id: &str) -> anyhow::Result<Vec<ProviderRecord>> {
        Ok(self.records(job_id)?)
    }

    async fn save_record(&self, job_id: &str, record: &ProviderRecord) -> anyhow::Result<()> {
        let mut records = lock(&self.records)?;
        let records = records
            .get_mut(job_id)
            .ok_or_else(|| ValidatorError::JobNotFound(job_id.to_string()))?;

        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }

        debug!("Saved record {} for job {}", record.id, job_id);
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> anyhow::Result<()> {
        lock(&self.jobs)?.insert(job.job_id.clone(), job.clone());
        debug!(
            "Updated job {}: {} ({}/{})",
            job.job_id,
            job.status.as_str(),
            job.processed_providers,
            job.total_providers
        );
        Ok(())
    }
}
