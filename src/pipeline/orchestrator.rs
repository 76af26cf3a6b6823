use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::app::ports::{JobStorePort, RecordOutputPort};
use crate::app::Capabilities;
use crate::config::PipelineConfig;
use crate::domain::{DirectoryStatus, Job, JobStatus, ProviderRecord};
use crate::error::{Result, ValidatorError};
use crate::observability::metrics;
use crate::pipeline::processing::{
    DirectoryStage, EnrichmentStage, QualityGateStage, Stage, ValidationStage,
};

/// A stage raised instead of returning an update
#[derive(Debug, Error)]
#[error("{stage} stage failed: {error:#}")]
pub struct StageFailure {
    pub stage: &'static str,
    pub error: anyhow::Error,
}

/// Outcome of one job run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    /// Directory status counts over every processed record
    pub by_status: BTreeMap<String, usize>,
}

impl JobSummary {
    fn new(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            status: job.status,
            total: job.total_providers,
            processed: 0,
            failed: 0,
            by_status: BTreeMap::new(),
        }
    }

    fn count(&mut self, record: &ProviderRecord) {
        *self
            .by_status
            .entry(record.directory_status.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn with_status(&self, status: DirectoryStatus) -> usize {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }
}

fn store_error(error: anyhow::Error) -> ValidatorError {
    ValidatorError::Store {
        message: format!("{:#}", error),
    }
}

/// Runs records through enrichment, validation, quality gate and directory
/// decision, strictly in that order, one record at a time.
pub struct ValidationPipeline {
    stages: Vec<Box<dyn Stage>>,
    store: Arc<dyn JobStorePort>,
    output: Option<Arc<dyn RecordOutputPort>>,
    config: PipelineConfig,
}

impl ValidationPipeline {
    pub fn new(capabilities: Capabilities, store: Arc<dyn JobStorePort>, config: PipelineConfig) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(EnrichmentStage::new(capabilities.clone())),
            Box::new(ValidationStage::new(capabilities, config.fuzzy_match_threshold)),
            Box::new(QualityGateStage::with_config(config.quality_gate.clone())),
            Box::new(DirectoryStage::new()),
        ];
        Self {
            stages,
            store,
            output: None,
            config,
        }
    }

    /// Also write every finished record to `output`
    pub fn with_output(mut self, output: Arc<dyn RecordOutputPort>) -> Self {
        self.output = Some(output);
        self
    }

    /// Apply each stage's update in turn. On failure `record` keeps whatever
    /// the earlier stages produced.
    async fn run_stages(&self, record: &mut ProviderRecord) -> std::result::Result<(), StageFailure> {
        for stage in &self.stages {
            let update = stage.run(record).await.map_err(|error| StageFailure {
                stage: stage.name(),
                error,
            })?;
            if update.is_empty() {
                debug!(record_id = %record.id, stage = stage.name(), "Stage had nothing to change");
                continue;
            }
            debug!(
                record_id = %record.id,
                stage = stage.name(),
                issues = update.issues.len(),
                "Applying stage update"
            );
            update.apply(record);
        }
        record.processed_at = Some(Utc::now());
        Ok(())
    }

    /// Run a single record through every stage without job bookkeeping
    pub async fn process_record(&self, record: ProviderRecord) -> anyhow::Result<ProviderRecord> {
        let mut record = record;
        self.run_stages(&mut record).await?;
        Ok(record)
    }

    async fn save_progress(&self, job: &mut Job) {
        job.updated_at = Utc::now();
        if let Err(e) = self.store.update_job(job).await {
            warn!("Failed to update progress for job {}: {:#}", job.job_id, e);
        }
    }

    async fn fail_job(&self, job: &mut Job, message: String) {
        job.status = JobStatus::Failed;
        job.error_message = Some(message);
        job.updated_at = Utc::now();
        if let Err(e) = self.store.update_job(job).await {
            error!("Failed to mark job {} as failed: {:#}", job.job_id, e);
        }
        metrics::jobs::failed();
    }

    /// Process the pending records of a job in ingestion order.
    ///
    /// Records already stamped with `processed_at` are skipped, so a job that
    /// stopped part way can be run again. A job that is completed or already
    /// processing is left alone and its current summary returned. A record
    /// whose stages fail is logged, saved in its last good state and still
    /// counted as processed. Only a missing job or an unreadable record set
    /// fails the job.
    pub async fn run_job(&self, job_id: &str) -> Result<JobSummary> {
        let mut job = self
            .store
            .get_job(job_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| ValidatorError::JobNotFound(job_id.to_string()))?;

        if matches!(job.status, JobStatus::Completed | JobStatus::Processing) {
            info!("Job {} is {}, nothing to run", job.job_id, job.status.as_str());
            let records = self.store.list_records(job_id).await.map_err(store_error)?;
            let mut summary = JobSummary::new(&job);
            summary.processed = job.processed_providers;
            records
                .iter()
                .filter(|r| r.processed_at.is_some())
                .for_each(|r| summary.count(r));
            return Ok(summary);
        }

        info!("Starting job {} ({})", job.job_id, job.name);
        job.status = JobStatus::Processing;
        job.error_message = None;
        job.updated_at = Utc::now();
        self.store.update_job(&job).await.map_err(store_error)?;
        metrics::jobs::started();

        let records = match self.store.list_records(job_id).await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to load records for job {}: {:#}", job_id, e);
                let error = store_error(e);
                self.fail_job(&mut job, error.to_string()).await;
                return Err(error);
            }
        };
        job.total_providers = records.len();

        let mut summary = JobSummary::new(&job);
        let (done, pending): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| r.processed_at.is_some());
        for record in &done {
            summary.count(record);
        }
        job.processed_providers = job.processed_providers.max(done.len());
        summary.processed = job.processed_providers;
        if !done.is_empty() {
            info!("Job {}: {} records already finished, {} pending", job_id, done.len(), pending.len());
        }
        let total = pending.len();

        for (index, mut record) in pending.into_iter().enumerate() {
            let started = Instant::now();

            match self.run_stages(&mut record).await {
                Ok(()) => {
                    info!(
                        "Record {}/{} {}: {} (confidence {:.2}, {} issues)",
                        index + 1,
                        total,
                        record.id,
                        record.directory_status.as_str(),
                        record.confidence.overall,
                        record.issues.len()
                    );
                    metrics::records::processed(&record, started.elapsed().as_secs_f64());
                    summary.count(&record);
                }
                Err(failure) => {
                    warn!("Record {}/{} {} failed: {}", index + 1, total, record.id, failure);
                    metrics::records::failed(failure.stage);
                    summary.failed += 1;
                }
            }

            if let Err(e) = self.store.save_record(job_id, &record).await {
                warn!("Failed to save record {} for job {}: {:#}", record.id, job_id, e);
            }
            if let Some(output) = &self.output {
                if let Err(e) = output.write_record(&record).await {
                    warn!("Failed to write record {} to output: {:#}", record.id, e);
                }
            }

            job.processed_providers = (job.processed_providers + 1).min(job.total_providers);
            summary.processed = job.processed_providers;
            self.save_progress(&mut job).await;

            if index + 1 < total {
                tokio::time::sleep(self.config.record_delay()).await;
            }
        }

        job.status = JobStatus::Completed;
        self.save_progress(&mut job).await;
        metrics::jobs::completed();
        summary.status = job.status;

        info!(
            "Completed job {}: {}/{} processed, {} failed",
            job.job_id, summary.processed, summary.total, summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::fixtures::{StaticAddressVerifier, StaticRegistry, StaticWebsiteScraper};
    use crate::pipeline::storage::InMemoryJobStore;

    fn pipeline(store: Arc<InMemoryJobStore>) -> ValidationPipeline {
        let config = PipelineConfig {
            record_delay_ms: 0,
            ..PipelineConfig::default()
        };
        ValidationPipeline::new(
            Capabilities::new(
                Arc::new(StaticRegistry::new(Vec::new())),
                Arc::new(StaticAddressVerifier::default()),
                Arc::new(StaticWebsiteScraper::default()),
            ),
            store,
            config,
        )
    }

    #[tokio::test]
    async fn test_unknown_job_is_an_error() {
        let store = Arc::new(InMemoryJobStore::new());
        let result = pipeline(store).run_job("no-such-job").await;
        assert!(matches!(result, Err(ValidatorError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_run_job_completes_and_counts() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = store
            .create_job(
                "batch",
                vec![ProviderRecord::named("Jane Roe"), ProviderRecord::named("Sam Poe")],
            )
            .unwrap();

        let summary = pipeline(store.clone()).run_job(&job.job_id).await.unwrap();

        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.with_status(DirectoryStatus::NeedsReview), 2);

        let stored = store.job(&job.job_id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.processed_providers, 2);
        assert!(store
            .records(&job.job_id)
            .unwrap()
            .iter()
            .all(|r| r.processed_at.is_some()));
    }

    #[tokio::test]
    async fn test_second_run_of_completed_job_changes_nothing() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = store
            .create_job("batch", vec![ProviderRecord::named("Jane Roe")])
            .unwrap();
        let pipeline = pipeline(store.clone());

        let first = pipeline.run_job(&job.job_id).await.unwrap();
        let after_first = store.records(&job.job_id).unwrap();

        let second = pipeline.run_job(&job.job_id).await.unwrap();
        let after_second = store.records(&job.job_id).unwrap();

        assert_eq!(second, first);
        assert_eq!(after_second, after_first);
        assert_eq!(after_second[0].issues.len(), after_first[0].issues.len());
        assert_eq!(store.job(&job.job_id).unwrap().unwrap().processed_providers, 1);
    }

    #[tokio::test]
    async fn test_rerun_only_processes_pending_records() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = store
            .create_job(
                "batch",
                vec![ProviderRecord::named("Jane Roe"), ProviderRecord::named("Sam Poe")],
            )
            .unwrap();
        let pipeline = pipeline(store.clone());
        pipeline.run_job(&job.job_id).await.unwrap();
        let finished = store.records(&job.job_id).unwrap()[0].clone();

        // a job left failed with one record still pending
        let mut pending = store.records(&job.job_id).unwrap()[1].clone();
        pending.processed_at = None;
        pending.issues.clear();
        store.save_record(&job.job_id, &pending).await.unwrap();
        let mut stored = store.job(&job.job_id).unwrap().unwrap();
        stored.status = JobStatus::Failed;
        stored.processed_providers = 1;
        store.update_job(&stored).await.unwrap();

        let summary = pipeline.run_job(&job.job_id).await.unwrap();

        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.with_status(DirectoryStatus::NeedsReview), 2);
        let records = store.records(&job.job_id).unwrap();
        assert_eq!(records[0], finished);
        assert!(records[1].processed_at.is_some());
        assert_eq!(store.job(&job.job_id).unwrap().unwrap().processed_providers, 2);
    }

    #[tokio::test]
    async fn test_quality_gate_settings_come_from_config() {
        let mut config = PipelineConfig {
            record_delay_ms: 0,
            ..PipelineConfig::default()
        };
        config.quality_gate.max_issues = 10;
        let pipeline = ValidationPipeline::new(
            Capabilities::new(
                Arc::new(StaticRegistry::new(Vec::new())),
                Arc::new(StaticAddressVerifier::default()),
                Arc::new(StaticWebsiteScraper::default()),
            ),
            Arc::new(InMemoryJobStore::new()),
            config,
        );

        let record = pipeline
            .process_record(ProviderRecord::named("Jane Roe"))
            .await
            .unwrap();

        assert!(record.needs_review);
        assert!(!record.is_suspicious);
    }

    #[tokio::test]
    async fn test_process_record_runs_every_stage() {
        let store = Arc::new(InMemoryJobStore::new());
        let record = pipeline(store)
            .process_record(ProviderRecord::named("Jane Roe"))
            .await
            .unwrap();

        assert_eq!(record.issues[0], "NPI missing");
        assert!(record.needs_review);
        assert!(record.validation_notes.is_some());
        assert_eq!(record.directory_status, DirectoryStatus::NeedsReview);
    }
}
