//! Metrics for the provider validation pipeline.
//!
//! Names follow the Prometheus conventions; every name lives in
//! [`MetricName`] so call sites never carry magic strings.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Jobs
    JobsStarted,
    JobsCompleted,
    JobsFailed,

    // Records
    RecordsProcessed,
    RecordsFailed,
    RecordDuration,
    RecordConfidence,
    RecordPriority,
    RecordIssues,
    DirectoryDecisions,

    // Stages
    StageErrors,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::JobsStarted => "provider_validator_jobs_started_total",
            MetricName::JobsCompleted => "provider_validator_jobs_completed_total",
            MetricName::JobsFailed => "provider_validator_jobs_failed_total",

            MetricName::RecordsProcessed => "provider_validator_records_processed_total",
            MetricName::RecordsFailed => "provider_validator_records_failed_total",
            MetricName::RecordDuration => "provider_validator_record_duration_seconds",
            MetricName::RecordConfidence => "provider_validator_record_confidence",
            MetricName::RecordPriority => "provider_validator_record_priority_score",
            MetricName::RecordIssues => "provider_validator_record_issues",
            MetricName::DirectoryDecisions => "provider_validator_directory_decisions_total",

            MetricName::StageErrors => "provider_validator_stage_errors_total",
        }
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();

    info!("Metrics system initialized");
    Ok(())
}

/// Current metrics in the Prometheus text format, if the recorder is installed
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Job Metrics
// ============================================================================

pub mod jobs {
    use super::MetricName;

    pub fn started() {
        ::metrics::counter!(MetricName::JobsStarted.as_str()).increment(1);
    }

    pub fn completed() {
        ::metrics::counter!(MetricName::JobsCompleted.as_str()).increment(1);
    }

    pub fn failed() {
        ::metrics::counter!(MetricName::JobsFailed.as_str()).increment(1);
    }
}

// ============================================================================
// Record Metrics
// ============================================================================

pub mod records {
    use super::MetricName;
    use crate::domain::ProviderRecord;

    /// Record a record that made it through every stage
    pub fn processed(record: &ProviderRecord, secs: f64) {
        ::metrics::counter!(MetricName::RecordsProcessed.as_str()).increment(1);
        ::metrics::histogram!(MetricName::RecordDuration.as_str()).record(secs);
        ::metrics::histogram!(MetricName::RecordConfidence.as_str()).record(record.confidence.overall);
        ::metrics::histogram!(MetricName::RecordPriority.as_str()).record(record.priority_score);
        ::metrics::histogram!(MetricName::RecordIssues.as_str()).record(record.issues.len() as f64);
        ::metrics::counter!(
            MetricName::DirectoryDecisions.as_str(),
            "status" => record.directory_status.as_str()
        )
        .increment(1);
    }

    /// Record a record whose stages raised a fault
    pub fn failed(stage: &'static str) {
        ::metrics::counter!(MetricName::RecordsFailed.as_str()).increment(1);
        ::metrics::counter!(MetricName::StageErrors.as_str(), "stage" => stage).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        use MetricName::*;
        let all = [
            JobsStarted,
            JobsCompleted,
            JobsFailed,
            RecordsProcessed,
            RecordsFailed,
            RecordDuration,
            RecordConfidence,
            RecordPriority,
            RecordIssues,
            DirectoryDecisions,
            StageErrors,
        ];
        let names: HashSet<&str> = all.iter().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), all.len());
        assert!(names.iter().all(|n| n.starts_with("provider_validator_")));
    }
}
