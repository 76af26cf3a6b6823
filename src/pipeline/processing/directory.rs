use async_trait::async_trait;
use tracing::debug;

use crate::domain::{DirectoryStatus, ProviderRecord};
use crate::pipeline::processing::Stage;
use crate::pipeline::update::{DirectoryDecision, RecordUpdate};

const CONFIDENCE_WEIGHT: f64 = 0.4;
const COMPLETENESS_WEIGHT: f64 = 0.3;
const CRITICAL_WEIGHT: f64 = 0.3;

/// Minimum overall confidence and critical coverage for a directory listing
const ELIGIBLE_CONFIDENCE: f64 = 0.8;
const ELIGIBLE_CRITICAL_COVERAGE: f64 = 0.8;

/// Final stage: decides whether a record can be published to the directory.
#[derive(Debug, Default)]
pub struct DirectoryStage;

impl DirectoryStage {
    pub fn new() -> Self {
        Self
    }

    pub fn decide(&self, record: &ProviderRecord) -> DirectoryDecision {
        let overall = record.confidence.overall;
        let critical = record.critical_coverage();
        let priority_score = CONFIDENCE_WEIGHT * overall
            + COMPLETENESS_WEIGHT * record.completeness()
            + CRITICAL_WEIGHT * critical;

        let eligible = overall >= ELIGIBLE_CONFIDENCE
            && !record.needs_review
            && !record.is_suspicious
            && critical >= ELIGIBLE_CRITICAL_COVERAGE;

        let status = if eligible {
            DirectoryStatus::Validated
        } else if record.needs_review || record.is_suspicious {
            DirectoryStatus::NeedsReview
        } else {
            DirectoryStatus::Pending
        };

        DirectoryDecision {
            priority_score: priority_score.clamp(0.0, 1.0),
            is_validated: eligible,
            status,
        }
    }
}

#[async_trait]
impl Stage for DirectoryStage {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn run(&self, record: &ProviderRecord) -> anyhow::Result<RecordUpdate> {
        let decision = self.decide(record);
        debug!(
            record_id = %record.id,
            status = decision.status.as_str(),
            priority = decision.priority_score,
            "Directory decision made"
        );
        Ok(RecordUpdate {
            directory: Some(decision),
            ..RecordUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_record() -> ProviderRecord {
        let mut record = ProviderRecord::named("John Smith");
        record.npi = Some("1234567890".to_string());
        record.phone = Some("2125551234".to_string());
        record.address = Some("123 Main St".to_string());
        record.city = Some("New York".to_string());
        record.state = Some("NY".to_string());
        record.confidence.overall = 0.85;
        record
    }

    #[test]
    fn test_eligible_record_is_validated() {
        let decision = DirectoryStage::new().decide(&complete_record());

        assert!(decision.is_validated);
        assert_eq!(decision.status, DirectoryStatus::Validated);
        // 0.4 * 0.85 + 0.3 * 0.6 + 0.3 * 1.0
        assert!((decision.priority_score - 0.82).abs() < 1e-9);
    }

    #[test]
    fn test_flags_block_validation() {
        let mut record = complete_record();
        record.is_suspicious = true;
        let decision = DirectoryStage::new().decide(&record);

        assert!(!decision.is_validated);
        assert_eq!(decision.status, DirectoryStatus::NeedsReview);
    }

    #[test]
    fn test_low_confidence_without_flags_is_pending() {
        let mut record = complete_record();
        record.confidence.overall = 0.79;
        let decision = DirectoryStage::new().decide(&record);

        assert!(!decision.is_validated);
        assert_eq!(decision.status, DirectoryStatus::Pending);
    }

    #[test]
    fn test_low_critical_coverage_is_not_eligible() {
        let mut record = complete_record();
        record.phone = None;
        let decision = DirectoryStage::new().decide(&record);

        assert!(!decision.is_validated);
        assert_eq!(decision.status, DirectoryStatus::Pending);
    }
}
