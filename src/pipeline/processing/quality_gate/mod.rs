use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::constants::{
    ISSUE_LOW_OVERALL_CONFIDENCE, ISSUE_MISSING_CRITICAL_PREFIX, ISSUE_MULTIPLE_ISSUES,
    NOTE_HIGH_CONFIDENCE, NOTE_LOW_CONFIDENCE, NOTE_MODERATE_CONFIDENCE, NOTE_REQUIRES_REVIEW,
    NOTE_SUSPICIOUS, PATTERN_INVALID_PHONE, PATTERN_NAME_MISMATCH, PATTERN_SUSPICIOUS_ADDRESS,
    SUSPICIOUS_ADDRESS_WORDS,
};
use crate::domain::{ProviderField, ProviderRecord, ScoredField};
use crate::pipeline::processing::Stage;
use crate::pipeline::update::RecordUpdate;
use crate::scoring::{format, fuzzy, overall_confidence};

/// Thresholds for the quality gate checks
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityGateConfig {
    /// Overall confidence below this sends a record to review
    pub review_threshold: f64,
    /// Raw vs validated name similarity below this is a mismatch
    pub name_mismatch_threshold: f64,
    /// Accumulated issue count at which a record is suspicious
    pub max_issues: usize,
    /// Confidence tiers for the notes summary
    pub high_confidence: f64,
    pub moderate_confidence: f64,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            review_threshold: 0.5,
            name_mismatch_threshold: 0.7,
            max_issues: 3,
            high_confidence: 0.8,
            moderate_confidence: 0.6,
        }
    }
}

/// Scores a record as a whole and flags it for review or as suspicious.
pub struct QualityGateStage {
    pub config: QualityGateConfig,
}

impl Default for QualityGateStage {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityGateStage {
    pub fn new() -> Self {
        Self {
            config: QualityGateConfig::default(),
        }
    }

    pub fn with_config(config: QualityGateConfig) -> Self {
        Self { config }
    }

    /// Critical fields missing in both raw and validated form, in checklist order
    fn missing_critical(record: &ProviderRecord) -> Vec<&'static str> {
        ProviderField::CRITICAL
            .iter()
            .filter(|field| !record.has_any(**field))
            .map(|field| field.as_str())
            .collect()
    }

    fn suspicious_patterns(&self, record: &ProviderRecord) -> Vec<&'static str> {
        let mut patterns = Vec::new();

        if let (Some(raw), Some(validated)) = (
            record.get(ProviderField::Name),
            record.validated.get(ScoredField::Name),
        ) {
            if fuzzy::similarity(raw, validated) < self.config.name_mismatch_threshold {
                patterns.push(PATTERN_NAME_MISMATCH);
            }
        }

        if let Some(phone) = record.get(ProviderField::Phone) {
            if !matches!(format::digits(phone).len(), 10 | 11) {
                patterns.push(PATTERN_INVALID_PHONE);
            }
        }

        if let Some(address) = record.get(ProviderField::Address) {
            let address = address.to_lowercase();
            if SUSPICIOUS_ADDRESS_WORDS.iter().any(|word| address.contains(word)) {
                patterns.push(PATTERN_SUSPICIOUS_ADDRESS);
            }
        }

        patterns
    }

    fn confidence_note(&self, overall: f64) -> &'static str {
        if overall >= self.config.high_confidence {
            NOTE_HIGH_CONFIDENCE
        } else if overall >= self.config.moderate_confidence {
            NOTE_MODERATE_CONFIDENCE
        } else {
            NOTE_LOW_CONFIDENCE
        }
    }

    /// The gate itself; no external lookups are involved
    pub fn assess(&self, record: &ProviderRecord) -> RecordUpdate {
        let mut update = RecordUpdate::default();

        let overall = overall_confidence(record.confidence.iter());
        update.confidence_overall = Some(overall);

        if overall < self.config.review_threshold {
            update.needs_review = true;
            update.issue(ISSUE_LOW_OVERALL_CONFIDENCE);
        }

        let missing = Self::missing_critical(record);
        if !missing.is_empty() {
            update.needs_review = true;
            update.issue(format!("{}{}", ISSUE_MISSING_CRITICAL_PREFIX, missing.join(", ")));
        }

        let patterns = self.suspicious_patterns(record);

        if record.issues.len() + update.issues.len() >= self.config.max_issues {
            update.is_suspicious = true;
            update.issue(ISSUE_MULTIPLE_ISSUES);
        }

        if !patterns.is_empty() {
            update.is_suspicious = true;
            update.issues.extend(patterns.iter().map(|p| p.to_string()));
        }

        let needs_review = record.needs_review || update.needs_review;
        let is_suspicious = record.is_suspicious || update.is_suspicious;
        let mut notes = Vec::new();
        if needs_review {
            notes.push(NOTE_REQUIRES_REVIEW);
        }
        if is_suspicious {
            notes.push(NOTE_SUSPICIOUS);
        }
        notes.push(self.confidence_note(overall));
        update.validation_notes = Some(notes.join("; "));

        debug!(
            record_id = %record.id,
            overall,
            needs_review,
            is_suspicious,
            patterns = patterns.len(),
            "Quality gate assessed record"
        );
        update
    }
}

#[async_trait]
impl Stage for QualityGateStage {
    fn name(&self) -> &'static str {
        "quality_gate"
    }

    async fn run(&self, record: &ProviderRecord) -> anyhow::Result<RecordUpdate> {
        Ok(self.assess(record))
    }
}
