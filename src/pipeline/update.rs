use serde::{Deserialize, Serialize};

use crate::domain::{DirectoryStatus, ProviderField, ProviderRecord, ScoredField};

/// Outcome of the directory decision stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectoryDecision {
    pub priority_score: f64,
    pub is_validated: bool,
    pub status: DirectoryStatus,
}

/// Changes a stage wants made to a record.
///
/// Stages never touch the canonical record; the orchestrator folds each
/// update in with [`RecordUpdate::apply`], which is where the record
/// invariants are enforced:
/// - raw fills only land on absent fields
/// - issues are append-only
/// - `needs_review` and `is_suspicious` can be raised but never cleared
/// - confidences are clamped to [0, 1]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub fills: Vec<(ProviderField, String)>,
    pub validated: Vec<(ScoredField, String)>,
    pub confidences: Vec<(ScoredField, f64)>,
    pub confidence_overall: Option<f64>,
    pub issues: Vec<String>,
    pub needs_review: bool,
    pub is_suspicious: bool,
    pub validation_notes: Option<String>,
    pub directory: Option<DirectoryDecision>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        *self == RecordUpdate::default()
    }

    pub fn fill(&mut self, field: ProviderField, value: impl Into<String>) {
        self.fills.push((field, value.into()));
    }

    pub fn issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    /// Whether this update already fills `field`
    pub fn fills_field(&self, field: ProviderField) -> bool {
        self.fills.iter().any(|(f, _)| *f == field)
    }

    pub fn apply(self, record: &mut ProviderRecord) {
        for (field, value) in self.fills {
            if value.trim().is_empty() || record.has(field) {
                continue;
            }
            record.set(field, value);
            record.enriched_fields.push(field);
        }

        for (field, value) in self.validated {
            record.validated.set(field, value);
        }

        for (field, score) in self.confidences {
            record.confidence.set(field, score);
        }

        if let Some(overall) = self.confidence_overall {
            record.confidence.overall = overall.clamp(0.0, 1.0);
        }

        record.issues.extend(self.issues);
        record.needs_review |= self.needs_review;
        record.is_suspicious |= self.is_suspicious;

        if let Some(notes) = self.validation_notes {
            record.validation_notes = Some(notes);
        }

        if let Some(decision) = self.directory {
            record.priority_score = decision.priority_score.clamp(0.0, 1.0);
            record.is_validated = decision.is_validated;
            record.directory_status = decision.status;
        }
    }
}
