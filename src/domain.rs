//! Provider record and job data shapes shared across layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value is present when it holds non-blank text.
pub fn is_present(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Borrow an optional value only when it is present.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Identity fields carried by a provider record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderField {
    Name,
    Npi,
    Specialty,
    Phone,
    Email,
    Address,
    City,
    State,
    ZipCode,
    Website,
}

impl ProviderField {
    /// The completeness checklist, in reporting order
    pub const ALL: [ProviderField; 10] = [
        ProviderField::Name,
        ProviderField::Npi,
        ProviderField::Specialty,
        ProviderField::Phone,
        ProviderField::Email,
        ProviderField::Address,
        ProviderField::City,
        ProviderField::State,
        ProviderField::ZipCode,
        ProviderField::Website,
    ];

    /// Fields required for a minimally usable directory entry
    pub const CRITICAL: [ProviderField; 3] =
        [ProviderField::Name, ProviderField::Phone, ProviderField::Address];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderField::Name => "name",
            ProviderField::Npi => "npi",
            ProviderField::Specialty => "specialty",
            ProviderField::Phone => "phone",
            ProviderField::Email => "email",
            ProviderField::Address => "address",
            ProviderField::City => "city",
            ProviderField::State => "state",
            ProviderField::ZipCode => "zip_code",
            ProviderField::Website => "website",
        }
    }

    /// The validated/scored counterpart of this field, if it has one
    pub fn scored(&self) -> Option<ScoredField> {
        match self {
            ProviderField::Name => Some(ScoredField::Name),
            ProviderField::Phone => Some(ScoredField::Phone),
            ProviderField::Address => Some(ScoredField::Address),
            ProviderField::Specialty => Some(ScoredField::Specialty),
            ProviderField::Email => Some(ScoredField::Email),
            ProviderField::Website => Some(ScoredField::Website),
            ProviderField::Npi | ProviderField::City | ProviderField::State | ProviderField::ZipCode => {
                None
            }
        }
    }
}

/// Fields that carry a validated value and a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoredField {
    Name,
    Phone,
    Address,
    Specialty,
    Email,
    Website,
}

impl ScoredField {
    pub const ALL: [ScoredField; 6] = [
        ScoredField::Name,
        ScoredField::Phone,
        ScoredField::Address,
        ScoredField::Specialty,
        ScoredField::Email,
        ScoredField::Website,
    ];

    /// Weight of this field in the overall confidence
    pub fn weight(&self) -> f64 {
        match self {
            ScoredField::Name => 0.25,
            ScoredField::Phone => 0.20,
            ScoredField::Address => 0.25,
            ScoredField::Specialty => 0.15,
            ScoredField::Email => 0.10,
            ScoredField::Website => 0.05,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.raw().as_str()
    }

    pub fn raw(&self) -> ProviderField {
        match self {
            ScoredField::Name => ProviderField::Name,
            ScoredField::Phone => ProviderField::Phone,
            ScoredField::Address => ProviderField::Address,
            ScoredField::Specialty => ProviderField::Specialty,
            ScoredField::Email => ProviderField::Email,
            ScoredField::Website => ProviderField::Website,
        }
    }
}

/// Values confirmed (or replaced) by authoritative sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatedFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub specialty: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

impl ValidatedFields {
    pub fn get(&self, field: ScoredField) -> Option<&str> {
        let value = match field {
            ScoredField::Name => &self.name,
            ScoredField::Phone => &self.phone,
            ScoredField::Address => &self.address,
            ScoredField::Specialty => &self.specialty,
            ScoredField::Email => &self.email,
            ScoredField::Website => &self.website,
        };
        non_blank(value)
    }

    pub fn set(&mut self, field: ScoredField, value: String) {
        let slot = match field {
            ScoredField::Name => &mut self.name,
            ScoredField::Phone => &mut self.phone,
            ScoredField::Address => &mut self.address,
            ScoredField::Specialty => &mut self.specialty,
            ScoredField::Email => &mut self.email,
            ScoredField::Website => &mut self.website,
        };
        *slot = Some(value);
    }
}

/// Per-field confidence scores plus the weighted aggregate, all in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfidences {
    pub name: f64,
    pub phone: f64,
    pub address: f64,
    pub specialty: f64,
    pub email: f64,
    pub website: f64,
    pub overall: f64,
}

impl FieldConfidences {
    pub fn get(&self, field: ScoredField) -> f64 {
        match field {
            ScoredField::Name => self.name,
            ScoredField::Phone => self.phone,
            ScoredField::Address => self.address,
            ScoredField::Specialty => self.specialty,
            ScoredField::Email => self.email,
            ScoredField::Website => self.website,
        }
    }

    pub fn set(&mut self, field: ScoredField, score: f64) {
        let score = score.clamp(0.0, 1.0);
        match field {
            ScoredField::Name => self.name = score,
            ScoredField::Phone => self.phone = score,
            ScoredField::Address => self.address = score,
            ScoredField::Specialty => self.specialty = score,
            ScoredField::Email => self.email = score,
            ScoredField::Website => self.website = score,
        }
    }

    /// Per-field scores, skipping the aggregate
    pub fn iter(&self) -> impl Iterator<Item = (ScoredField, f64)> + '_ {
        ScoredField::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

/// Directory eligibility outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryStatus {
    #[default]
    Pending,
    NeedsReview,
    Validated,
}

impl DirectoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectoryStatus::Pending => "pending",
            DirectoryStatus::NeedsReview => "needs_review",
            DirectoryStatus::Validated => "validated",
        }
    }
}

/// One provider's data as it flows through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderRecord {
    pub id: Uuid,

    pub name: Option<String>,
    pub npi: Option<String>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub website: Option<String>,

    pub validated: ValidatedFields,
    pub confidence: FieldConfidences,

    pub issues: Vec<String>,
    pub needs_review: bool,
    pub is_suspicious: bool,
    pub is_validated: bool,
    pub validation_notes: Option<String>,
    pub priority_score: f64,
    pub directory_status: DirectoryStatus,

    /// Fields filled by enrichment, in fill order
    pub enriched_fields: Vec<ProviderField>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Default for ProviderRecord {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            npi: None,
            specialty: None,
            phone: None,
            email: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            website: None,
            validated: ValidatedFields::default(),
            confidence: FieldConfidences::default(),
            issues: Vec::new(),
            needs_review: false,
            is_suspicious: false,
            is_validated: false,
            validation_notes: None,
            priority_score: 0.0,
            directory_status: DirectoryStatus::Pending,
            enriched_fields: Vec::new(),
            processed_at: None,
        }
    }
}

impl ProviderRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Raw value of a field, `None` when absent or blank
    pub fn get(&self, field: ProviderField) -> Option<&str> {
        let value = match field {
            ProviderField::Name => &self.name,
            ProviderField::Npi => &self.npi,
            ProviderField::Specialty => &self.specialty,
            ProviderField::Phone => &self.phone,
            ProviderField::Email => &self.email,
            ProviderField::Address => &self.address,
            ProviderField::City => &self.city,
            ProviderField::State => &self.state,
            ProviderField::ZipCode => &self.zip_code,
            ProviderField::Website => &self.website,
        };
        non_blank(value)
    }

    pub fn set(&mut self, field: ProviderField, value: String) {
        let slot = match field {
            ProviderField::Name => &mut self.name,
            ProviderField::Npi => &mut self.npi,
            ProviderField::Specialty => &mut self.specialty,
            ProviderField::Phone => &mut self.phone,
            ProviderField::Email => &mut self.email,
            ProviderField::Address => &mut self.address,
            ProviderField::City => &mut self.city,
            ProviderField::State => &mut self.state,
            ProviderField::ZipCode => &mut self.zip_code,
            ProviderField::Website => &mut self.website,
        };
        *slot = Some(value);
    }

    pub fn has(&self, field: ProviderField) -> bool {
        self.get(field).is_some()
    }

    /// Present in either the raw or the validated form
    pub fn has_any(&self, field: ProviderField) -> bool {
        self.has(field)
            || field
                .scored()
                .map(|scored| self.validated.get(scored).is_some())
                .unwrap_or(false)
    }

    /// Fraction of the critical fields present in raw or validated form
    pub fn critical_coverage(&self) -> f64 {
        coverage(self, &ProviderField::CRITICAL)
    }

    /// Fraction of the full field checklist present in raw or validated form
    pub fn completeness(&self) -> f64 {
        coverage(self, &ProviderField::ALL)
    }
}

fn coverage(record: &ProviderRecord, fields: &[ProviderField]) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    let present = fields.iter().filter(|f| record.has_any(**f)).count();
    present as f64 / fields.len() as f64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// A named batch of provider records processed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub name: String,
    pub status: JobStatus,
    pub total_providers: usize,
    pub processed_providers: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl Job {
    pub fn new(name: impl Into<String>, total_providers: usize) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4().to_string(),
            name: name.into(),
            status: JobStatus::Pending,
            total_providers,
            processed_providers: 0,
            created_at: now,
            updated_at: now,
            error_message: None,
        }
    }
}
