use async_trait::async_trait;
use tracing::debug;

use crate::app::ports::RegistryProvider;
use crate::app::Capabilities;
use crate::constants::{
    ISSUE_ADDRESS_NOT_VALIDATED, ISSUE_EMAIL_FORMAT_INVALID, ISSUE_NPI_MISSING, ISSUE_NPI_NOT_FOUND,
    ISSUE_PHONE_FORMAT_INVALID,
};
use crate::domain::{non_blank, FieldConfidences, ProviderField, ProviderRecord, ScoredField, ValidatedFields};
use crate::pipeline::processing::Stage;
use crate::pipeline::update::RecordUpdate;
use crate::scoring::{field_confidence, format, fuzzy};

/// Fields whose confidence this stage recomputes on every run
const VALIDATED_FIELDS: [ScoredField; 5] = [
    ScoredField::Name,
    ScoredField::Phone,
    ScoredField::Address,
    ScoredField::Specialty,
    ScoredField::Email,
];

/// Address confidence below which a geocoder confirmation still adds weight
const ADDRESS_BOOST_CEILING: f64 = 0.7;
const ADDRESS_VERIFICATION_DELTA: f64 = 0.2;
/// Minimum website-name similarity before it counts as corroboration
const WEBSITE_NAME_MIN_SCORE: f64 = 0.8;
const WEBSITE_EVIDENCE_WEIGHT: f64 = 0.3;
const PHONE_FORMAT_WEIGHT: f64 = 0.5;

/// Cross-checks every present field against external sources and scores it.
///
/// Where an authoritative source has a value it becomes the validated value;
/// raw values are only compared, except for email which is kept as given.
pub struct ValidationStage {
    capabilities: Capabilities,
    fuzzy_threshold: f64,
}

/// Running state while the checks execute in sequence
#[derive(Default)]
struct Working {
    confidence: FieldConfidences,
    validated: ValidatedFields,
    issues: Vec<String>,
}

impl Working {
    fn score(&mut self, field: ScoredField, raw: Option<&str>, external: Option<&str>) {
        let similarity = fuzzy::similarity(raw.unwrap_or(""), external.unwrap_or(""));
        if let Some(external) = external {
            self.validated.set(field, external.to_string());
        }
        self.confidence
            .set(field, field_confidence(raw, external, true, similarity));
    }

    fn raise(&mut self, field: ScoredField, floor: f64) {
        let current = self.confidence.get(field);
        self.confidence.set(field, current.max(floor));
    }

    fn into_update(self) -> RecordUpdate {
        let mut update = RecordUpdate::default();
        for field in VALIDATED_FIELDS {
            update.confidences.push((field, self.confidence.get(field)));
            if let Some(value) = self.validated.get(field) {
                update.validated.push((field, value.to_string()));
            }
        }
        update.issues = self.issues;
        update
    }
}

/// "street city state" with blank parts dropped
fn composite_address(street: Option<&str>, city: Option<&str>, state: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [street, city, state]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

impl ValidationStage {
    pub fn new(capabilities: Capabilities, fuzzy_threshold: f64) -> Self {
        Self {
            capabilities,
            fuzzy_threshold,
        }
    }

    fn check_registry(record: &ProviderRecord, entry: &RegistryProvider, working: &mut Working) {
        working.score(
            ScoredField::Name,
            record.get(ProviderField::Name),
            non_blank(&entry.name),
        );

        let raw_address = composite_address(
            record.get(ProviderField::Address),
            record.get(ProviderField::City),
            record.get(ProviderField::State),
        );
        let registry_address = composite_address(
            non_blank(&entry.street),
            non_blank(&entry.city),
            non_blank(&entry.state),
        );
        working.score(
            ScoredField::Address,
            raw_address.as_deref(),
            registry_address.as_deref(),
        );

        if let Some(specialty) = non_blank(&entry.specialty) {
            working.score(
                ScoredField::Specialty,
                record.get(ProviderField::Specialty),
                Some(specialty),
            );
        }

        if let Some(phone) = non_blank(&entry.phone) {
            working.score(ScoredField::Phone, record.get(ProviderField::Phone), Some(phone));
        }
    }

    async fn check_address(&self, record: &ProviderRecord, street: &str, working: &mut Working) -> anyhow::Result<()> {
        let verification = self
            .capabilities
            .address_verifier
            .verify(
                street,
                record.get(ProviderField::City),
                record.get(ProviderField::State),
                record.get(ProviderField::ZipCode),
            )
            .await?;

        let current = working.confidence.address;
        if verification.confirmed {
            if current < ADDRESS_BOOST_CEILING {
                working
                    .confidence
                    .set(ScoredField::Address, (current + ADDRESS_VERIFICATION_DELTA).min(1.0));
                if let Some(formatted) = non_blank(&verification.formatted_address) {
                    working.validated.set(ScoredField::Address, formatted.to_string());
                }
            }
        } else {
            working.issues.push(ISSUE_ADDRESS_NOT_VALIDATED.to_string());
            working
                .confidence
                .set(ScoredField::Address, (current - ADDRESS_VERIFICATION_DELTA).max(0.0));
        }
        Ok(())
    }

    async fn check_website(&self, record: &ProviderRecord, url: &str, working: &mut Working) -> anyhow::Result<()> {
        let Some(site) = self.capabilities.website_scraper.scrape(url).await? else {
            debug!(record_id = %record.id, url, "Website yielded no data for cross-check");
            return Ok(());
        };

        if let Some(scraped_name) = non_blank(&site.name) {
            let score = fuzzy::similarity(record.get(ProviderField::Name).unwrap_or(""), scraped_name);
            if score > WEBSITE_NAME_MIN_SCORE {
                working.raise(ScoredField::Name, score * WEBSITE_EVIDENCE_WEIGHT);
            }
        }

        if let Some(scraped_phone) = non_blank(&site.phone) {
            let (matched, score) = fuzzy::is_match(
                record.get(ProviderField::Phone).unwrap_or(""),
                scraped_phone,
                self.fuzzy_threshold,
            );
            if matched {
                working.raise(ScoredField::Phone, score * WEBSITE_EVIDENCE_WEIGHT);
                working.validated.set(ScoredField::Phone, scraped_phone.to_string());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn run(&self, record: &ProviderRecord) -> anyhow::Result<RecordUpdate> {
        let mut working = Working::default();

        match record.get(ProviderField::Npi) {
            Some(npi) => match self.capabilities.registry.by_id(npi).await? {
                Some(entry) => Self::check_registry(record, &entry, &mut working),
                None => working.issues.push(ISSUE_NPI_NOT_FOUND.to_string()),
            },
            None => working.issues.push(ISSUE_NPI_MISSING.to_string()),
        }

        if let Some(street) = record.get(ProviderField::Address) {
            self.check_address(record, street, &mut working).await?;
        }

        if let Some(phone) = record.get(ProviderField::Phone) {
            let (valid, score) = format::validate_phone(Some(phone));
            if !valid {
                working.issues.push(ISSUE_PHONE_FORMAT_INVALID.to_string());
            }
            working.raise(ScoredField::Phone, score * PHONE_FORMAT_WEIGHT);
        }

        if let Some(email) = record.get(ProviderField::Email) {
            let (valid, score) = format::validate_email(Some(email));
            working.validated.set(ScoredField::Email, email.to_string());
            working.confidence.set(ScoredField::Email, score);
            if !valid {
                working.issues.push(ISSUE_EMAIL_FORMAT_INVALID.to_string());
            }
        }

        if let Some(website) = record.get(ProviderField::Website) {
            self.check_website(record, website, &mut working).await?;
        }

        debug!(
            record_id = %record.id,
            issues = working.issues.len(),
            name = working.confidence.name,
            phone = working.confidence.phone,
            address = working.confidence.address,
            "Validation finished"
        );
        Ok(working.into_update())
    }
}
