use async_trait::async_trait;
use tracing::debug;

use crate::app::ports::{RegistryProvider, ScrapedWebsite};
use crate::app::Capabilities;
use crate::domain::{non_blank, ProviderField, ProviderRecord};
use crate::pipeline::processing::Stage;
use crate::pipeline::update::RecordUpdate;

/// Fills absent fields from the registry and, with lower priority, from the
/// provider's website. Present fields are never replaced.
pub struct EnrichmentStage {
    capabilities: Capabilities,
}

impl EnrichmentStage {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// Whether the source's city/state/zip can be merged with the record's
    /// without mixing two locations. Every locality field the record already
    /// has must be matched, case-insensitively, by the source.
    fn locality_agrees(record: &ProviderRecord, locality: [(ProviderField, &Option<String>); 3]) -> bool {
        locality.iter().all(|(field, source)| match record.get(*field) {
            None => true,
            Some(own) => non_blank(source)
                .is_some_and(|theirs| theirs.trim().to_lowercase() == own.trim().to_lowercase()),
        })
    }

    /// Address plus locality as one unit: all of it lands or none of it
    fn fill_address(
        record: &ProviderRecord,
        street: &Option<String>,
        locality: [(ProviderField, &Option<String>); 3],
        update: &mut RecordUpdate,
    ) {
        let Some(street) = non_blank(street) else {
            return;
        };
        if !Self::locality_agrees(record, locality) {
            debug!(record_id = %record.id, "Source address is for another locality, skipping");
            return;
        }
        update.fill(ProviderField::Address, street);
        for (field, value) in locality {
            if let Some(value) = non_blank(value) {
                update.fill(field, value);
            }
        }
    }

    /// Registry fills for address (as one unit with city/state/zip), phone
    /// and specialty
    fn fill_from_registry(record: &ProviderRecord, entry: &RegistryProvider, update: &mut RecordUpdate) {
        if !record.has(ProviderField::Address) {
            Self::fill_address(
                record,
                &entry.street,
                [
                    (ProviderField::City, &entry.city),
                    (ProviderField::State, &entry.state),
                    (ProviderField::ZipCode, &entry.zip),
                ],
                update,
            );
        }

        if !record.has(ProviderField::Phone) {
            if let Some(phone) = non_blank(&entry.phone) {
                update.fill(ProviderField::Phone, phone);
            }
        }

        if !record.has(ProviderField::Specialty) {
            if let Some(specialty) = non_blank(&entry.specialty) {
                update.fill(ProviderField::Specialty, specialty);
            }
        }
    }

    /// Website fills, only for fields the registry left empty
    fn fill_from_website(record: &ProviderRecord, site: &ScrapedWebsite, update: &mut RecordUpdate) {
        let still_missing =
            |field: ProviderField, update: &RecordUpdate| !record.has(field) && !update.fills_field(field);

        if still_missing(ProviderField::Phone, update) {
            if let Some(phone) = non_blank(&site.phone) {
                update.fill(ProviderField::Phone, phone);
            }
        }

        if still_missing(ProviderField::Address, update) {
            let no_zip = None;
            Self::fill_address(
                record,
                &site.street,
                [
                    (ProviderField::City, &site.city),
                    (ProviderField::State, &site.state),
                    (ProviderField::ZipCode, &no_zip),
                ],
                update,
            );
        }

        if still_missing(ProviderField::Specialty, update) {
            let specialties: Vec<&str> = site
                .specialties
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();
            if !specialties.is_empty() {
                update.fill(ProviderField::Specialty, specialties.join(", "));
            }
        }
    }
}

#[async_trait]
impl Stage for EnrichmentStage {
    fn name(&self) -> &'static str {
        "enrichment"
    }

    async fn run(&self, record: &ProviderRecord) -> anyhow::Result<RecordUpdate> {
        let mut update = RecordUpdate::default();
        let mut npi = record.get(ProviderField::Npi).map(str::to_string);

        if npi.is_none() {
            if let Some(name) = record.get(ProviderField::Name) {
                let matches = self
                    .capabilities
                    .registry
                    .by_name(name, record.get(ProviderField::State))
                    .await?;
                // First result wins; the registry's ordering is the tie-break
                match matches.into_iter().next() {
                    Some(found) if !found.npi.trim().is_empty() => {
                        debug!(record_id = %record.id, npi = %found.npi, "NPI found by name search");
                        update.fill(ProviderField::Npi, found.npi.clone());
                        npi = Some(found.npi);
                    }
                    _ => debug!(record_id = %record.id, "No registry match for name"),
                }
            }
        }

        let registry_fillable = [ProviderField::Address, ProviderField::Phone, ProviderField::Specialty]
            .iter()
            .any(|f| !record.has(*f));
        if registry_fillable {
            if let Some(npi) = npi.as_deref() {
                match self.capabilities.registry.by_id(npi).await? {
                    Some(entry) => Self::fill_from_registry(record, &entry, &mut update),
                    None => debug!(record_id = %record.id, npi, "NPI not in registry, nothing to enrich"),
                }
            }
        }

        if let Some(website) = record.get(ProviderField::Website) {
            match self.capabilities.website_scraper.scrape(website).await? {
                Some(site) => Self::fill_from_website(record, &site, &mut update),
                None => debug!(record_id = %record.id, website, "Website yielded no data"),
            }
        }

        debug!(
            record_id = %record.id,
            filled = update.fills.len(),
            "Enrichment finished"
        );
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::fixtures::{StaticAddressVerifier, StaticRegistry, StaticWebsiteScraper};
    use std::sync::Arc;

    fn registry() -> StaticRegistry {
        StaticRegistry::new(vec![RegistryProvider {
            npi: "9876543210".to_string(),
            name: Some("Jane Doe".to_string()),
            specialty: Some("Pediatrics".to_string()),
            street: Some("456 Oak Ave".to_string()),
            city: Some("Los Angeles".to_string()),
            state: Some("CA".to_string()),
            zip: Some("90001".to_string()),
            phone: Some("3105555678".to_string()),
        }])
    }

    fn stage(websites: StaticWebsiteScraper) -> EnrichmentStage {
        EnrichmentStage::new(Capabilities::new(
            Arc::new(registry()),
            Arc::new(StaticAddressVerifier::default()),
            Arc::new(websites),
        ))
    }

    fn filled(update: &RecordUpdate, field: ProviderField) -> Option<&str> {
        update
            .fills
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_finds_npi_by_name_and_fills_from_registry() {
        let mut record = ProviderRecord::named("Jane Doe");
        record.state = Some("CA".to_string());

        let update = stage(StaticWebsiteScraper::default()).run(&record).await.unwrap();

        assert_eq!(filled(&update, ProviderField::Npi), Some("9876543210"));
        assert_eq!(filled(&update, ProviderField::Address), Some("456 Oak Ave"));
        assert_eq!(filled(&update, ProviderField::City), Some("Los Angeles"));
        assert_eq!(filled(&update, ProviderField::ZipCode), Some("90001"));
        assert_eq!(filled(&update, ProviderField::Phone), Some("3105555678"));
        assert_eq!(filled(&update, ProviderField::Specialty), Some("Pediatrics"));
    }

    #[tokio::test]
    async fn test_present_fields_are_left_alone() {
        let mut record = ProviderRecord::named("Jane Doe");
        record.npi = Some("9876543210".to_string());
        record.phone = Some("3105550000".to_string());
        record.address = Some("1 Elm St".to_string());

        let update = stage(StaticWebsiteScraper::default()).run(&record).await.unwrap();

        assert_eq!(filled(&update, ProviderField::Phone), None);
        assert_eq!(filled(&update, ProviderField::Address), None);
        assert_eq!(filled(&update, ProviderField::City), None);
        assert_eq!(filled(&update, ProviderField::Specialty), Some("Pediatrics"));
    }

    #[tokio::test]
    async fn test_address_from_another_city_is_not_merged() {
        let mut record = ProviderRecord::named("Jane Doe");
        record.npi = Some("9876543210".to_string());
        record.city = Some("Boston".to_string());
        record.state = Some("MA".to_string());

        let update = stage(StaticWebsiteScraper::default()).run(&record).await.unwrap();

        assert_eq!(filled(&update, ProviderField::Address), None);
        assert_eq!(filled(&update, ProviderField::ZipCode), None);
        assert_eq!(filled(&update, ProviderField::City), None);
        // the rest of the registry entry still applies
        assert_eq!(filled(&update, ProviderField::Phone), Some("3105555678"));
        assert_eq!(filled(&update, ProviderField::Specialty), Some("Pediatrics"));
    }

    #[tokio::test]
    async fn test_matching_locality_allows_address_fill() {
        let mut record = ProviderRecord::named("Jane Doe");
        record.npi = Some("9876543210".to_string());
        record.city = Some("los angeles".to_string());

        let update = stage(StaticWebsiteScraper::default()).run(&record).await.unwrap();

        assert_eq!(filled(&update, ProviderField::Address), Some("456 Oak Ave"));
        assert_eq!(filled(&update, ProviderField::ZipCode), Some("90001"));
    }

    #[tokio::test]
    async fn test_website_address_skipped_when_record_has_zip() {
        let mut websites = StaticWebsiteScraper::default();
        websites.insert(
            "smallclinic.org",
            ScrapedWebsite {
                street: Some("77 River Rd".to_string()),
                city: Some("Albany".to_string()),
                state: Some("NY".to_string()),
                ..ScrapedWebsite::default()
            },
        );

        let mut record = ProviderRecord::named("Small Clinic");
        record.website = Some("smallclinic.org".to_string());
        record.zip_code = Some("12207".to_string());

        let update = stage(websites).run(&record).await.unwrap();

        // the site carries no zip, so the unit cannot be confirmed
        assert_eq!(filled(&update, ProviderField::Address), None);
        assert_eq!(filled(&update, ProviderField::City), None);
    }

    #[tokio::test]
    async fn test_website_only_fills_what_registry_did_not() {
        let mut websites = StaticWebsiteScraper::default();
        websites.insert(
            "janedoe-peds.com",
            ScrapedWebsite {
                name: Some("Jane Doe Pediatrics".to_string()),
                phone: Some("310-555-9999".to_string()),
                street: Some("9 Palm Dr".to_string()),
                city: Some("Santa Monica".to_string()),
                state: Some("CA".to_string()),
                specialties: vec!["Pediatrics".to_string(), "Adolescent Medicine".to_string()],
            },
        );

        let mut record = ProviderRecord::named("Jane Doe");
        record.npi = Some("9876543210".to_string());
        record.website = Some("https://www.janedoe-peds.com".to_string());

        let update = stage(websites).run(&record).await.unwrap();

        // registry wins for every field it supplies
        assert_eq!(filled(&update, ProviderField::Phone), Some("3105555678"));
        assert_eq!(filled(&update, ProviderField::Address), Some("456 Oak Ave"));
        assert_eq!(update.fills.iter().filter(|(f, _)| *f == ProviderField::Phone).count(), 1);
    }

    #[tokio::test]
    async fn test_website_fills_when_registry_has_nothing() {
        let mut websites = StaticWebsiteScraper::default();
        websites.insert(
            "smallclinic.org",
            ScrapedWebsite {
                phone: Some("555-201-3344".to_string()),
                street: Some("77 River Rd".to_string()),
                city: Some("Albany".to_string()),
                state: Some("NY".to_string()),
                specialties: vec!["Cardiology".to_string(), "Internal Medicine".to_string()],
                ..ScrapedWebsite::default()
            },
        );

        let mut record = ProviderRecord::named("Small Clinic");
        record.website = Some("smallclinic.org".to_string());

        let update = stage(websites).run(&record).await.unwrap();

        assert_eq!(filled(&update, ProviderField::Npi), None);
        assert_eq!(filled(&update, ProviderField::Phone), Some("555-201-3344"));
        assert_eq!(filled(&update, ProviderField::Address), Some("77 River Rd"));
        assert_eq!(filled(&update, ProviderField::City), Some("Albany"));
        assert_eq!(filled(&update, ProviderField::ZipCode), None);
        assert_eq!(
            filled(&update, ProviderField::Specialty),
            Some("Cardiology, Internal Medicine")
        );
    }
}
