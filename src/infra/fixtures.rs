//! Offline lookup sources backed by fixed data.
//!
//! The CLI loads these from a JSON fixture file so a batch can be validated
//! without network access; tests build them directly.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::app::ports::{
    AddressVerification, AddressVerifierPort, RegistryPort, RegistryProvider, ScrapedWebsite,
    WebsiteScraperPort,
};
use crate::app::Capabilities;
use crate::error::{Result, ValidatorError};
use crate::infra::website_scraper::domain_of;

/// Registry entries in the order they should be returned by searches
pub struct StaticRegistry {
    providers: Vec<RegistryProvider>,
}

impl StaticRegistry {
    pub fn new(providers: Vec<RegistryProvider>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl RegistryPort for StaticRegistry {
    async fn by_id(&self, npi: &str) -> anyhow::Result<Option<RegistryProvider>> {
        let npi = npi.trim();
        Ok(self.providers.iter().find(|p| p.npi == npi).cloned())
    }

    async fn by_name(&self, name: &str, state: Option<&str>) -> anyhow::Result<Vec<RegistryProvider>> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Ok(Vec::new());
        }

        let matches: Vec<RegistryProvider> = self
            .providers
            .iter()
            .filter(|p| {
                p.name
                    .as_deref()
                    .map(|n| n.to_lowercase().contains(&name))
                    .unwrap_or(false)
            })
            .filter(|p| match state {
                Some(state) => p.state.as_deref().map(|s| s.eq_ignore_ascii_case(state.trim())).unwrap_or(false),
                None => true,
            })
            .cloned()
            .collect();
        debug!("Static registry name search '{}' matched {}", name, matches.len());
        Ok(matches)
    }
}

fn address_key(street: &str, city: Option<&str>, state: Option<&str>, zip: Option<&str>) -> String {
    format!(
        "{} {} {} {}",
        street,
        city.unwrap_or(""),
        state.unwrap_or(""),
        zip.unwrap_or("")
    )
    .to_lowercase()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

/// Confirms only the addresses it has been given
#[derive(Default)]
pub struct StaticAddressVerifier {
    known: HashMap<String, String>,
}

impl StaticAddressVerifier {
    pub fn insert(
        &mut self,
        street: &str,
        city: Option<&str>,
        state: Option<&str>,
        zip: Option<&str>,
        formatted_address: &str,
    ) {
        self.known
            .insert(address_key(street, city, state, zip), formatted_address.to_string());
    }
}

#[async_trait]
impl AddressVerifierPort for StaticAddressVerifier {
    async fn verify(
        &self,
        street: &str,
        city: Option<&str>,
        state: Option<&str>,
        zip: Option<&str>,
    ) -> anyhow::Result<AddressVerification> {
        Ok(match self.known.get(&address_key(street, city, state, zip)) {
            Some(formatted) => AddressVerification::confirmed(formatted.clone()),
            None => AddressVerification::unconfirmed(),
        })
    }
}

/// Website data keyed by domain, `www.` stripped
#[derive(Default)]
pub struct StaticWebsiteScraper {
    sites: HashMap<String, ScrapedWebsite>,
}

impl StaticWebsiteScraper {
    pub fn insert(&mut self, domain: &str, site: ScrapedWebsite) {
        let key = domain_of(domain).unwrap_or_else(|| domain.trim().to_lowercase());
        self.sites.insert(key, site);
    }
}

#[async_trait]
impl WebsiteScraperPort for StaticWebsiteScraper {
    async fn scrape(&self, url: &str) -> anyhow::Result<Option<ScrapedWebsite>> {
        Ok(domain_of(url).and_then(|domain| self.sites.get(&domain).cloned()))
    }
}

#[derive(Debug, Deserialize)]
pub struct FixtureAddress {
    pub street: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    pub formatted_address: String,
}

/// Contents of a fixture file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub registry: Vec<RegistryProvider>,
    pub addresses: Vec<FixtureAddress>,
    /// Keyed by domain
    pub websites: HashMap<String, ScrapedWebsite>,
}

impl Fixtures {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ValidatorError::Config(format!("Failed to read fixtures '{}': {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn into_capabilities(self) -> Capabilities {
        let mut verifier = StaticAddressVerifier::default();
        for a in &self.addresses {
            verifier.insert(
                &a.street,
                a.city.as_deref(),
                a.state.as_deref(),
                a.zip.as_deref(),
                &a.formatted_address,
            );
        }

        let mut websites = StaticWebsiteScraper::default();
        for (domain, site) in self.websites {
            websites.insert(&domain, site);
        }

        Capabilities::new(
            Arc::new(StaticRegistry::new(self.registry)),
            Arc::new(verifier),
            Arc::new(websites),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn provider(npi: &str, name: &str, state: &str) -> RegistryProvider {
        RegistryProvider {
            npi: npi.to_string(),
            name: Some(name.to_string()),
            state: Some(state.to_string()),
            ..RegistryProvider::default()
        }
    }

    #[tokio::test]
    async fn test_name_search_is_substring_with_state_filter() {
        let registry = StaticRegistry::new(vec![
            provider("1234567890", "John Smith", "NY"),
            provider("1111111111", "Johnny Smithers", "CA"),
        ]);

        let all = registry.by_name("smith", None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].npi, "1234567890");

        let ca = registry.by_name("Smith", Some("ca")).await.unwrap();
        assert_eq!(ca.len(), 1);
        assert_eq!(ca[0].npi, "1111111111");

        assert!(registry.by_name("  ", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_address_key_ignores_case_and_spacing() {
        let mut verifier = StaticAddressVerifier::default();
        verifier.insert("123 Main St", Some("New York"), Some("NY"), Some("10001"), "123 Main St, New York, NY 10001");

        let hit = verifier
            .verify("123  MAIN st", Some("new york"), Some("ny"), Some("10001"))
            .await
            .unwrap();
        assert!(hit.confirmed);

        let miss = verifier.verify("123 Main St", None, None, None).await.unwrap();
        assert!(!miss.confirmed);
        assert!(miss.formatted_address.is_none());
    }

    #[tokio::test]
    async fn test_fixture_file_builds_capabilities() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "registry": [{{"npi": "9876543210", "name": "Jane Doe", "state": "CA"}}],
                "addresses": [{{"street": "456 Oak Ave", "city": "Los Angeles", "state": "CA",
                                "zip": "90001", "formatted_address": "456 Oak Ave, Los Angeles, CA 90001"}}],
                "websites": {{"www.example-clinic.com": {{"name": "Example Clinic"}}}}
            }}"#
        )
        .unwrap();

        let capabilities = Fixtures::load(file.path()).unwrap().into_capabilities();

        assert!(capabilities.registry.by_id("9876543210").await.unwrap().is_some());
        let verified = capabilities
            .address_verifier
            .verify("456 Oak Ave", Some("Los Angeles"), Some("CA"), Some("90001"))
            .await
            .unwrap();
        assert!(verified.confirmed);
        let site = capabilities
            .website_scraper
            .scrape("http://example-clinic.com/about")
            .await
            .unwrap();
        assert_eq!(site.and_then(|s| s.name).as_deref(), Some("Example Clinic"));
    }

    #[test]
    fn test_missing_fixture_file_is_config_error() {
        let result = Fixtures::load("/nonexistent/fixtures.json");
        assert!(matches!(result, Err(ValidatorError::Config(_))));
    }
}
