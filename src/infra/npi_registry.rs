use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::app::ports::{RegistryPort, RegistryProvider};
use crate::config::RegistryConfig;

#[derive(Debug, Default, Deserialize)]
struct NpiApiResponse {
    #[serde(default)]
    results: Vec<NpiResult>,
    #[serde(default, rename = "Errors")]
    errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct NpiResult {
    /// String or number depending on the API version
    number: Option<Value>,
    basic: Option<NpiBasic>,
    #[serde(default)]
    addresses: Vec<NpiAddress>,
    #[serde(default)]
    taxonomies: Vec<NpiTaxonomy>,
}

#[derive(Debug, Deserialize)]
struct NpiBasic {
    organization_name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NpiAddress {
    address_purpose: Option<String>,
    address_1: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    telephone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NpiTaxonomy {
    desc: Option<String>,
    #[serde(default)]
    primary: bool,
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

fn provider_name(basic: &NpiBasic) -> Option<String> {
    if let Some(organization) = clean(&basic.organization_name) {
        return Some(organization);
    }
    match (clean(&basic.first_name), clean(&basic.last_name)) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(first), None) => Some(first),
        (None, Some(last)) => Some(last),
        (None, None) => None,
    }
}

impl NpiResult {
    fn into_provider(self) -> Option<RegistryProvider> {
        let npi = match self.number? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if npi.is_empty() {
            return None;
        }

        // Practice location first, mailing address otherwise
        let address = self
            .addresses
            .iter()
            .find(|a| a.address_purpose.as_deref() == Some("LOCATION"))
            .or_else(|| self.addresses.first());

        let specialty = self
            .taxonomies
            .iter()
            .find(|t| t.primary)
            .or_else(|| self.taxonomies.first())
            .and_then(|t| clean(&t.desc));

        Some(RegistryProvider {
            npi,
            name: self.basic.as_ref().and_then(provider_name),
            specialty,
            street: address.and_then(|a| clean(&a.address_1)),
            city: address.and_then(|a| clean(&a.city)),
            state: address.and_then(|a| clean(&a.state)),
            zip: address.and_then(|a| clean(&a.postal_code)),
            phone: address.and_then(|a| clean(&a.telephone_number)),
        })
    }
}

/// NPPES NPI registry lookups
pub struct NpiRegistryClient {
    client: Client,
    base_url: String,
    api_version: String,
    search_limit: usize,
}

impl NpiRegistryClient {
    pub fn new(config: &RegistryConfig) -> crate::error::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_version: config.api_version.clone(),
            search_limit: config.search_limit,
        })
    }

    async fn query(&self, params: &[(&str, String)]) -> anyhow::Result<Vec<RegistryProvider>> {
        let mut query: Vec<(&str, String)> = vec![("version", self.api_version.clone())];
        query.extend(params.iter().cloned());

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .context("NPI registry request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("NPI registry returned status {}", status));
        }

        let body: NpiApiResponse = response.json().await.context("Invalid NPI registry JSON")?;
        parse_results(body)
    }
}

fn parse_results(body: NpiApiResponse) -> anyhow::Result<Vec<RegistryProvider>> {
    if !body.errors.is_empty() {
        return Err(anyhow!("NPI registry rejected query: {}", Value::Array(body.errors)));
    }
    Ok(body.results.into_iter().filter_map(NpiResult::into_provider).collect())
}

fn is_npi(value: &str) -> bool {
    value.len() == 10 && value.chars().all(|c| c.is_ascii_digit())
}

#[async_trait]
impl RegistryPort for NpiRegistryClient {
    async fn by_id(&self, npi: &str) -> anyhow::Result<Option<RegistryProvider>> {
        let npi = npi.trim();
        if !is_npi(npi) {
            debug!("Skipping registry lookup for malformed NPI '{}'", npi);
            return Ok(None);
        }

        let results = self.query(&[("number", npi.to_string())]).await?;
        Ok(results.into_iter().next())
    }

    async fn by_name(&self, name: &str, state: Option<&str>) -> anyhow::Result<Vec<RegistryProvider>> {
        let tokens: Vec<&str> = name.split_whitespace().collect();
        let mut params: Vec<(&str, String)> = match tokens.as_slice() {
            [] => return Ok(Vec::new()),
            [single] => vec![("organization_name", single.to_string())],
            [first, .., last] => vec![("first_name", first.to_string()), ("last_name", last.to_string())],
        };
        if let Some(state) = state.map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("state", state.to_string()));
        }
        params.push(("limit", self.search_limit.to_string()));

        let mut results = self.query(&params).await?;
        results.truncate(self.search_limit);
        debug!("NPI registry name search '{}' returned {} results", name, results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "result_count": 1,
        "results": [{
            "number": "1234567890",
            "basic": {"first_name": "JOHN", "last_name": "SMITH"},
            "addresses": [
                {"address_purpose": "MAILING", "address_1": "PO BOX 1", "city": "NEWARK",
                 "state": "NJ", "postal_code": "07101", "telephone_number": "973-555-0000"},
                {"address_purpose": "LOCATION", "address_1": "123 MAIN ST", "city": "NEW YORK",
                 "state": "NY", "postal_code": "100011234", "telephone_number": "212-555-1234"}
            ],
            "taxonomies": [
                {"desc": "Internal Medicine", "primary": false},
                {"desc": "Cardiovascular Disease", "primary": true}
            ]
        }]
    }"#;

    #[test]
    fn test_parses_location_address_and_primary_taxonomy() {
        let body: NpiApiResponse = serde_json::from_str(SAMPLE).unwrap();
        let providers = parse_results(body).unwrap();

        assert_eq!(providers.len(), 1);
        let p = &providers[0];
        assert_eq!(p.npi, "1234567890");
        assert_eq!(p.name.as_deref(), Some("JOHN SMITH"));
        assert_eq!(p.street.as_deref(), Some("123 MAIN ST"));
        assert_eq!(p.zip.as_deref(), Some("100011234"));
        assert_eq!(p.phone.as_deref(), Some("212-555-1234"));
        assert_eq!(p.specialty.as_deref(), Some("Cardiovascular Disease"));
    }

    #[test]
    fn test_organization_name_wins() {
        let body: NpiApiResponse = serde_json::from_str(
            r#"{"results": [{"number": 1999999999,
                 "basic": {"organization_name": "Example Clinic", "first_name": "X"}}]}"#,
        )
        .unwrap();
        let providers = parse_results(body).unwrap();
        assert_eq!(providers[0].npi, "1999999999");
        assert_eq!(providers[0].name.as_deref(), Some("Example Clinic"));
        assert!(providers[0].street.is_none());
    }

    #[test]
    fn test_registry_errors_are_faults() {
        let body: NpiApiResponse =
            serde_json::from_str(r#"{"Errors": [{"description": "No valid search criteria"}]}"#).unwrap();
        assert!(parse_results(body).is_err());
    }

    #[tokio::test]
    async fn test_malformed_npi_is_not_found_without_a_request() {
        let client = NpiRegistryClient::new(&RegistryConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            ..RegistryConfig::default()
        })
        .unwrap();
        assert!(client.by_id("12345").await.unwrap().is_none());
        assert!(client.by_id("12345abcde").await.unwrap().is_none());
    }
}
