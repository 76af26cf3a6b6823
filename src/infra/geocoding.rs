use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::app::ports::{AddressVerification, AddressVerifierPort};
use crate::config::MapsConfig;
use crate::error::{Result, ValidatorError};

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: Option<String>,
}

fn interpret(response: GeocodeResponse) -> anyhow::Result<AddressVerification> {
    match response.status.as_str() {
        "OK" => Ok(match response.results.into_iter().next() {
            Some(first) => AddressVerification {
                confirmed: true,
                formatted_address: first.formatted_address,
            },
            None => AddressVerification::unconfirmed(),
        }),
        "ZERO_RESULTS" => Ok(AddressVerification::unconfirmed()),
        other => Err(anyhow!(
            "Geocoding failed with status {}: {}",
            other,
            response.error_message.unwrap_or_default()
        )),
    }
}

/// Address verification through the Google Geocoding API
pub struct GoogleGeocoder {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(config: &MapsConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ValidatorError::Config("maps.api_key (GOOGLE_MAPS_API_KEY) is not set".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl AddressVerifierPort for GoogleGeocoder {
    async fn verify(
        &self,
        street: &str,
        city: Option<&str>,
        state: Option<&str>,
        zip: Option<&str>,
    ) -> anyhow::Result<AddressVerification> {
        let address = [Some(street), city, state, zip]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if address.is_empty() {
            return Ok(AddressVerification::unconfirmed());
        }

        let response: GeocodeResponse = self
            .client
            .get(&self.base_url)
            .query(&[("address", address.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await
            .context("Geocoding request failed")?
            .error_for_status()
            .context("Geocoding returned an error status")?
            .json()
            .await
            .context("Invalid geocoding JSON")?;

        debug!("Geocoded '{}': {}", address, response.status);
        interpret(response)
    }
}
