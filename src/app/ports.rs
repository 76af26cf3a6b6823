use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Job, ProviderRecord};

/// A provider entry as returned by an NPI-style registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryProvider {
    pub npi: String,
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressVerification {
    pub confirmed: bool,
    pub formatted_address: Option<String>,
}

impl AddressVerification {
    pub fn confirmed(formatted_address: impl Into<String>) -> Self {
        Self {
            confirmed: true,
            formatted_address: Some(formatted_address.into()),
        }
    }

    pub fn unconfirmed() -> Self {
        Self::default()
    }
}

/// Provider details extracted from a provider's own website.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapedWebsite {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub specialties: Vec<String>,
}

// Capability ports. "Not found" is `Ok(None)` / an empty list; `Err` is
// reserved for genuine lookup faults.

#[async_trait]
pub trait RegistryPort: Send + Sync {
    async fn by_id(&self, npi: &str) -> anyhow::Result<Option<RegistryProvider>>;

    /// Matches in registry order; callers treat the first entry as the best match
    async fn by_name(&self, name: &str, state: Option<&str>) -> anyhow::Result<Vec<RegistryProvider>>;
}

#[async_trait]
pub trait AddressVerifierPort: Send + Sync {
    async fn verify(
        &self,
        street: &str,
        city: Option<&str>,
        state: Option<&str>,
        zip: Option<&str>,
    ) -> anyhow::Result<AddressVerification>;
}

#[async_trait]
pub trait WebsiteScraperPort: Send + Sync {
    async fn scrape(&self, url: &str) -> anyhow::Result<Option<ScrapedWebsite>>;
}

// Job-side ports

#[async_trait]
pub trait JobStorePort: Send + Sync {
    async fn get_job(&self, job_id: &str) -> anyhow::Result<Option<Job>>;
    /// Records of a job in ingestion order
    async fn list_records(&self, job_id: &str) -> anyhow::Result<Vec<ProviderRecord>>;
    async fn save_record(&self, job_id: &str, record: &ProviderRecord) -> anyhow::Result<()>;
    async fn update_job(&self, job: &Job) -> anyhow::Result<()>;
}

#[async_trait]
pub trait RecordOutputPort: Send + Sync {
    async fn write_record(&self, record: &ProviderRecord) -> anyhow::Result<()>;
}
