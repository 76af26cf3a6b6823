pub mod ports;

use std::sync::Arc;

use ports::{AddressVerifierPort, RegistryPort, WebsiteScraperPort};

/// External lookup clients, built once and handed to every stage.
#[derive(Clone)]
pub struct Capabilities {
    pub registry: Arc<dyn RegistryPort>,
    pub address_verifier: Arc<dyn AddressVerifierPort>,
    pub website_scraper: Arc<dyn WebsiteScraperPort>,
}

impl Capabilities {
    pub fn new(
        registry: Arc<dyn RegistryPort>,
        address_verifier: Arc<dyn AddressVerifierPort>,
        website_scraper: Arc<dyn WebsiteScraperPort>,
    ) -> Self {
        Self {
            registry,
            address_verifier,
            website_scraper,
        }
    }
}
