// Adapters for the capability and output ports

pub mod fixtures;
pub mod geocoding;
pub mod npi_registry;
pub mod record_output_adapter;
pub mod website_scraper;

pub use fixtures::Fixtures;
pub use geocoding::GoogleGeocoder;
pub use npi_registry::NpiRegistryClient;
pub use record_output_adapter::FileRecordOutputAdapter;
pub use website_scraper::HtmlWebsiteScraper;
