use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::constants;
use crate::error::{Result, ValidatorError};
use crate::pipeline::processing::QualityGateConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub registry: RegistryConfig,
    pub maps: MapsConfig,
    pub website: WebsiteConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause between records to bound load on external services
    pub record_delay_ms: u64,
    pub fuzzy_match_threshold: f64,
    pub quality_gate: QualityGateConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            record_delay_ms: 100,
            fuzzy_match_threshold: constants::DEFAULT_FUZZY_MATCH_THRESHOLD,
            quality_gate: QualityGateConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn record_delay(&self) -> Duration {
        Duration::from_millis(self.record_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub api_version: String,
    pub search_limit: usize,
    pub timeout_seconds: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_NPI_API_BASE_URL.to_string(),
            api_version: "2.1".to_string(),
            search_limit: 5,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_GEOCODING_API_URL.to_string(),
            api_key: None,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebsiteConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            user_agent: format!("provider-validator/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_content = fs::read_to_string(path).map_err(|e| {
            ValidatorError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut config: Config = toml::from_str(&config_content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GOOGLE_MAPS_API_KEY") {
            if !key.trim().is_empty() {
                self.maps.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("NPI_REGISTRY_URL") {
            if !url.trim().is_empty() {
                self.registry.base_url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.pipeline.fuzzy_match_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ValidatorError::Config(format!(
                "pipeline.fuzzy_match_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        let gate = &self.pipeline.quality_gate;
        for (name, value) in [
            ("review_threshold", gate.review_threshold),
            ("name_mismatch_threshold", gate.name_mismatch_threshold),
            ("high_confidence", gate.high_confidence),
            ("moderate_confidence", gate.moderate_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidatorError::Config(format!(
                    "pipeline.quality_gate.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.registry.search_limit == 0 {
            return Err(ValidatorError::Config(
                "registry.search_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\nrecord_delay_ms = 0\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.pipeline.record_delay_ms, 0);
        assert_eq!(config.pipeline.fuzzy_match_threshold, 0.85);
        assert_eq!(config.registry.api_version, "2.1");
        assert_eq!(config.registry.search_limit, 5);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.pipeline.fuzzy_match_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ValidatorError::Config(_))));
    }

    #[test]
    fn test_quality_gate_section_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline.quality_gate]\nmax_issues = 5\nreview_threshold = 0.4\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.pipeline.quality_gate.max_issues, 5);
        assert_eq!(config.pipeline.quality_gate.review_threshold, 0.4);
        assert_eq!(config.pipeline.quality_gate.high_confidence, 0.8);
    }

    #[test]
    fn test_rejects_out_of_range_gate_threshold() {
        let mut config = Config::default();
        config.pipeline.quality_gate.high_confidence = 2.0;
        assert!(matches!(config.validate(), Err(ValidatorError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Config::load("/definitely/not/here/config.toml");
        assert!(matches!(result, Err(ValidatorError::Config(_))));
    }
}
