//! Classifier configuration.
//!
//! A [`ClassifierConfig`] controls which pipeline stages run, how large the
//! result cache and the pattern memo are, and a few formatting details of
//! the client-hints path. It can be built in code with the `with_*`
//! methods or loaded from YAML/JSON.
//!
//! # Examples
//!
//! ```rust
//! use ua_classifier::ClassifierConfig;
//!
//! // Client identification only, nothing else
//! let config = ClassifierConfig::client_only();
//! assert!(!config.os_enabled);
//!
//! let config = ClassifierConfig::default()
//!     .with_cache_capacity(50_000)
//!     .with_device_brand(false);
//! assert_eq!(config.cache_capacity, 50_000);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ClassifierError, Result};
use crate::matcher::DEFAULT_PATTERN_CACHE_CAPACITY;

/// Default number of cached classification results.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Link template used for the device brand info URL on the user agent path.
pub const DEFAULT_BRAND_INFO_URL_PREFIX: &str =
    "https://udger.com/resources/ua-list/devices-brand-detail?brand=";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Result cache capacity. `0` disables result caching.
    pub cache_capacity: usize,

    /// Compiled-pattern memo capacity for brand and client-hints patterns.
    pub pattern_cache_capacity: usize,

    pub os_enabled: bool,
    pub device_enabled: bool,
    pub device_brand_enabled: bool,
    pub client_hints_enabled: bool,

    /// Character trimmed from both ends of client-hint values.
    pub hint_quote: char,

    /// Prefix of the device brand info URL; the brand code is appended.
    pub brand_info_url_prefix: String,

    /// Batches smaller than this are classified on the calling thread.
    pub min_batch_size_for_parallelism: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
            os_enabled: true,
            device_enabled: true,
            device_brand_enabled: true,
            client_hints_enabled: true,
            hint_quote: '"',
            brand_info_url_prefix: DEFAULT_BRAND_INFO_URL_PREFIX.to_string(),
            min_batch_size_for_parallelism: 16,
        }
    }
}

impl ClassifierConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the crawler and client stages.
    pub fn client_only() -> Self {
        Self {
            os_enabled: false,
            device_enabled: false,
            device_brand_enabled: false,
            client_hints_enabled: false,
            ..Default::default()
        }
    }

    /// Every stage, no result cache.
    pub fn uncached() -> Self {
        Self {
            cache_capacity: 0,
            ..Default::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.hint_quote.is_whitespace() {
            return Err(ClassifierError::Config(
                "hint_quote must not be whitespace".to_string(),
            ));
        }
        if self.min_batch_size_for_parallelism == 0 {
            return Err(ClassifierError::Config(
                "min_batch_size_for_parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_pattern_cache_capacity(mut self, capacity: usize) -> Self {
        self.pattern_cache_capacity = capacity;
        self
    }

    pub fn with_os(mut self, enable: bool) -> Self {
        self.os_enabled = enable;
        self
    }

    pub fn with_device(mut self, enable: bool) -> Self {
        self.device_enabled = enable;
        self
    }

    pub fn with_device_brand(mut self, enable: bool) -> Self {
        self.device_brand_enabled = enable;
        self
    }

    pub fn with_client_hints(mut self, enable: bool) -> Self {
        self.client_hints_enabled = enable;
        self
    }

    pub fn with_hint_quote(mut self, quote: char) -> Self {
        self.hint_quote = quote;
        self
    }

    pub fn with_brand_info_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.brand_info_url_prefix = prefix.into();
        self
    }

    pub fn with_min_batch_size_for_parallelism(mut self, min_size: usize) -> Self {
        self.min_batch_size_for_parallelism = min_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClassifierConfig::default();
        assert_eq!(config.cache_capacity, 10_000);
        assert_eq!(config.pattern_cache_capacity, 1_000);
        assert!(config.os_enabled);
        assert!(config.device_enabled);
        assert!(config.device_brand_enabled);
        assert!(config.client_hints_enabled);
        assert_eq!(config.hint_quote, '"');
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let config = ClassifierConfig::client_only();
        assert!(!config.os_enabled);
        assert!(!config.device_enabled);
        assert!(!config.device_brand_enabled);
        assert!(!config.client_hints_enabled);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);

        let config = ClassifierConfig::uncached();
        assert_eq!(config.cache_capacity, 0);
        assert!(config.os_enabled);
    }

    #[test]
    fn test_builder_methods() {
        let config = ClassifierConfig::new()
            .with_cache_capacity(5)
            .with_pattern_cache_capacity(0)
            .with_os(false)
            .with_client_hints(false)
            .with_hint_quote('\'')
            .with_brand_info_url_prefix("https://example.com/brand/");

        assert_eq!(config.cache_capacity, 5);
        assert_eq!(config.pattern_cache_capacity, 0);
        assert!(!config.os_enabled);
        assert!(config.device_enabled);
        assert!(!config.client_hints_enabled);
        assert_eq!(config.hint_quote, '\'');
        assert_eq!(config.brand_info_url_prefix, "https://example.com/brand/");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = ClassifierConfig::from_yaml_str("cache_capacity: 0\ndevice_enabled: false\n")
            .unwrap();
        assert_eq!(config.cache_capacity, 0);
        assert!(!config.device_enabled);
        assert!(config.os_enabled);
        assert_eq!(config.brand_info_url_prefix, DEFAULT_BRAND_INFO_URL_PREFIX);
    }

    #[test]
    fn test_json_config() {
        let config =
            ClassifierConfig::from_json_str(r#"{"hint_quote": "'", "os_enabled": false}"#).unwrap();
        assert_eq!(config.hint_quote, '\'');
        assert!(!config.os_enabled);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ClassifierConfig::from_yaml_str("hint_quote: ' '").unwrap_err();
        assert!(matches!(err, ClassifierError::Config(_)));

        let err = ClassifierConfig::from_yaml_str("cache_capacity: lots").unwrap_err();
        assert!(matches!(err, ClassifierError::Yaml(_)));
    }

    #[test]
    fn test_from_file_by_extension() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "pattern_cache_capacity: 42").unwrap();
        let config = ClassifierConfig::from_file(yaml.path()).unwrap();
        assert_eq!(config.pattern_cache_capacity, 42);

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json, r#"{{"cache_capacity": 7}}"#).unwrap();
        let config = ClassifierConfig::from_file(json.path()).unwrap();
        assert_eq!(config.cache_capacity, 7);

        let err = ClassifierConfig::from_file("/nonexistent/classifier.yaml").unwrap_err();
        assert!(matches!(err, ClassifierError::Io(_)));
    }
}
