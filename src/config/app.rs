//! Exporter configuration structures.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::CollectorRegistry;

use super::validation::{ConfigError, validate_name};

// =============================================================================
// Constants
// =============================================================================

/// Default limit of scrapes served in parallel.
pub const DEFAULT_MAX_CONCURRENT_SCRAPES: usize = 40;

fn default_max_concurrent_scrapes() -> usize {
    DEFAULT_MAX_CONCURRENT_SCRAPES
}

// =============================================================================
// Scrape Configuration
// =============================================================================

/// Scrape execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Maximum number of scrapes in flight; 0 disables the limit (default: 40).
    #[serde(default = "default_max_concurrent_scrapes")]
    pub max_concurrent_scrapes: usize,

    /// Log a warning when a scrape is still running after this long (e.g. "10s").
    /// The scrape keeps waiting either way.
    #[serde(default, with = "humantime_serde")]
    pub slow_warning: Option<Duration>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scrapes: DEFAULT_MAX_CONCURRENT_SCRAPES,
            slow_warning: None,
        }
    }
}

// =============================================================================
// Exporter Configuration
// =============================================================================

/// Top-level exporter configuration.
///
/// ```yaml
/// namespace: node
/// exporter_name: node_exporter
/// version: 1.2.0
/// disable_defaults: false
/// collectors:
///   cpu: true
///   disk: false
/// scrape:
///   max_concurrent_scrapes: 10
///   slow_warning: 10s
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Metric namespace, prefix of every metric name.
    pub namespace: String,

    /// Exporter name, used in help texts and the build info metric.
    pub exporter_name: String,

    /// Exporter version reported by the build info metric.
    #[serde(default)]
    pub version: Option<String>,

    /// Disable every collector not listed in `collectors`.
    #[serde(default)]
    pub disable_defaults: bool,

    /// Explicit per-collector overrides.
    #[serde(default)]
    pub collectors: BTreeMap<String, bool>,

    /// Scrape execution settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

impl ExporterConfig {
    /// Create a configuration with defaults for everything but the names.
    pub fn new(namespace: impl Into<String>, exporter_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            exporter_name: exporter_name.into(),
            version: None,
            disable_defaults: false,
            collectors: BTreeMap::new(),
            scrape: ScrapeConfig::default(),
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name("namespace", &self.namespace)?;
        validate_name("exporter_name", &self.exporter_name)?;

        if self.collectors.keys().any(|name| name.is_empty()) {
            return Err(ConfigError::ValidationError(
                "collector name cannot be empty".to_string(),
            ));
        }

        if self.scrape.slow_warning.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ValidationError(
                "scrape slow_warning must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Record the overrides in `registry`, then apply `disable_defaults`.
    ///
    /// Must run before the registry is handed to an exporter.
    ///
    /// # Errors
    /// Returns `ConfigError::Registry` if an override names an unknown collector.
    pub fn apply(&self, registry: &mut CollectorRegistry) -> Result<(), ConfigError> {
        for (name, enabled) in &self.collectors {
            registry.set_enabled(name, *enabled)?;
            tracing::debug!(collector = %name, enabled, "Collector override applied");
        }
        if self.disable_defaults {
            registry.disable_defaults();
        }
        Ok(())
    }

    /// Set an explicit override.
    pub fn with_collector(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.collectors.insert(name.into(), enabled);
        self
    }

    /// Set `disable_defaults`.
    pub fn with_disable_defaults(mut self, disable: bool) -> Self {
        self.disable_defaults = disable;
        self
    }

    /// Set the exporter version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}
