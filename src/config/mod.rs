//! Configuration module for exporters.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Metric namespace and exporter identity
//! - Per-collector enable/disable overrides and the "disable defaults" switch
//! - Scrape limits

mod app;
mod validation;

pub use app::{DEFAULT_MAX_CONCURRENT_SCRAPES, ExporterConfig, ScrapeConfig};
pub use validation::{ConfigError, validate_name};
