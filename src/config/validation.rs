//! Configuration validation utilities.

use thiserror::Error;

use crate::collector::RegistryError;
use crate::metric::validate_metric_name;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),

    /// Configuration refers to collectors the registry does not know.
    #[error("collector config error: {0}")]
    Registry(#[from] RegistryError),
}

/// Check that `value` can be used as a metric name prefix.
pub fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{field} cannot be empty"
        )));
    }
    validate_metric_name(value)
        .map_err(|_| ConfigError::ValidationError(format!("invalid {field}: '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("namespace", "node").is_ok());
        assert!(validate_name("namespace", "node_exporter").is_ok());
        assert!(validate_name("namespace", "").is_err());
        assert!(validate_name("namespace", "node-exporter").is_err());

        let err = validate_name("exporter_name", "9lives").unwrap_err();
        assert!(err.to_string().contains("invalid exporter_name"));
    }
}
