//! Courier configuration
//!
//! Configuration is a plain serde struct with defaults for every field, so an
//! empty TOML document is a valid configuration.
//!
//! ```toml
//! service_type_prefix = "proxy-service"
//!
//! [auxiliary]
//! url = "offscreen.html"
//! reasons = ["DOM_PARSER"]
//! justification = "auxiliary_justification"
//! ```

use crate::effects::AuxiliaryConfig;
use crate::errors::{CourierError, Result};
use serde::{Deserialize, Serialize};

/// Default prefix of the reserved message type of every service
pub const DEFAULT_SERVICE_TYPE_PREFIX: &str = "proxy-service";

/// Workspace-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Prefix of the message type a service binder answers
    pub service_type_prefix: String,
    /// Default configuration for auxiliary contexts
    pub auxiliary: AuxiliaryConfig,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            service_type_prefix: DEFAULT_SERVICE_TYPE_PREFIX.to_string(),
            auxiliary: AuxiliaryConfig::default(),
        }
    }
}

impl CourierConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field constraints
    pub fn validate(&self) -> Result<()> {
        if self.service_type_prefix.is_empty() {
            return Err(CourierError::config("service_type_prefix cannot be empty"));
        }
        if self.service_type_prefix.chars().any(char::is_whitespace) {
            return Err(CourierError::config(
                "service_type_prefix cannot contain whitespace",
            ));
        }
        if self.auxiliary.url.is_empty() {
            return Err(CourierError::config("auxiliary.url cannot be empty"));
        }
        Ok(())
    }

    /// Reserved message type for the service registered under `name`
    pub fn service_message_type(&self, name: &str) -> String {
        format!("{}.{name}", self.service_type_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = CourierConfig::from_toml_str("").unwrap();
        assert_eq!(config, CourierConfig::default());
        assert_eq!(config.service_message_type("math"), "proxy-service.math");
    }

    #[test]
    fn test_partial_override() {
        let config = CourierConfig::from_toml_str(
            r#"
            service_type_prefix = "rpc"

            [auxiliary]
            url = "parser.html"
            "#,
        )
        .unwrap();
        assert_eq!(config.service_message_type("math"), "rpc.math");
        assert_eq!(config.auxiliary.url, "parser.html");
        assert_eq!(config.auxiliary.reasons, vec!["DOM_PARSER".to_string()]);
    }

    #[test]
    fn test_validation() {
        let err = CourierConfig::from_toml_str(r#"service_type_prefix = "has space""#).unwrap_err();
        assert_matches!(err, CourierError::Config { .. });

        let err = CourierConfig::from_toml_str("service_type_prefix = 3").unwrap_err();
        assert_matches!(err, CourierError::Config { .. });
    }
}
