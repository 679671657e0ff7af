//! Protocol configuration.
//!
//! [`ProtocolConfig`] is read from a JSON file (missing fields fall back to
//! defaults) and serves as the [`Rules`] handed to actions at execution time.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

use crate::action::{KeyMode, Rules, TRANSFER_COMPUTE_UNITS};

/// Asset value committed to by ephemeral-mode executions.
pub const DEFAULT_DEMO_ASSET_VALUE: u64 = 100;

/// Errors surfaced while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("config I/O error: {0}")]
    Io(String),
    /// The file was not valid configuration JSON.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A value was out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunable protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Compute units charged per transfer, regardless of outcome.
    pub compute_units: u64,
    /// Where the sender key material comes from.
    pub key_mode: KeyMode,
    /// Value committed to when keys are generated inside the action.
    pub demo_asset_value: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            compute_units: TRANSFER_COMPUTE_UNITS,
            key_mode: KeyMode::Ephemeral,
            demo_asset_value: DEFAULT_DEMO_ASSET_VALUE,
        }
    }
}

impl ProtocolConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from JSON; missing file -> defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.compute_units == 0 {
            return Err(ConfigError::Invalid(
                "compute_units must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl Rules for ProtocolConfig {
    fn transfer_compute_units(&self) -> u64 {
        self.compute_units
    }

    fn key_mode(&self) -> KeyMode {
        self.key_mode
    }

    fn demo_asset_value(&self) -> u64 {
        self.demo_asset_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ProtocolConfig::from_json(r#"{ "key_mode": "supplied" }"#).unwrap();
        assert_eq!(config.key_mode, KeyMode::Supplied);
        assert_eq!(config.compute_units, TRANSFER_COMPUTE_UNITS);
        assert_eq!(config.demo_asset_value, DEFAULT_DEMO_ASSET_VALUE);
    }

    #[test]
    fn test_rejects_zero_compute_units_and_unknown_fields() {
        assert!(matches!(
            ProtocolConfig::from_json(r#"{ "compute_units": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ProtocolConfig::from_json(r#"{ "fee": 1 }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("zk_transfer_missing_config.json");
        assert_eq!(
            ProtocolConfig::load(&path).unwrap(),
            ProtocolConfig::default()
        );
    }
}
