//! # Engine Configuration
//!
//! One YAML document with a section per component. Every section and every
//! field has a default, so an empty document is a valid configuration:
//!
//! ```yaml
//! score:
//!   decay_period_days: 365
//! compliance:
//!   daily_provider_quota: 500
//! lending:
//!   interest_scaling: single_scale
//! ```

use std::path::Path;

use credence_compliance::ComplianceConfig;
use credence_lending::{LendingConfig, UnderwritingConfig};
use credence_score::ScoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "CREDENCE_CONFIG";

/// Configuration for every engine component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub score: ScoreConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default)]
    pub underwriting: UnderwritingConfig,
    #[serde(default)]
    pub lending: LendingConfig,
}

impl EngineConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&yaml)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load from `path` if given, else from `$CREDENCE_CONFIG` if set, else
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_path(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(Path::new(&path)),
            None => {
                tracing::debug!("no configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.score
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.compliance
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.underwriting
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.lending
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}
