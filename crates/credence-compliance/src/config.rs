//! Compliance thresholds.
//!
//! Every field has a serde default so a partial YAML block only overrides
//! what it names.

use credence_core::{Amount, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};

use crate::error::ComplianceError;

/// Thresholds for the compliance gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Records a single provider may submit per UTC day.
    #[serde(default = "default_daily_provider_quota")]
    pub daily_provider_quota: u32,

    /// A single record amount strictly above this is flagged.
    #[serde(default = "default_large_amount_threshold")]
    pub large_amount_threshold: Amount,

    /// More than this many records for one subject inside the window is flagged.
    #[serde(default = "default_high_frequency_threshold")]
    pub high_frequency_threshold: u32,

    /// Trailing window for the high-frequency heuristic, in seconds.
    #[serde(default = "default_high_frequency_window_secs")]
    pub high_frequency_window_secs: i64,
}

fn default_daily_provider_quota() -> u32 {
    1000
}

fn default_large_amount_threshold() -> Amount {
    Amount::new(1_000_000)
}

fn default_high_frequency_threshold() -> u32 {
    10
}

fn default_high_frequency_window_secs() -> i64 {
    SECONDS_PER_DAY
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            daily_provider_quota: default_daily_provider_quota(),
            large_amount_threshold: default_large_amount_threshold(),
            high_frequency_threshold: default_high_frequency_threshold(),
            high_frequency_window_secs: default_high_frequency_window_secs(),
        }
    }
}

impl ComplianceConfig {
    /// Reject values that would make the gate meaningless.
    pub fn validate(&self) -> Result<(), ComplianceError> {
        if self.daily_provider_quota == 0 {
            return Err(ComplianceError::InvalidConfig(
                "daily_provider_quota must be positive".into(),
            ));
        }
        if self.high_frequency_window_secs <= 0 {
            return Err(ComplianceError::InvalidConfig(format!(
                "high_frequency_window_secs must be positive, got {}",
                self.high_frequency_window_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ComplianceConfig::default();
        assert_eq!(c.daily_provider_quota, 1000);
        assert_eq!(c.large_amount_threshold, Amount::new(1_000_000));
        assert_eq!(c.high_frequency_threshold, 10);
        assert_eq!(c.high_frequency_window_secs, 86_400);
        c.validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: ComplianceConfig =
            serde_json::from_str(r#"{"daily_provider_quota": 5}"#).unwrap();
        assert_eq!(c.daily_provider_quota, 5);
        assert_eq!(c.high_frequency_threshold, 10);
    }

    #[test]
    fn zero_quota_rejected() {
        let c = ComplianceConfig {
            daily_provider_quota: 0,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(ComplianceError::InvalidConfig(_))));
    }
}
