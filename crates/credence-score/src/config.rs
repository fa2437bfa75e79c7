use serde::{Deserialize, Serialize};

use crate::error::ScoreError;

/// Tunables for profile scoring and record retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Days without decay after which the next update applies decay.
    #[serde(default = "default_decay_period_days")]
    pub decay_period_days: u32,

    /// Days a record stays current for history reads.
    #[serde(default = "default_record_retention_days")]
    pub record_retention_days: u32,

    /// Days after a record's timestamp during which its subject may dispute it.
    #[serde(default = "default_dispute_window_days")]
    pub dispute_window_days: u32,
}

fn default_decay_period_days() -> u32 {
    365
}

fn default_record_retention_days() -> u32 {
    2555
}

fn default_dispute_window_days() -> u32 {
    90
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            decay_period_days: default_decay_period_days(),
            record_retention_days: default_record_retention_days(),
            dispute_window_days: default_dispute_window_days(),
        }
    }
}

impl ScoreConfig {
    /// Reject zero-length periods.
    pub fn validate(&self) -> Result<(), ScoreError> {
        for (name, value) in [
            ("decay_period_days", self.decay_period_days),
            ("record_retention_days", self.record_retention_days),
            ("dispute_window_days", self.dispute_window_days),
        ] {
            if value == 0 {
                return Err(ScoreError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}
