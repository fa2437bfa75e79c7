//! Underwriting limits and lifecycle timing.

use credence_core::{Amount, Bps};
use serde::{Deserialize, Serialize};

use crate::error::LendingError;

/// How the daily interest rate is scaled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestScaling {
    /// `outstanding × rate_bps × days / (365 × 10000)`, one exact division.
    #[default]
    SingleScale,
    /// Integer daily rate `rate_bps / 365 / 10000`, then a second `/ 10000`.
    /// Truncates to zero for any rate below 3,650,000 bps.
    DoubleScale,
}

/// Limits applied at intake and underwriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderwritingConfig {
    /// Lowest score snapshot that may be underwritten.
    #[serde(default = "default_min_credit_score")]
    pub min_credit_score: u16,

    /// Highest debt-to-income ratio that may be underwritten.
    #[serde(default = "default_max_debt_to_income_bps")]
    pub max_debt_to_income_bps: Bps,

    /// Global cap on annual interest rates.
    #[serde(default = "default_max_interest_rate_bps")]
    pub max_interest_rate_bps: Bps,

    /// Smallest amount an application may request.
    #[serde(default = "default_min_loan_amount")]
    pub min_loan_amount: Amount,

    /// Largest amount an application may request.
    #[serde(default = "default_max_loan_amount")]
    pub max_loan_amount: Amount,

    /// Shortest term an application may request.
    #[serde(default = "default_min_term_days")]
    pub min_term_days: u32,

    /// Longest term an application may request.
    #[serde(default = "default_max_term_days")]
    pub max_term_days: u32,
}

fn default_min_credit_score() -> u16 {
    500
}

fn default_max_debt_to_income_bps() -> Bps {
    Bps(4300)
}

fn default_max_interest_rate_bps() -> Bps {
    Bps(3600)
}

fn default_min_loan_amount() -> Amount {
    Amount::new(100)
}

fn default_max_loan_amount() -> Amount {
    Amount::new(10_000_000)
}

fn default_min_term_days() -> u32 {
    30
}

fn default_max_term_days() -> u32 {
    3650
}

impl Default for UnderwritingConfig {
    fn default() -> Self {
        Self {
            min_credit_score: default_min_credit_score(),
            max_debt_to_income_bps: default_max_debt_to_income_bps(),
            max_interest_rate_bps: default_max_interest_rate_bps(),
            min_loan_amount: default_min_loan_amount(),
            max_loan_amount: default_max_loan_amount(),
            min_term_days: default_min_term_days(),
            max_term_days: default_max_term_days(),
        }
    }
}

impl UnderwritingConfig {
    /// Reject empty ranges.
    pub fn validate(&self) -> Result<(), LendingError> {
        if self.min_loan_amount.is_zero() || self.min_loan_amount > self.max_loan_amount {
            return Err(LendingError::InvalidConfig(format!(
                "loan amount range [{}, {}] is empty or starts at zero",
                self.min_loan_amount, self.max_loan_amount
            )));
        }
        if self.min_term_days == 0 || self.min_term_days > self.max_term_days {
            return Err(LendingError::InvalidConfig(format!(
                "term range [{}, {}] is empty or starts at zero",
                self.min_term_days, self.max_term_days
            )));
        }
        if !self.max_debt_to_income_bps.is_fraction() {
            return Err(LendingError::InvalidConfig(
                "max_debt_to_income_bps must not exceed 10000".into(),
            ));
        }
        Ok(())
    }
}

/// Timing and reserve rules for the loan lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingConfig {
    /// Pool reserve required at funding, as a multiple of principal.
    #[serde(default = "default_reserve_ratio_bps")]
    pub reserve_ratio_bps: Bps,

    /// Days past the next due date before a loan may be defaulted.
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: u32,

    /// Days past the next due date before a defaulted loan may be liquidated.
    #[serde(default = "default_liquidation_threshold_days")]
    pub liquidation_threshold_days: u32,

    /// Days between scheduled payments.
    #[serde(default = "default_payment_interval_days")]
    pub payment_interval_days: u32,

    /// Interest scaling mode.
    #[serde(default)]
    pub interest_scaling: InterestScaling,
}

fn default_reserve_ratio_bps() -> Bps {
    Bps::WHOLE
}

fn default_grace_period_days() -> u32 {
    30
}

fn default_liquidation_threshold_days() -> u32 {
    90
}

fn default_payment_interval_days() -> u32 {
    30
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            reserve_ratio_bps: default_reserve_ratio_bps(),
            grace_period_days: default_grace_period_days(),
            liquidation_threshold_days: default_liquidation_threshold_days(),
            payment_interval_days: default_payment_interval_days(),
            interest_scaling: InterestScaling::default(),
        }
    }
}

impl LendingConfig {
    /// The reserve must cover at least the full principal, and the
    /// liquidation threshold cannot precede the grace period.
    pub fn validate(&self) -> Result<(), LendingError> {
        if self.reserve_ratio_bps < Bps::WHOLE {
            return Err(LendingError::InvalidConfig(format!(
                "reserve_ratio_bps must be at least 10000, got {}",
                self.reserve_ratio_bps.value()
            )));
        }
        if self.payment_interval_days == 0 {
            return Err(LendingError::InvalidConfig(
                "payment_interval_days must be positive".into(),
            ));
        }
        if self.liquidation_threshold_days < self.grace_period_days {
            return Err(LendingError::InvalidConfig(format!(
                "liquidation_threshold_days ({}) precedes grace_period_days ({})",
                self.liquidation_threshold_days, self.grace_period_days
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        UnderwritingConfig::default().validate().unwrap();
        LendingConfig::default().validate().unwrap();
        assert_eq!(LendingConfig::default().interest_scaling, InterestScaling::SingleScale);
    }

    #[test]
    fn fractional_reserve_rejected() {
        let c = LendingConfig {
            reserve_ratio_bps: Bps(9_999),
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(LendingError::InvalidConfig(_))));
    }

    #[test]
    fn inverted_amount_range_rejected() {
        let c = UnderwritingConfig {
            min_loan_amount: Amount::new(500),
            max_loan_amount: Amount::new(100),
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn scaling_parses_snake_case() {
        let c: LendingConfig = serde_json::from_str(r#"{"interest_scaling":"double_scale"}"#).unwrap();
        assert_eq!(c.interest_scaling, InterestScaling::DoubleScale);
        assert_eq!(c.grace_period_days, 30);
    }
}
