//! # Money and Rate Newtypes
//!
//! `Amount` is a non-negative quantity in integer minor units; `Bps` is a
//! rate or ratio in basis points (hundredths of a percent). Floats never
//! appear in money paths: canonical payloads reject them and every
//! rate application floors an exact `u128` intermediate back to `u64`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Basis points in one whole (100%).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// A monetary amount in minor units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(pub u64);

impl Amount {
    /// Zero minor units.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a raw minor-unit value.
    pub const fn new(minor_units: u64) -> Self {
        Self(minor_units)
    }

    /// The raw minor-unit value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Whether this amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Amount) -> Result<Amount, CoreError> {
        self.0
            .checked_add(rhs.0)
            .map(Amount)
            .ok_or_else(|| CoreError::Overflow(format!("{self} + {rhs}")))
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Amount) -> Result<Amount, CoreError> {
        self.0
            .checked_sub(rhs.0)
            .map(Amount)
            .ok_or_else(|| CoreError::Overflow(format!("{self} - {rhs}")))
    }

    /// Subtraction floored at zero.
    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }

    /// `self × bps / 10000`, floored.
    pub fn apply_bps(self, bps: Bps) -> Amount {
        let scaled = u128::from(self.0) * u128::from(bps.0) / u128::from(BPS_DENOMINATOR);
        Amount(u64::try_from(scaled).unwrap_or(u64::MAX))
    }

    /// The smaller of two amounts.
    pub fn min(self, other: Amount) -> Amount {
        if self <= other {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rate or ratio expressed in basis points.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Bps(pub u32);

impl Bps {
    /// 100%.
    pub const WHOLE: Bps = Bps(10_000);

    /// The raw basis-point value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Whether the value is at most 100%.
    pub fn is_fraction(&self) -> bool {
        u64::from(self.0) <= BPS_DENOMINATOR
    }
}

impl std::fmt::Display for Bps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}bps", self.0)
    }
}
