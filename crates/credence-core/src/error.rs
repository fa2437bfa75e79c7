//! # Error Taxonomy
//!
//! Every component crate defines its own `thiserror` enum with structured
//! fields (current state, attempted transition, deadline). Each of those
//! enums maps onto exactly one [`ErrorKind`] so hosts can translate failures
//! into status codes without matching on component internals.
//!
//! All errors are synchronous and leave engine state unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seven-way classification of every failure the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// Missing role, bad signature, or reused nonce.
    Authorization,
    /// Illegal transition for the entity's current state.
    State,
    /// KYC/AML incomplete, frozen profile, or quota exhausted.
    Compliance,
    /// Insufficient reserve, collateral, or balance.
    Resource,
    /// Unknown identifier or index.
    NotFound,
    /// Deadline not yet reached or already passed.
    Temporal,
}

impl ErrorKind {
    /// Stable label, used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::State => "state",
            Self::Compliance => "compliance",
            Self::Resource => "resource",
            Self::NotFound => "not_found",
            Self::Temporal => "temporal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the primitives in this crate.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A primitive value failed validation (bad timestamp, empty identifier).
    #[error("validation error: {0}")]
    Validation(String),

    /// Checked money arithmetic overflowed or underflowed.
    #[error("arithmetic overflow: {0}")]
    Overflow(String),
}

impl CoreError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be integers.
    #[error("float values are not permitted in canonical representations; use integer minor units: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_labels_are_snake_case() {
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }

    #[test]
    fn core_errors_classify_as_validation() {
        let err = CoreError::Overflow("amount".into());
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("overflow"));
    }
}
