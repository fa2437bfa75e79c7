use credence_core::{ErrorKind, SubjectId};
use thiserror::Error;

/// Errors raised by the compliance gate.
#[derive(Error, Debug)]
pub enum ComplianceError {
    /// Provider-initiated mutation against a frozen profile.
    #[error("credit profile of {subject} is frozen")]
    ProfileFrozen {
        /// The frozen subject.
        subject: SubjectId,
    },

    /// The provider has exhausted its quota for the current UTC day.
    #[error("provider {provider} exceeded daily quota of {limit} records (utc day {day})")]
    QuotaExceeded {
        /// The submitting provider.
        provider: SubjectId,
        /// UTC day number (`epoch_secs / 86400`).
        day: i64,
        /// Configured cap.
        limit: u32,
    },

    /// Configuration values are inconsistent.
    #[error("invalid compliance configuration: {0}")]
    InvalidConfig(String),
}

impl ComplianceError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProfileFrozen { .. } | Self::QuotaExceeded { .. } => ErrorKind::Compliance,
            Self::InvalidConfig(_) => ErrorKind::Validation,
        }
    }
}
