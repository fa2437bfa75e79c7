use std::path::PathBuf;

use credence_auth::AuthError;
use credence_compliance::ComplianceError;
use credence_core::ErrorKind;
use credence_lending::{LendingError, UnderwritingError};
use credence_score::{DisputeError, ScoreError};
use thiserror::Error;

/// Failure to load engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read configuration {path}: {source}")]
    Read {
        /// File that was attempted.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML for [`EngineConfig`](crate::EngineConfig).
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A section failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Any failure of an engine call. Component errors pass through unchanged
/// and keep their classification.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Dispute(#[from] DisputeError),

    #[error(transparent)]
    Lending(#[from] LendingError),

    #[error(transparent)]
    Underwriting(#[from] UnderwritingError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(e) => e.kind(),
            Self::Compliance(e) => e.kind(),
            Self::Score(e) => e.kind(),
            Self::Dispute(e) => e.kind(),
            Self::Lending(e) => e.kind(),
            Self::Underwriting(e) => e.kind(),
            Self::Config(ConfigError::Read { .. }) => ErrorKind::Resource,
            Self::Config(_) => ErrorKind::Validation,
        }
    }
}
