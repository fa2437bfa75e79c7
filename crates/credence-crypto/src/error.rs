use credence_core::ErrorKind;
use thiserror::Error;

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing failed.
    #[error("key error: {0}")]
    KeyError(String),
}

impl CryptoError {
    /// Every cryptographic failure is an authorization failure.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Authorization
    }
}
