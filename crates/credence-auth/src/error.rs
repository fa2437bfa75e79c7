use credence_core::{CanonicalizationError, ErrorKind, SubjectId};
use credence_crypto::CryptoError;
use thiserror::Error;

/// Errors raised while authenticating or authorizing a request.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The payload's domain tag is not the one this engine signs under.
    #[error("request domain mismatch: expected {expected:?}, got {actual:?}")]
    DomainMismatch {
        /// Expected domain tag.
        expected: String,
        /// Domain tag carried by the payload.
        actual: String,
    },

    /// The claimed signer has no registered key.
    #[error("unknown signer {0}")]
    UnknownSigner(SubjectId),

    /// The signature does not verify under the claimed signer's key.
    #[error("bad signature from {signer}: {source}")]
    BadSignature {
        /// Claimed signer.
        signer: SubjectId,
        /// Underlying verification failure.
        #[source]
        source: CryptoError,
    },

    /// The declared nonce has already been consumed.
    #[error("nonce {declared} for {subject} already consumed (current {current})")]
    NonceReused {
        /// Subject whose counter was checked.
        subject: SubjectId,
        /// Nonce carried by the request.
        declared: u64,
        /// Subject's current counter.
        current: u64,
    },

    /// The declared nonce is ahead of the subject's counter.
    #[error("nonce {declared} for {subject} does not match expected {expected}")]
    NonceMismatch {
        /// Subject whose counter was checked.
        subject: SubjectId,
        /// Nonce carried by the request.
        declared: u64,
        /// Nonce the engine expected.
        expected: u64,
    },

    /// The payload names a different subject than the operation targets.
    #[error("payload subject {declared} does not match operation subject {expected}")]
    SubjectMismatch {
        /// Subject declared in the payload.
        declared: SubjectId,
        /// Subject derived from the operation.
        expected: SubjectId,
    },

    /// A reservation was committed after the counter had moved on.
    #[error("stale nonce reservation for {subject}: reserved {reserved}, current {current}")]
    StaleReservation {
        /// Subject whose counter was reserved.
        subject: SubjectId,
        /// Reserved nonce.
        reserved: u64,
        /// Counter at commit time.
        current: u64,
    },

    /// The caller lacks every role the operation accepts.
    #[error("caller {caller} lacks required role (one of: {required})")]
    MissingRole {
        /// Caller identity.
        caller: SubjectId,
        /// Accepted roles, comma separated.
        required: String,
    },

    /// The caller may only act on their own resources.
    #[error("caller {caller} may not act on behalf of {owner}")]
    NotOwner {
        /// Caller identity.
        caller: SubjectId,
        /// Owner of the targeted resource.
        owner: SubjectId,
    },

    /// Mutations are halted by the emergency pause.
    #[error("emergency mode active: mutating operations are paused")]
    EmergencyModeActive,

    /// The payload could not be canonicalized.
    #[error("request payload is not canonicalizable: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl AuthError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmergencyModeActive | Self::StaleReservation { .. } => ErrorKind::State,
            Self::Canonicalization(_) => ErrorKind::Validation,
            _ => ErrorKind::Authorization,
        }
    }
}
