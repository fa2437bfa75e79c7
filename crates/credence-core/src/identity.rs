//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier in the engine. These prevent
//! accidental identifier confusion: you cannot pass a `LoanId` where a
//! `RecordId` is expected.
//!
//! `SubjectId` is issued by the external identity collaborator and is an
//! opaque string. Record, dispute, application, and loan identifiers are
//! issued by the engine from monotonic sequences so that replaying the same
//! request stream yields the same identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// A party known to the identity collaborator: borrower, data provider,
/// officer, or auditor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(String);

impl SubjectId {
    /// Create a subject identifier, rejecting empty or whitespace-padded input.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::Validation("subject id must not be empty".into()));
        }
        if id.trim() != id {
            return Err(CoreError::Validation(format!(
                "subject id must not carry surrounding whitespace: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Access the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! sequence_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            /// The identifier following this one in its sequence.
            pub fn next(&self) -> Self {
                Self(self.0.saturating_add(1))
            }

            /// The raw sequence number.
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

sequence_id!(
    /// Arena key of a credit record.
    RecordId,
    "record"
);
sequence_id!(
    /// Identifier of a dispute raised against a credit record.
    DisputeId,
    "dispute"
);
sequence_id!(
    /// Identifier of a loan application.
    ApplicationId,
    "application"
);
sequence_id!(
    /// Identifier of an underwritten loan.
    LoanId,
    "loan"
);

/// Unique identifier of an emitted domain event envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Generate a new random event identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_id_rejects_empty_and_padded() {
        assert!(SubjectId::new("").is_err());
        assert!(SubjectId::new(" alice").is_err());
        assert_eq!(SubjectId::new("alice").unwrap().as_str(), "alice");
    }

    #[test]
    fn sequence_ids_display_with_prefix() {
        assert_eq!(LoanId(7).to_string(), "loan:7");
        assert_eq!(RecordId(0).next(), RecordId(1));
    }

    #[test]
    fn subject_id_serializes_transparently_as_string() {
        let id = SubjectId::new("bob").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"bob\"");
    }
}
