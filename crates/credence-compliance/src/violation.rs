//! # Compliance Violation Log
//!
//! Append-only record of every advisory flag and every profile freeze.
//! Entries are individually digestable via `CanonicalBytes` +
//! `sha256_digest`, so a host persisting the log can detect tampering.
//!
//! Upheld disputes reverse score effects only. Violations stay in the log.

use credence_core::{sha256_digest, Amount, CanonicalBytes, ContentDigest, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ViolationKind
// ---------------------------------------------------------------------------

/// What triggered a violation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A single record amount above the configured threshold.
    LargeAmount,
    /// Too many records for one subject inside the trailing window.
    HighFrequency,
    /// A compliance officer froze the profile.
    ProfileFrozen,
}

impl ViolationKind {
    /// Stable label, also used as the record's compliance flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LargeAmount => "large_amount",
            Self::HighFrequency => "high_frequency",
            Self::ProfileFrozen => "profile_frozen",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ComplianceViolation
// ---------------------------------------------------------------------------

/// A single entry in the violation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    /// Position in the log.
    pub sequence: u64,
    /// Subject the violation concerns.
    pub subject: SubjectId,
    /// What was flagged.
    pub kind: ViolationKind,
    /// Party whose action raised it (provider or officer).
    pub reported_by: SubjectId,
    /// Amount involved, when the trigger was a record.
    pub amount: Option<Amount>,
    /// Free-form detail.
    pub detail: String,
    /// When it was logged.
    pub timestamp: Timestamp,
}

impl ComplianceViolation {
    /// Content-addressed digest of this entry.
    ///
    /// Returns `None` if canonicalization fails, which cannot happen for
    /// well-formed entries since they carry no floats.
    pub fn digest(&self) -> Option<ContentDigest> {
        match CanonicalBytes::new(self) {
            Ok(canonical) => Some(sha256_digest(&canonical)),
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "violation canonicalization failed");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ViolationLog
// ---------------------------------------------------------------------------

/// Append-only violation log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationLog {
    entries: Vec<ComplianceViolation>,
}

impl ViolationLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, assigning its sequence number. Returns the stored entry.
    pub fn append(
        &mut self,
        subject: SubjectId,
        kind: ViolationKind,
        reported_by: SubjectId,
        amount: Option<Amount>,
        detail: impl Into<String>,
        timestamp: Timestamp,
    ) -> &ComplianceViolation {
        let entry = ComplianceViolation {
            sequence: self.entries.len() as u64,
            subject,
            kind,
            reported_by,
            amount,
            detail: detail.into(),
            timestamp,
        };
        tracing::warn!(
            subject = %entry.subject,
            kind = %entry.kind,
            reported_by = %entry.reported_by,
            "compliance violation logged"
        );
        metrics::counter!("credence_compliance_violations_total", "kind" => kind.as_str())
            .increment(1);
        let idx = self.entries.len();
        self.entries.push(entry);
        &self.entries[idx]
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[ComplianceViolation] {
        &self.entries
    }

    /// Entries concerning `subject`.
    pub fn for_subject<'a: 'b, 'b>(
        &'a self,
        subject: &'b SubjectId,
    ) -> impl Iterator<Item = &'a ComplianceViolation> + 'b {
        self.entries.iter().filter(move |e| &e.subject == subject)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
