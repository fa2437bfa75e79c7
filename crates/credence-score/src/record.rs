//! Credit records. Append-only; `repaid` and `disputed` flip at most once.

use credence_core::{Amount, RecordId, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

/// Kind of financial event a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    /// A loan was taken out.
    Loan,
    /// A scheduled payment was made on time.
    Payment,
    /// An obligation was repaid in full.
    Repayment,
    /// A payment arrived late.
    LatePayment,
    /// The subject defaulted.
    Default,
    /// A compensating entry, for example an upheld dispute.
    Adjustment,
    /// Anything else a provider reports.
    Other,
}

impl RecordType {
    /// Stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loan => "LOAN",
            Self::Payment => "PAYMENT",
            Self::Repayment => "REPAYMENT",
            Self::LatePayment => "LATE_PAYMENT",
            Self::Default => "DEFAULT",
            Self::Adjustment => "ADJUSTMENT",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-supplied fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Amount involved, in minor units.
    pub amount: Amount,
    /// What happened.
    pub record_type: RecordType,
    /// Signed score effect, `[-50, 50]`.
    pub score_impact: i32,
    /// Reference to off-engine supporting data.
    #[serde(default)]
    pub data_hash_ref: String,
}

/// A stored credit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRecord {
    /// Arena key.
    pub id: RecordId,
    /// Subject the record is about.
    pub subject: SubjectId,
    /// When it was posted.
    pub timestamp: Timestamp,
    /// Amount involved.
    pub amount: Amount,
    /// Whether the obligation was marked repaid.
    pub repaid: bool,
    /// When it was marked repaid.
    pub repayment_timestamp: Option<Timestamp>,
    /// Who posted it.
    pub provider: SubjectId,
    /// What happened.
    pub record_type: RecordType,
    /// Signed score effect applied when it was posted.
    pub score_impact: i32,
    /// Reference to off-engine supporting data.
    pub data_hash_ref: String,
    /// Whether the subject has disputed it.
    pub disputed: bool,
    /// End of the retention period.
    pub expiry_at: Timestamp,
    /// Advisory compliance flags raised at admission.
    pub compliance_flags: Vec<String>,
}

impl CreditRecord {
    /// Whether the retention period has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expiry_at
    }
}
