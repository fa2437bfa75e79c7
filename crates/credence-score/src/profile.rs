//! Credit profiles and the score-to-risk mapping.

use credence_core::{SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

/// Lowest attainable score.
pub const MIN_SCORE: u16 = 300;
/// Highest attainable score.
pub const MAX_SCORE: u16 = 850;
/// Score of a freshly created profile, and the decay pivot.
pub const INITIAL_SCORE: u16 = 500;
/// Risk level of a freshly created profile.
pub const INITIAL_RISK_LEVEL: u8 = 3;
/// Largest permitted magnitude of a single record's impact.
pub const MAX_IMPACT: i32 = 50;

/// Risk level for a score: 1 (lowest risk) to 5.
pub fn risk_level_for(score: u16) -> u8 {
    match score {
        750.. => 1,
        650..=749 => 2,
        550..=649 => 3,
        450..=549 => 4,
        _ => 5,
    }
}

/// Identity verification state of a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    /// Not yet verified.
    #[default]
    Pending,
    /// Verified by a compliance officer.
    Verified,
    /// Verification failed.
    Rejected,
}

impl KycStatus {
    /// Stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for KycStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subject's credit profile. Created on the first record, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditProfile {
    /// The profile's subject.
    pub subject: SubjectId,
    /// Current score, always in `[MIN_SCORE, MAX_SCORE]`.
    pub score: u16,
    /// Last time any field changed.
    pub last_updated: Timestamp,
    /// Records posted against this profile.
    pub record_count: u64,
    /// Whether provider-initiated updates are blocked.
    pub frozen: bool,
    /// Last time decay was evaluated.
    pub last_decay_at: Timestamp,
    /// Risk level derived from `score`.
    pub risk_level: u8,
    /// KYC state.
    pub kyc_status: KycStatus,
}

impl CreditProfile {
    /// A fresh profile at the initial score.
    pub fn new(subject: SubjectId, now: Timestamp) -> Self {
        Self {
            subject,
            score: INITIAL_SCORE,
            last_updated: now,
            record_count: 0,
            frozen: false,
            last_decay_at: now,
            risk_level: INITIAL_RISK_LEVEL,
            kyc_status: KycStatus::Pending,
        }
    }

    /// Whether KYC has been verified.
    pub fn is_kyc_verified(&self) -> bool {
        self.kyc_status == KycStatus::Verified
    }
}
