//! # Domain Events
//!
//! Every accepted mutation yields one or more [`DomainEvent`]s. The engine
//! stages them while a request executes and hands them to the injected
//! [`EventSink`] only after the request has committed, wrapped in an
//! [`EventEnvelope`] carrying a random id and a gapless sequence number.
//! A rejected request publishes nothing.

use credence_compliance::ViolationKind;
use credence_core::{
    sha256_digest, Amount, ApplicationId, Bps, CanonicalBytes, ContentDigest, DisputeId, EventId,
    LoanId, RecordId, SubjectId, Timestamp,
};
use credence_lending::RiskTier;
use credence_score::{KycStatus, RecordType};
use serde::{Deserialize, Serialize};

/// Something that happened inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DomainEvent {
    // ── Credit ────────────────────────────────────────────────────────
    RecordAdded {
        subject: SubjectId,
        record_id: RecordId,
        record_index: usize,
        provider: SubjectId,
        record_type: RecordType,
        amount: Amount,
        score_impact: i32,
        compliance_flags: Vec<String>,
    },
    ScoreUpdated {
        subject: SubjectId,
        old_score: u16,
        new_score: u16,
        decay: u16,
        risk_level: u8,
        reason: String,
    },
    RecordRepaid {
        subject: SubjectId,
        record_id: RecordId,
        provider: SubjectId,
    },
    DisputeRaised {
        dispute_id: DisputeId,
        subject: SubjectId,
        record_id: RecordId,
        reason: String,
    },
    DisputeResolved {
        dispute_id: DisputeId,
        subject: SubjectId,
        upheld: bool,
        resolution: String,
        resolver: SubjectId,
    },
    ComplianceViolation {
        sequence: u64,
        subject: SubjectId,
        kind: ViolationKind,
        reported_by: SubjectId,
        detail: String,
        digest: Option<String>,
    },
    ProfileFrozen {
        subject: SubjectId,
        officer: SubjectId,
        reason: String,
    },
    ProfileUnfrozen {
        subject: SubjectId,
        officer: SubjectId,
    },
    KycStatusChanged {
        subject: SubjectId,
        previous: KycStatus,
        status: KycStatus,
    },

    // ── Lending ───────────────────────────────────────────────────────
    ApplicationSubmitted {
        application_id: ApplicationId,
        applicant: SubjectId,
        requested_amount: Amount,
        credit_score_snapshot: u16,
    },
    ComplianceCheckCompleted {
        application_id: ApplicationId,
        officer: SubjectId,
        kyc_verified: bool,
        aml_cleared: bool,
    },
    LoanApproved {
        loan_id: LoanId,
        application_id: ApplicationId,
        borrower: SubjectId,
        principal: Amount,
        interest_rate_bps: Bps,
        risk_tier: Option<RiskTier>,
        collateral_required: bool,
    },
    LoanFunded {
        loan_id: LoanId,
        borrower: SubjectId,
        net_disbursed: Amount,
        origination_fee: Amount,
        due_at: Timestamp,
    },
    PaymentMade {
        loan_id: LoanId,
        payer: SubjectId,
        amount: Amount,
        principal_portion: Amount,
        interest_portion: Amount,
        fees_portion: Amount,
        unapplied: Amount,
        late: bool,
    },
    LoanRepaid {
        loan_id: LoanId,
        borrower: SubjectId,
    },
    LoanDefaulted {
        loan_id: LoanId,
        borrower: SubjectId,
        outstanding: Amount,
    },
    LoanLiquidated {
        loan_id: LoanId,
        borrower: SubjectId,
        recovered: Amount,
        loss: Amount,
    },
    LoanCancelled {
        loan_id: LoanId,
        borrower: SubjectId,
        reason: String,
    },
    CollateralDeposited {
        loan_id: LoanId,
        amount: Amount,
        total: Amount,
        token_ref: String,
    },
    CollateralReleased {
        loan_id: LoanId,
        borrower: SubjectId,
        amount: Amount,
    },
    LiquidityProvided {
        provider: SubjectId,
        amount: Amount,
        reserve: Amount,
    },

    // ── Administration ────────────────────────────────────────────────
    PauseChanged {
        paused: bool,
        by: SubjectId,
    },
}

impl DomainEvent {
    /// The `event_type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RecordAdded { .. } => "record_added",
            Self::ScoreUpdated { .. } => "score_updated",
            Self::RecordRepaid { .. } => "record_repaid",
            Self::DisputeRaised { .. } => "dispute_raised",
            Self::DisputeResolved { .. } => "dispute_resolved",
            Self::ComplianceViolation { .. } => "compliance_violation",
            Self::ProfileFrozen { .. } => "profile_frozen",
            Self::ProfileUnfrozen { .. } => "profile_unfrozen",
            Self::KycStatusChanged { .. } => "kyc_status_changed",
            Self::ApplicationSubmitted { .. } => "application_submitted",
            Self::ComplianceCheckCompleted { .. } => "compliance_check_completed",
            Self::LoanApproved { .. } => "loan_approved",
            Self::LoanFunded { .. } => "loan_funded",
            Self::PaymentMade { .. } => "payment_made",
            Self::LoanRepaid { .. } => "loan_repaid",
            Self::LoanDefaulted { .. } => "loan_defaulted",
            Self::LoanLiquidated { .. } => "loan_liquidated",
            Self::LoanCancelled { .. } => "loan_cancelled",
            Self::CollateralDeposited { .. } => "collateral_deposited",
            Self::CollateralReleased { .. } => "collateral_released",
            Self::LiquidityProvided { .. } => "liquidity_provided",
            Self::PauseChanged { .. } => "pause_changed",
        }
    }
}

/// A published event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Random identifier.
    pub event_id: EventId,
    /// Position in the engine's event stream, starting at zero.
    pub sequence: u64,
    /// Logical time of the request that produced it.
    pub occurred_at: Timestamp,
    #[serde(flatten)]
    pub event: DomainEvent,
}

impl EventEnvelope {
    /// SHA-256 over the canonical form of this envelope.
    pub fn digest(&self) -> Option<ContentDigest> {
        match CanonicalBytes::new(self) {
            Ok(canonical) => Some(sha256_digest(&canonical)),
            Err(e) => {
                tracing::warn!(sequence = self.sequence, error = %e, "event canonicalization failed");
                None
            }
        }
    }
}

// ── Sinks ─────────────────────────────────────────────────────────────

/// Receiver of committed events.
pub trait EventSink {
    fn publish(&mut self, envelope: &EventEnvelope);
}

/// Publish to both sinks, first then second.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn publish(&mut self, envelope: &EventEnvelope) {
        self.0.publish(envelope);
        self.1.publish(envelope);
    }
}

/// Append-only in-memory outbox.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outbox {
    events: Vec<EventEnvelope>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events not yet drained, oldest first.
    pub fn events(&self) -> &[EventEnvelope] {
        &self.events
    }

    /// Remove and return every pending event.
    pub fn drain(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for Outbox {
    fn publish(&mut self, envelope: &EventEnvelope) {
        self.events.push(envelope.clone());
    }
}

/// Logs each event at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&mut self, envelope: &EventEnvelope) {
        tracing::info!(
            event_id = %envelope.event_id,
            sequence = envelope.sequence,
            event_type = envelope.event.name(),
            "domain event"
        );
    }
}
