//! # Operations
//!
//! The mutating operations a signed request can carry, the role each
//! requires, and what each returns.

use credence_auth::{Requirement, Role, SignedRequest};
use credence_core::{Amount, ApplicationId, DisputeId, LoanId, RecordId, SubjectId};
use credence_lending::{
    ApplicationRequest, CancelOutcome, ComplianceCheck, ComplianceCheckInput, DefaultOutcome,
    FundingOutcome, LiquidationOutcome, Loan, LoanApplication, PaymentOutcome, UnderwritingTerms,
};
use credence_compliance::ViolationKind;
use credence_score::{Dispute, DisputeResolution, KycStatus, RecordType, ScoreUpdate};
use serde::{Deserialize, Serialize};

/// A request as submitted to the engine.
pub type EngineRequest = SignedRequest<Operation>;

const PROVIDER: &[Role] = &[Role::DataProvider];
const COMPLIANCE: &[Role] = &[Role::ComplianceOfficer];
const UNDERWRITER: &[Role] = &[Role::Underwriter];
const LOAN_OFFICER: &[Role] = &[Role::LoanOfficer];

fn default_method() -> String {
    "transfer".to_string()
}

/// A mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    AddCreditRecord {
        subject: SubjectId,
        amount: Amount,
        record_type: RecordType,
        score_impact: i32,
        #[serde(default)]
        data_hash_ref: String,
    },
    MarkRepaid {
        subject: SubjectId,
        record_index: usize,
    },
    DisputeRecord {
        subject: SubjectId,
        record_index: usize,
        reason: String,
    },
    ResolveDispute {
        dispute_id: DisputeId,
        upheld: bool,
        resolution: String,
    },
    FreezeProfile {
        subject: SubjectId,
        reason: String,
    },
    UnfreezeProfile {
        subject: SubjectId,
    },
    SetKycStatus {
        subject: SubjectId,
        status: KycStatus,
    },
    SubmitLoanApplication {
        application: ApplicationRequest,
    },
    CompleteComplianceCheck {
        application_id: ApplicationId,
        check: ComplianceCheckInput,
    },
    UnderwriteLoan {
        application_id: ApplicationId,
        terms: UnderwritingTerms,
    },
    FundLoan {
        loan_id: LoanId,
    },
    MakePayment {
        loan_id: LoanId,
        amount: Amount,
        #[serde(default = "default_method")]
        method: String,
    },
    DepositCollateral {
        loan_id: LoanId,
        amount: Amount,
        token_ref: String,
    },
    MarkLoanAsDefaulted {
        loan_id: LoanId,
    },
    LiquidateLoan {
        loan_id: LoanId,
    },
    CancelLoan {
        loan_id: LoanId,
        reason: String,
    },
    ProvideLiquidity {
        amount: Amount,
    },
    SetPaused {
        paused: bool,
    },
}

impl Operation {
    /// The `op` tag, also used as a metric label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddCreditRecord { .. } => "add_credit_record",
            Self::MarkRepaid { .. } => "mark_repaid",
            Self::DisputeRecord { .. } => "dispute_record",
            Self::ResolveDispute { .. } => "resolve_dispute",
            Self::FreezeProfile { .. } => "freeze_profile",
            Self::UnfreezeProfile { .. } => "unfreeze_profile",
            Self::SetKycStatus { .. } => "set_kyc_status",
            Self::SubmitLoanApplication { .. } => "submit_loan_application",
            Self::CompleteComplianceCheck { .. } => "complete_compliance_check",
            Self::UnderwriteLoan { .. } => "underwrite_loan",
            Self::FundLoan { .. } => "fund_loan",
            Self::MakePayment { .. } => "make_payment",
            Self::DepositCollateral { .. } => "deposit_collateral",
            Self::MarkLoanAsDefaulted { .. } => "mark_loan_as_defaulted",
            Self::LiquidateLoan { .. } => "liquidate_loan",
            Self::CancelLoan { .. } => "cancel_loan",
            Self::ProvideLiquidity { .. } => "provide_liquidity",
            Self::SetPaused { .. } => "set_paused",
        }
    }

    /// What the caller must hold. Ownership rules (record subject,
    /// borrower) are enforced by the component that knows the owner.
    pub fn requirement(&self) -> Requirement {
        match self {
            Self::AddCreditRecord { .. } | Self::MarkRepaid { .. } => Requirement::AnyOf(PROVIDER),
            Self::ResolveDispute { .. }
            | Self::FreezeProfile { .. }
            | Self::UnfreezeProfile { .. }
            | Self::SetKycStatus { .. }
            | Self::CompleteComplianceCheck { .. } => Requirement::AnyOf(COMPLIANCE),
            Self::UnderwriteLoan { .. } => Requirement::AnyOf(UNDERWRITER),
            Self::FundLoan { .. }
            | Self::MarkLoanAsDefaulted { .. }
            | Self::LiquidateLoan { .. }
            | Self::ProvideLiquidity { .. } => Requirement::AnyOf(LOAN_OFFICER),
            Self::DisputeRecord { .. }
            | Self::SubmitLoanApplication { .. }
            | Self::MakePayment { .. }
            | Self::DepositCollateral { .. }
            | Self::CancelLoan { .. } => Requirement::Authenticated,
            Self::SetPaused { .. } => Requirement::PauseControl,
        }
    }
}

/// What an accepted operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    RecordAdded {
        update: ScoreUpdate,
        flags: Vec<ViolationKind>,
    },
    RecordRepaid {
        record_id: RecordId,
        update: ScoreUpdate,
    },
    DisputeOpened(Dispute),
    DisputeResolved(DisputeResolution),
    ProfileFrozen {
        subject: SubjectId,
    },
    ProfileUnfrozen {
        subject: SubjectId,
    },
    KycStatusSet {
        subject: SubjectId,
        previous: KycStatus,
    },
    ApplicationSubmitted(LoanApplication),
    ComplianceCheckCompleted(ComplianceCheck),
    LoanApproved(Loan),
    LoanFunded(FundingOutcome),
    PaymentMade(PaymentOutcome),
    CollateralDeposited {
        loan_id: LoanId,
        total: Amount,
    },
    LoanDefaulted(DefaultOutcome),
    LoanLiquidated(LiquidationOutcome),
    LoanCancelled(CancelOutcome),
    LiquidityProvided {
        reserve: Amount,
    },
    PauseSet {
        paused: bool,
        changed: bool,
    },
}
