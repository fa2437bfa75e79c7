use credence_core::{Amount, ApplicationId, Bps, CoreError, ErrorKind, LoanId, SubjectId, Timestamp};
use thiserror::Error;

/// Reasons an application cannot be underwritten. Each is raised before any
/// loan exists.
#[derive(Error, Debug)]
pub enum UnderwritingError {
    /// No application with this id.
    #[error("{0} not found")]
    ApplicationNotFound(ApplicationId),

    /// The application already produced a loan.
    #[error("{application} was already underwritten as {loan}")]
    AlreadyUnderwritten {
        /// The application.
        application: ApplicationId,
        /// The loan it produced.
        loan: LoanId,
    },

    /// The applicant's KYC has not been completed.
    #[error("KYC not completed for {0}")]
    KycNotCompleted(ApplicationId),

    /// No compliance check, or KYC/AML not cleared.
    #[error("compliance check failed for {application}: {reason}")]
    ComplianceCheckFailed {
        /// The application.
        application: ApplicationId,
        /// What was missing.
        reason: String,
    },

    /// Requested rate above the global cap.
    #[error("interest rate {requested} exceeds limit {limit}")]
    InterestRateExceedsLimit {
        /// Rate chosen by the underwriter.
        requested: Bps,
        /// Configured cap.
        limit: Bps,
    },

    /// Score snapshot below the underwriting minimum.
    #[error("credit score {score} below minimum {minimum}")]
    InsufficientCreditScore {
        /// Snapshot taken at intake.
        score: u16,
        /// Configured minimum.
        minimum: u16,
    },

    /// Debt-to-income ratio above the underwriting maximum.
    #[error("debt-to-income {ratio} exceeds maximum {maximum}")]
    ExcessiveDebtToIncome {
        /// Declared ratio.
        ratio: Bps,
        /// Configured maximum.
        maximum: Bps,
    },

    /// The underwriter's terms are inconsistent with the application.
    #[error("invalid loan terms: {0}")]
    InvalidTerms(String),
}

impl UnderwritingError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ApplicationNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyUnderwritten { .. } => ErrorKind::State,
            Self::KycNotCompleted(_) | Self::ComplianceCheckFailed { .. } => ErrorKind::Compliance,
            Self::InterestRateExceedsLimit { .. }
            | Self::InsufficientCreditScore { .. }
            | Self::ExcessiveDebtToIncome { .. }
            | Self::InvalidTerms(_) => ErrorKind::Validation,
        }
    }
}

/// Errors raised by intake, the loan registry, payments and the pool.
#[derive(Error, Debug)]
pub enum LendingError {
    /// No loan with this id.
    #[error("{0} not found")]
    LoanNotFound(LoanId),

    /// No application with this id.
    #[error("{0} not found")]
    ApplicationNotFound(ApplicationId),

    /// The application fields are out of bounds.
    #[error("invalid application: {0}")]
    InvalidApplication(String),

    /// The application's compliance check was already recorded.
    #[error("compliance check for {0} already completed")]
    CheckAlreadyCompleted(ApplicationId),

    /// The loan is not in a state that permits this transition.
    #[error("invalid loan transition for {loan}: {from} -> {to}")]
    InvalidTransition {
        /// The loan.
        loan: LoanId,
        /// Current status.
        from: String,
        /// Attempted status or action.
        to: String,
    },

    /// Only the borrower may perform this action.
    #[error("{caller} is not the borrower of {loan} ({borrower})")]
    NotBorrower {
        /// The loan.
        loan: LoanId,
        /// The borrower.
        borrower: SubjectId,
        /// The caller.
        caller: SubjectId,
    },

    /// The loan does not take collateral.
    #[error("{0} does not require collateral")]
    CollateralNotRequired(LoanId),

    /// Funding needs collateral that has not been deposited.
    #[error("{0} requires collateral before funding")]
    CollateralMissing(LoanId),

    /// A deposit named a different collateral token than the first one.
    #[error("collateral token mismatch for {loan}: expected {expected}, got {actual}")]
    CollateralTokenMismatch {
        /// The loan.
        loan: LoanId,
        /// Token of earlier deposits.
        expected: String,
        /// Token of this deposit.
        actual: String,
    },

    /// A zero or otherwise unusable amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The payment would retire the loan early and the terms forbid it.
    #[error("prepayment of {loan} before {due_at} is not allowed")]
    PrepaymentNotAllowed {
        /// The loan.
        loan: LoanId,
        /// Maturity date.
        due_at: Timestamp,
    },

    /// An early payoff that does not also cover the prepayment penalty.
    #[error("early payoff of {loan} needs {required} including penalty {penalty}, got {offered}")]
    PrepaymentPenaltyUncovered {
        /// The loan.
        loan: LoanId,
        /// Fees, interest, outstanding principal and penalty.
        required: Amount,
        /// Penalty owed for retiring the loan early.
        penalty: Amount,
        /// Amount offered.
        offered: Amount,
    },

    /// The pool reserve does not cover the required multiple of principal.
    #[error("insufficient reserve: {required} required, {available} available")]
    InsufficientReserve {
        /// Reserve needed.
        required: Amount,
        /// Reserve held.
        available: Amount,
    },

    /// A pool account would go negative.
    #[error("insufficient funds in {account}: {needed} needed, {available} available")]
    InsufficientFunds {
        /// Debited account.
        account: String,
        /// Amount requested.
        needed: Amount,
        /// Balance held.
        available: Amount,
    },

    /// The grace period has not yet elapsed.
    #[error("{loan} cannot be defaulted before {eligible_at} (now {now})")]
    DefaultNotYetAllowed {
        /// The loan.
        loan: LoanId,
        /// First instant a default is accepted.
        eligible_at: Timestamp,
        /// Time of the attempt.
        now: Timestamp,
    },

    /// The liquidation threshold has not yet passed.
    #[error("{loan} cannot be liquidated until after {threshold} (now {now})")]
    LiquidationNotYetAllowed {
        /// The loan.
        loan: LoanId,
        /// Instant that must be passed.
        threshold: Timestamp,
        /// Time of the attempt.
        now: Timestamp,
    },

    /// Configuration values are inconsistent.
    #[error("invalid lending configuration: {0}")]
    InvalidConfig(String),

    /// Underwriting rejected the application.
    #[error(transparent)]
    Underwriting(#[from] UnderwritingError),

    /// Checked arithmetic failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl LendingError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LoanNotFound(_) | Self::ApplicationNotFound(_) => ErrorKind::NotFound,
            Self::InvalidApplication(_)
            | Self::CollateralTokenMismatch { .. }
            | Self::InvalidAmount(_)
            | Self::PrepaymentNotAllowed { .. }
            | Self::PrepaymentPenaltyUncovered { .. }
            | Self::InvalidConfig(_) => ErrorKind::Validation,
            Self::CheckAlreadyCompleted(_)
            | Self::InvalidTransition { .. }
            | Self::CollateralNotRequired(_) => ErrorKind::State,
            Self::NotBorrower { .. } => ErrorKind::Authorization,
            Self::CollateralMissing(_)
            | Self::InsufficientReserve { .. }
            | Self::InsufficientFunds { .. } => ErrorKind::Resource,
            Self::DefaultNotYetAllowed { .. } | Self::LiquidationNotYetAllowed { .. } => {
                ErrorKind::Temporal
            }
            Self::Underwriting(e) => e.kind(),
            Self::Core(e) => e.kind(),
        }
    }
}
