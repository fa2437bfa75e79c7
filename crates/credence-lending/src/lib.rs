//! # credence-lending: Loan Lifecycle
//!
//! ```text
//! ApplicationBook ──► UnderwritingEngine ──► LoanRegistry ◄──► LendingPool
//!  (intake, checks)     (risk tier, terms)     (state machine)    (reserve, treasury,
//!                                                    │              escrow, transfers)
//!                                                    ▼
//!                                            PaymentProcessor
//!                                       (fees → interest → principal)
//! ```
//!
//! Loan states move forward only:
//!
//! ```text
//! APPROVED ──fund──► ACTIVE ──pay in full──► REPAID
//!    │                  │
//!    └──cancel──► CANCELLED   └──default──► DEFAULTED ──liquidate──► LIQUIDATED
//! ```
//!
//! This crate knows nothing about credit scores beyond the snapshot taken at
//! intake. Lifecycle transitions that should move a score report a
//! [`LoanScoreEvent`]; the caller decides how to post it.

pub mod application;
pub mod config;
pub mod error;
pub mod loan;
pub mod payment;
pub mod pool;
pub mod underwriting;

pub use application::{
    ApplicationBook, ApplicationRequest, ComplianceCheck, ComplianceCheckInput, LoanApplication,
};
pub use config::{InterestScaling, LendingConfig, UnderwritingConfig};
pub use error::{LendingError, UnderwritingError};
pub use loan::{
    CancelOutcome, Collateral, DefaultOutcome, FundingOutcome, LiquidationOutcome, Loan,
    LoanRegistry, LoanScoreEvent, LoanStatus, LoanTerms, LoanTransitionRecord, PaymentOutcome,
    PaymentRecord,
};
pub use payment::{PaymentBreakdown, PaymentProcessor};
pub use pool::{Account, LendingPool, Transfer};
pub use underwriting::{classify_risk, RiskTier, UnderwritingEngine, UnderwritingTerms};
