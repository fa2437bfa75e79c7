//! # Loan Registry
//!
//! Owns loan entities and enforces the lifecycle state machine. Every
//! transition is validated against [`LoanStatus::valid_transitions`] and
//! appended to the loan's transition log. Each operation checks all of its
//! preconditions (state, deadlines, balances) before moving any funds or
//! touching the loan, so a rejected call changes nothing.

use std::collections::BTreeMap;

use credence_core::{Amount, ApplicationId, Bps, LoanId, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::config::LendingConfig;
use crate::error::LendingError;
use crate::payment::{PaymentBreakdown, PaymentProcessor};
use crate::pool::LendingPool;

// ─── Loan Status ─────────────────────────────────────────────────────

/// Lifecycle state of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// Underwritten, awaiting funding.
    Approved,
    /// Funded and repaying.
    Active,
    /// Principal fully repaid (terminal).
    Repaid,
    /// Borrower defaulted.
    Defaulted,
    /// Collateral seized after default (terminal).
    Liquidated,
    /// Withdrawn before funding (terminal).
    Cancelled,
}

impl LoanStatus {
    /// Canonical state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Active => "ACTIVE",
            Self::Repaid => "REPAID",
            Self::Defaulted => "DEFAULTED",
            Self::Liquidated => "LIQUIDATED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// States reachable in one step.
    pub fn valid_transitions(&self) -> &'static [LoanStatus] {
        match self {
            Self::Approved => &[Self::Active, Self::Cancelled],
            Self::Active => &[Self::Repaid, Self::Defaulted],
            Self::Defaulted => &[Self::Liquidated],
            Self::Repaid | Self::Liquidated | Self::Cancelled => &[],
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Entity ──────────────────────────────────────────────────────────

/// Terms fixed at underwriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Amount lent.
    pub principal: Amount,
    /// Annual interest rate.
    pub interest_rate_bps: Bps,
    /// Term from funding to maturity.
    pub term_days: u32,
    /// Fee withheld from the disbursement.
    pub origination_fee_bps: Bps,
    /// Flat fee on a late payment.
    pub late_payment_fee: Amount,
    /// Penalty on early payoff, as a share of outstanding principal.
    pub prepayment_penalty_bps: Bps,
    /// Whether early payoff is permitted.
    pub allow_prepayment: bool,
    /// Whether collateral must be deposited before funding.
    pub collateral_required: bool,
}

/// Collateral posted against a loan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collateral {
    /// Whether collateral is required.
    pub required: bool,
    /// Amount held in escrow.
    pub amount: Amount,
    /// Token or asset reference, fixed by the first deposit.
    pub token_ref: Option<String>,
    /// Returned to the borrower.
    pub released: bool,
    /// Seized to the treasury.
    pub liquidated: bool,
}

impl Collateral {
    /// Whether escrowed collateral is still held.
    pub fn is_held(&self) -> bool {
        !self.amount.is_zero() && !self.released && !self.liquidated
    }
}

/// A single payment applied to a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Amount applied (excludes any unapplied excess).
    pub amount: Amount,
    /// When.
    pub timestamp: Timestamp,
    /// Portion applied to principal.
    pub principal_portion: Amount,
    /// Portion applied to interest.
    pub interest_portion: Amount,
    /// Portion applied to fees.
    pub fees_portion: Amount,
    /// Who paid.
    pub payer: SubjectId,
    /// How it was paid.
    pub method: String,
}

/// Record of a loan state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTransitionRecord {
    /// State before.
    pub from: LoanStatus,
    /// State after.
    pub to: LoanStatus,
    /// When.
    pub timestamp: Timestamp,
    /// Why.
    pub reason: String,
}

/// A loan and its full history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub application_id: ApplicationId,
    pub borrower: SubjectId,
    pub terms: LoanTerms,
    pub status: LoanStatus,
    /// When the application was submitted.
    pub application_at: Timestamp,
    pub approval_at: Timestamp,
    pub funding_at: Option<Timestamp>,
    /// Maturity: `funding_at + term_days`.
    pub due_at: Option<Timestamp>,
    /// Principal repaid so far.
    pub amount_repaid: Amount,
    /// Interest collected so far.
    pub interest_accrued: Amount,
    /// Fees collected so far.
    pub fees_accrued: Amount,
    pub last_payment_at: Option<Timestamp>,
    pub next_payment_due_at: Option<Timestamp>,
    pub underwriter: SubjectId,
    /// 1 (lowest risk) to 5.
    pub risk_level: u8,
    pub collateral: Collateral,
    pub payments: Vec<PaymentRecord>,
    pub transitions: Vec<LoanTransitionRecord>,
    pub outstanding_at_default: Option<Amount>,
    pub defaulted_at: Option<Timestamp>,
    pub liquidated_at: Option<Timestamp>,
    pub recovered_amount: Option<Amount>,
    pub loss_amount: Option<Amount>,
}

impl Loan {
    /// Principal not yet repaid.
    pub fn outstanding(&self) -> Amount {
        self.terms.principal.saturating_sub(self.amount_repaid)
    }

    fn require(&self, expected: LoanStatus, target: &str) -> Result<(), LendingError> {
        if self.status != expected {
            return Err(LendingError::InvalidTransition {
                loan: self.id,
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: LoanStatus, reason: &str, now: Timestamp) -> Result<(), LendingError> {
        if !self.status.valid_transitions().contains(&to) {
            return Err(LendingError::InvalidTransition {
                loan: self.id,
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        tracing::info!(loan = %self.id, from = %self.status, %to, reason, "loan transition");
        self.transitions.push(LoanTransitionRecord {
            from: self.status,
            to,
            timestamp: now,
            reason: reason.to_string(),
        });
        self.status = to;
        Ok(())
    }
}

// ─── Outcomes ────────────────────────────────────────────────────────

/// Score signal a lifecycle step reports for the borrower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanScoreEvent {
    /// Loan funded.
    Funded,
    /// Payment on or before the scheduled date.
    OnTimePayment,
    /// Payment after the scheduled date.
    LatePayment,
    /// Principal fully repaid.
    Repaid,
    /// Loan defaulted.
    Defaulted,
}

impl LoanScoreEvent {
    /// Score impact posted for this event.
    pub fn impact(&self) -> i32 {
        match self {
            Self::Funded => 5,
            Self::OnTimePayment => 2,
            Self::LatePayment => -10,
            Self::Repaid => 20,
            Self::Defaulted => -50,
        }
    }

    /// Stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Funded => "funded",
            Self::OnTimePayment => "on_time_payment",
            Self::LatePayment => "late_payment",
            Self::Repaid => "repaid",
            Self::Defaulted => "defaulted",
        }
    }
}

/// Result of funding a loan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingOutcome {
    pub loan_id: LoanId,
    pub borrower: SubjectId,
    /// Paid to the borrower.
    pub net_disbursed: Amount,
    /// Withheld to the treasury.
    pub origination_fee: Amount,
    pub due_at: Timestamp,
    pub next_payment_due_at: Timestamp,
    pub score_event: LoanScoreEvent,
}

/// Result of a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub loan_id: LoanId,
    pub borrower: SubjectId,
    pub payment: PaymentRecord,
    pub breakdown: PaymentBreakdown,
    /// Whether this payment moved the loan to REPAID.
    pub repaid: bool,
    /// Collateral returned, if this payment released it.
    pub collateral_released: Option<Amount>,
    pub score_event: LoanScoreEvent,
}

/// Result of a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultOutcome {
    pub loan_id: LoanId,
    pub borrower: SubjectId,
    pub outstanding: Amount,
    pub score_event: LoanScoreEvent,
}

/// Result of a liquidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationOutcome {
    pub loan_id: LoanId,
    pub borrower: SubjectId,
    pub recovered: Amount,
    pub loss: Amount,
}

/// Result of a cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    pub loan_id: LoanId,
    pub borrower: SubjectId,
    pub collateral_returned: Option<Amount>,
}

// ─── Registry ────────────────────────────────────────────────────────

/// Loan store plus the lifecycle operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanRegistry {
    config: LendingConfig,
    loans: BTreeMap<LoanId, Loan>,
    by_borrower: BTreeMap<SubjectId, Vec<LoanId>>,
    next_id: LoanId,
}

impl LoanRegistry {
    /// An empty registry.
    pub fn new(config: LendingConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Active lifecycle configuration.
    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    /// A loan by id.
    pub fn loan(&self, id: LoanId) -> Result<&Loan, LendingError> {
        self.loans.get(&id).ok_or(LendingError::LoanNotFound(id))
    }

    /// Loans held by `borrower`, oldest first.
    pub fn loans_for(&self, borrower: &SubjectId) -> Vec<&Loan> {
        self.by_borrower
            .get(borrower)
            .into_iter()
            .flatten()
            .filter_map(|id| self.loans.get(id))
            .collect()
    }

    /// Create an APPROVED loan. Called by underwriting once every check passed.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create(
        &mut self,
        application_id: ApplicationId,
        borrower: &SubjectId,
        application_at: Timestamp,
        terms: LoanTerms,
        underwriter: &SubjectId,
        risk_level: u8,
        now: Timestamp,
    ) -> &Loan {
        let id = self.next_id;
        self.next_id = id.next();
        self.by_borrower.entry(borrower.clone()).or_default().push(id);
        tracing::info!(loan = %id, borrower = %borrower, principal = %terms.principal, "loan approved");
        self.loans.entry(id).or_insert(Loan {
            id,
            application_id,
            borrower: borrower.clone(),
            collateral: Collateral {
                required: terms.collateral_required,
                ..Default::default()
            },
            terms,
            status: LoanStatus::Approved,
            application_at,
            approval_at: now,
            funding_at: None,
            due_at: None,
            amount_repaid: Amount::ZERO,
            interest_accrued: Amount::ZERO,
            fees_accrued: Amount::ZERO,
            last_payment_at: None,
            next_payment_due_at: None,
            underwriter: underwriter.clone(),
            risk_level,
            payments: Vec::new(),
            transitions: Vec::new(),
            outstanding_at_default: None,
            defaulted_at: None,
            liquidated_at: None,
            recovered_amount: None,
            loss_amount: None,
        })
    }

    /// APPROVED → ACTIVE. Disburses principal less the origination fee.
    pub fn fund(
        &mut self,
        id: LoanId,
        pool: &mut LendingPool,
        now: Timestamp,
    ) -> Result<FundingOutcome, LendingError> {
        let interval = self.config.payment_interval_days;
        let reserve_ratio = self.config.reserve_ratio_bps;
        let loan = self.loan_mut(id)?;
        loan.require(LoanStatus::Approved, LoanStatus::Active.as_str())?;
        if loan.terms.collateral_required && loan.collateral.amount.is_zero() {
            return Err(LendingError::CollateralMissing(id));
        }
        let principal = loan.terms.principal;
        pool.ensure_reserve(principal.apply_bps(reserve_ratio))?;
        let fee = principal.apply_bps(loan.terms.origination_fee_bps);
        let net = principal.checked_sub(fee)?;
        pool.disburse(&loan.borrower, net, fee, &format!("fund {id}"), now)?;

        let due_at = now.plus_days(loan.terms.term_days);
        let next_due = now.plus_days(interval);
        loan.transition(LoanStatus::Active, "funded", now)?;
        loan.funding_at = Some(now);
        loan.due_at = Some(due_at);
        loan.last_payment_at = Some(now);
        loan.next_payment_due_at = Some(next_due);
        Ok(FundingOutcome {
            loan_id: id,
            borrower: loan.borrower.clone(),
            net_disbursed: net,
            origination_fee: fee,
            due_at,
            next_payment_due_at: next_due,
            score_event: LoanScoreEvent::Funded,
        })
    }

    /// Apply a payment to an ACTIVE loan.
    pub fn make_payment(
        &mut self,
        id: LoanId,
        payer: &SubjectId,
        amount: Amount,
        method: &str,
        pool: &mut LendingPool,
        now: Timestamp,
    ) -> Result<PaymentOutcome, LendingError> {
        let interval = self.config.payment_interval_days;
        let processor = PaymentProcessor::new(self.config.interest_scaling);
        let loan = self.loan_mut(id)?;
        loan.require(LoanStatus::Active, "payment")?;
        let breakdown = processor.breakdown(loan, amount, now)?;

        let to_reserve = breakdown
            .principal_portion
            .checked_add(breakdown.interest_portion)?;
        let amount_repaid = loan.amount_repaid.checked_add(breakdown.principal_portion)?;
        let interest_accrued = loan.interest_accrued.checked_add(breakdown.interest_portion)?;
        let fees_accrued = loan.fees_accrued.checked_add(breakdown.fees_portion)?;
        let repaid = amount_repaid >= loan.terms.principal;
        let releasing = repaid && loan.collateral.is_held();
        if releasing && pool.escrowed_collateral() < loan.collateral.amount {
            return Err(LendingError::InsufficientFunds {
                account: "escrow".into(),
                needed: loan.collateral.amount,
                available: pool.escrowed_collateral(),
            });
        }
        let memo = format!("payment {id}");
        pool.collect(payer, to_reserve, breakdown.fees_portion, &memo, now)?;

        let previous_due = loan.next_payment_due_at;
        loan.amount_repaid = amount_repaid;
        loan.interest_accrued = interest_accrued;
        loan.fees_accrued = fees_accrued;
        loan.last_payment_at = Some(now);
        loan.next_payment_due_at = previous_due.map(|due| due.plus_days(interval));
        let payment = PaymentRecord {
            amount: breakdown.applied(),
            timestamp: now,
            principal_portion: breakdown.principal_portion,
            interest_portion: breakdown.interest_portion,
            fees_portion: breakdown.fees_portion,
            payer: payer.clone(),
            method: method.to_string(),
        };
        loan.payments.push(payment.clone());

        let on_time = previous_due.map_or(true, |due| now <= due);
        let (score_event, collateral_released) = if repaid {
            loan.transition(LoanStatus::Repaid, "principal repaid", now)?;
            (LoanScoreEvent::Repaid, release_collateral(loan, pool, now)?)
        } else if on_time {
            (LoanScoreEvent::OnTimePayment, None)
        } else {
            (LoanScoreEvent::LatePayment, None)
        };

        Ok(PaymentOutcome {
            loan_id: id,
            borrower: loan.borrower.clone(),
            payment,
            breakdown,
            repaid,
            collateral_released,
            score_event,
        })
    }

    /// Escrow collateral for an APPROVED loan that requires it. Borrower only.
    /// Returns the total now held.
    pub fn deposit_collateral(
        &mut self,
        id: LoanId,
        caller: &SubjectId,
        amount: Amount,
        token_ref: &str,
        pool: &mut LendingPool,
        now: Timestamp,
    ) -> Result<Amount, LendingError> {
        let loan = self.loan_mut(id)?;
        if &loan.borrower != caller {
            return Err(LendingError::NotBorrower {
                loan: id,
                borrower: loan.borrower.clone(),
                caller: caller.clone(),
            });
        }
        loan.require(LoanStatus::Approved, "collateral deposit")?;
        if !loan.terms.collateral_required {
            return Err(LendingError::CollateralNotRequired(id));
        }
        if amount.is_zero() {
            return Err(LendingError::InvalidAmount("collateral must be positive".into()));
        }
        if token_ref.trim().is_empty() {
            return Err(LendingError::InvalidAmount("collateral token must be named".into()));
        }
        if let Some(expected) = &loan.collateral.token_ref {
            if expected != token_ref {
                return Err(LendingError::CollateralTokenMismatch {
                    loan: id,
                    expected: expected.clone(),
                    actual: token_ref.to_string(),
                });
            }
        }
        let total = loan.collateral.amount.checked_add(amount)?;
        pool.escrow_deposit(caller, amount, &format!("collateral {id}"), now)?;
        loan.collateral.amount = total;
        loan.collateral.token_ref = Some(token_ref.to_string());
        tracing::info!(loan = %id, %amount, %total, "collateral deposited");
        Ok(total)
    }

    /// ACTIVE → DEFAULTED, once the grace period after the missed due date
    /// has elapsed.
    pub fn mark_defaulted(&mut self, id: LoanId, now: Timestamp) -> Result<DefaultOutcome, LendingError> {
        let grace = self.config.grace_period_days;
        let loan = self.loan_mut(id)?;
        loan.require(LoanStatus::Active, LoanStatus::Defaulted.as_str())?;
        let due = loan.next_payment_due_at.unwrap_or(now);
        let eligible_at = due.plus_days(grace);
        if now < eligible_at {
            return Err(LendingError::DefaultNotYetAllowed {
                loan: id,
                eligible_at,
                now,
            });
        }
        let outstanding = loan.outstanding();
        loan.transition(LoanStatus::Defaulted, "payment overdue past grace period", now)?;
        loan.outstanding_at_default = Some(outstanding);
        loan.defaulted_at = Some(now);
        Ok(DefaultOutcome {
            loan_id: id,
            borrower: loan.borrower.clone(),
            outstanding,
            score_event: LoanScoreEvent::Defaulted,
        })
    }

    /// DEFAULTED → LIQUIDATED, strictly after the liquidation threshold.
    /// Escrowed collateral moves to the treasury.
    pub fn liquidate(
        &mut self,
        id: LoanId,
        pool: &mut LendingPool,
        now: Timestamp,
    ) -> Result<LiquidationOutcome, LendingError> {
        let threshold_days = self.config.liquidation_threshold_days;
        let loan = self.loan_mut(id)?;
        loan.require(LoanStatus::Defaulted, LoanStatus::Liquidated.as_str())?;
        let due = loan.next_payment_due_at.unwrap_or(now);
        let threshold = due.plus_days(threshold_days);
        if now <= threshold {
            return Err(LendingError::LiquidationNotYetAllowed {
                loan: id,
                threshold,
                now,
            });
        }
        let recovered = if loan.collateral.is_held() {
            loan.collateral.amount
        } else {
            Amount::ZERO
        };
        if !recovered.is_zero() {
            pool.escrow_seize(recovered, &format!("liquidate {id}"), now)?;
            loan.collateral.liquidated = true;
        }
        let outstanding = loan.outstanding_at_default.unwrap_or_else(|| loan.outstanding());
        let loss = outstanding.saturating_sub(recovered);
        loan.transition(LoanStatus::Liquidated, "collateral seized", now)?;
        loan.liquidated_at = Some(now);
        loan.recovered_amount = Some(recovered);
        loan.loss_amount = Some(loss);
        tracing::warn!(loan = %id, %recovered, %loss, "loan liquidated");
        Ok(LiquidationOutcome {
            loan_id: id,
            borrower: loan.borrower.clone(),
            recovered,
            loss,
        })
    }

    /// APPROVED → CANCELLED, by a loan officer or the borrower. Any
    /// deposited collateral is returned.
    pub fn cancel(
        &mut self,
        id: LoanId,
        caller: &SubjectId,
        is_officer: bool,
        reason: &str,
        pool: &mut LendingPool,
        now: Timestamp,
    ) -> Result<CancelOutcome, LendingError> {
        let loan = self.loan_mut(id)?;
        if !is_officer && &loan.borrower != caller {
            return Err(LendingError::NotBorrower {
                loan: id,
                borrower: loan.borrower.clone(),
                caller: caller.clone(),
            });
        }
        loan.require(LoanStatus::Approved, LoanStatus::Cancelled.as_str())?;
        let returned = release_collateral(loan, pool, now)?;
        loan.transition(LoanStatus::Cancelled, reason, now)?;
        Ok(CancelOutcome {
            loan_id: id,
            borrower: loan.borrower.clone(),
            collateral_returned: returned,
        })
    }

    /// Return a loan's escrowed collateral. A second call is a no-op.
    pub fn release_collateral(
        &mut self,
        id: LoanId,
        pool: &mut LendingPool,
        now: Timestamp,
    ) -> Result<Option<Amount>, LendingError> {
        let loan = self.loan_mut(id)?;
        if !loan.status.is_terminal() || loan.status == LoanStatus::Liquidated {
            return Err(LendingError::InvalidTransition {
                loan: id,
                from: loan.status.to_string(),
                to: "collateral release".into(),
            });
        }
        release_collateral(loan, pool, now)
    }

    fn loan_mut(&mut self, id: LoanId) -> Result<&mut Loan, LendingError> {
        self.loans.get_mut(&id).ok_or(LendingError::LoanNotFound(id))
    }
}

fn release_collateral(
    loan: &mut Loan,
    pool: &mut LendingPool,
    now: Timestamp,
) -> Result<Option<Amount>, LendingError> {
    if !loan.collateral.is_held() {
        return Ok(None);
    }
    let amount = loan.collateral.amount;
    pool.escrow_release(&loan.borrower, amount, &format!("release {}", loan.id), now)?;
    loan.collateral.released = true;
    tracing::info!(loan = %loan.id, %amount, "collateral released");
    Ok(Some(amount))
}
