//! # Payment Allocation
//!
//! Splits a payment into fees, interest and principal, in that order.
//!
//! - `outstanding = principal - amount_repaid`
//! - `days = floor((now - last_payment_at) / 1 day)`
//! - interest on `outstanding` for `days` at the annual rate (see
//!   [`InterestScaling`])
//! - the late fee applies when `now > next_payment_due_at`
//! - a payment that retires the loan before maturity is a prepayment:
//!   rejected when the terms forbid it, otherwise the penalty joins the fees
//!   and the payment must cover it as well as the payoff
//!
//! Principal is capped at `outstanding`; anything beyond is reported as
//! `unapplied` and never collected.

use credence_core::{Amount, Timestamp, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

use crate::config::InterestScaling;
use crate::error::LendingError;
use crate::loan::Loan;

const DAYS_PER_YEAR: u128 = 365;

/// How a payment would be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    /// Principal outstanding before the payment.
    pub outstanding: Amount,
    /// Whole days since the last payment (or funding).
    pub days_elapsed: u64,
    /// Interest due for those days.
    pub interest_due: Amount,
    /// Fees due, including any prepayment penalty.
    pub fees_due: Amount,
    /// Prepayment penalty included in `fees_due`.
    pub prepayment_penalty: Amount,
    /// Whether the payment is past the scheduled due date.
    pub late: bool,
    /// Portion applied to fees.
    pub fees_portion: Amount,
    /// Portion applied to interest.
    pub interest_portion: Amount,
    /// Portion applied to principal.
    pub principal_portion: Amount,
    /// Portion left over after principal was retired.
    pub unapplied: Amount,
}

impl PaymentBreakdown {
    /// Total applied to the loan.
    pub fn applied(&self) -> Amount {
        Amount::new(
            self.fees_portion.value() + self.interest_portion.value() + self.principal_portion.value(),
        )
    }

    /// Whether this payment retires the remaining principal.
    pub fn retires_principal(&self) -> bool {
        self.principal_portion >= self.outstanding
    }
}

/// Computes payment breakdowns under a configured interest scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProcessor {
    scaling: InterestScaling,
}

impl PaymentProcessor {
    /// A processor using `scaling`.
    pub fn new(scaling: InterestScaling) -> Self {
        Self { scaling }
    }

    /// Interest on `outstanding` for `days` at `rate_bps` per year.
    pub fn interest(&self, outstanding: Amount, rate_bps: u32, days: u64) -> Amount {
        let outstanding = u128::from(outstanding.value());
        let rate = u128::from(rate_bps);
        let days = u128::from(days);
        let denom = u128::from(BPS_DENOMINATOR);
        let raw = match self.scaling {
            InterestScaling::SingleScale => outstanding * rate * days / (DAYS_PER_YEAR * denom),
            InterestScaling::DoubleScale => {
                let daily_rate = rate / DAYS_PER_YEAR / denom;
                outstanding * daily_rate * days / denom
            }
        };
        Amount::new(u64::try_from(raw).unwrap_or(u64::MAX))
    }

    /// Allocate `amount` against `loan` at `now`.
    pub fn breakdown(&self, loan: &Loan, amount: Amount, now: Timestamp) -> Result<PaymentBreakdown, LendingError> {
        if amount.is_zero() {
            return Err(LendingError::InvalidAmount("payment must be positive".into()));
        }
        let terms = &loan.terms;
        let outstanding = terms.principal.saturating_sub(loan.amount_repaid);
        let since = loan.last_payment_at.or(loan.funding_at).unwrap_or(now);
        let days_elapsed = now.whole_days_since(&since);
        let interest_due = self.interest(outstanding, terms.interest_rate_bps.value(), days_elapsed);
        let late = loan.next_payment_due_at.is_some_and(|due| now > due);
        let mut fees_due = if late { terms.late_payment_fee } else { Amount::ZERO };

        let mut prepayment_penalty = Amount::ZERO;
        let payoff = fees_due.checked_add(interest_due)?.checked_add(outstanding)?;
        let early = loan.due_at.is_some_and(|due| now < due);
        if early && amount >= payoff && !outstanding.is_zero() {
            if !terms.allow_prepayment {
                return Err(LendingError::PrepaymentNotAllowed {
                    loan: loan.id,
                    due_at: loan.due_at.unwrap_or(now),
                });
            }
            let penalty = outstanding.apply_bps(terms.prepayment_penalty_bps);
            let required = payoff.checked_add(penalty)?;
            if amount < required {
                return Err(LendingError::PrepaymentPenaltyUncovered {
                    loan: loan.id,
                    required,
                    penalty,
                    offered: amount,
                });
            }
            prepayment_penalty = penalty;
            fees_due = fees_due.checked_add(penalty)?;
        }

        let fees_portion = amount.min(fees_due);
        let remaining = amount.saturating_sub(fees_portion);
        let interest_portion = remaining.min(interest_due);
        let remaining = remaining.saturating_sub(interest_portion);
        let principal_portion = remaining.min(outstanding);
        let unapplied = remaining.saturating_sub(principal_portion);

        Ok(PaymentBreakdown {
            outstanding,
            days_elapsed,
            interest_due,
            fees_due,
            prepayment_penalty,
            late,
            fees_portion,
            interest_portion,
            principal_portion,
            unapplied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::tests::active_loan;
    use credence_core::Bps;
    use proptest::prelude::*;

    #[test]
    fn single_scale_interest() {
        let p = PaymentProcessor::default();
        // 100_000 at 36.5% for 10 days = 1_000.
        assert_eq!(p.interest(Amount::new(100_000), 3650, 10), Amount::new(1_000));
        assert_eq!(p.interest(Amount::new(100_000), 3650, 0), Amount::ZERO);
    }

    #[test]
    fn double_scale_truncates_to_zero_for_realistic_rates() {
        let p = PaymentProcessor::new(InterestScaling::DoubleScale);
        assert_eq!(p.interest(Amount::new(1_000_000_000), 3600, 365), Amount::ZERO);
        assert_eq!(p.interest(Amount::new(1_000_000_000), 3_649_999, 365), Amount::ZERO);
        assert!(!p.interest(Amount::new(1_000_000_000), 3_650_000, 1).is_zero());
    }

    #[test]
    fn payment_below_fees_goes_entirely_to_fees() {
        let loan = active_loan();
        let late = loan.next_payment_due_at.unwrap().plus_days(1);
        let b = PaymentProcessor::default()
            .breakdown(&loan, Amount::new(10), late)
            .unwrap();
        assert!(b.late);
        assert_eq!(b.fees_due, loan.terms.late_payment_fee);
        assert_eq!(b.fees_portion, Amount::new(10));
        assert_eq!(b.interest_portion, Amount::ZERO);
        assert_eq!(b.principal_portion, Amount::ZERO);
    }

    #[test]
    fn allocation_order_fees_interest_principal() {
        let loan = active_loan();
        let at = loan.funding_at.unwrap().plus_days(31);
        let b = PaymentProcessor::default()
            .breakdown(&loan, Amount::new(2_000), at)
            .unwrap();
        assert_eq!(b.days_elapsed, 31);
        assert_eq!(b.fees_portion, loan.terms.late_payment_fee);
        assert_eq!(b.interest_portion, b.interest_due);
        assert_eq!(
            b.principal_portion.value(),
            2_000 - b.fees_portion.value() - b.interest_portion.value()
        );
        assert_eq!(b.unapplied, Amount::ZERO);
    }

    #[test]
    fn excess_over_outstanding_is_unapplied() {
        let mut loan = active_loan();
        loan.terms.allow_prepayment = true;
        loan.terms.prepayment_penalty_bps = Bps(0);
        let at = loan.due_at.unwrap();
        let b = PaymentProcessor::default()
            .breakdown(&loan, Amount::new(u64::from(u32::MAX)), at)
            .unwrap();
        assert!(b.retires_principal());
        assert_eq!(b.principal_portion, b.outstanding);
        assert!(!b.unapplied.is_zero());
    }

    #[test]
    fn prepayment_forbidden_by_terms() {
        let loan = active_loan();
        let at = loan.funding_at.unwrap().plus_days(1);
        let err = PaymentProcessor::default()
            .breakdown(&loan, Amount::new(1_000_000), at)
            .unwrap_err();
        assert!(matches!(err, LendingError::PrepaymentNotAllowed { .. }));
    }

    #[test]
    fn prepayment_penalty_joins_fees_when_covered() {
        let mut loan = active_loan();
        loan.terms.allow_prepayment = true;
        loan.terms.prepayment_penalty_bps = Bps(200);
        let at = loan.funding_at.unwrap();
        let b = PaymentProcessor::default()
            .breakdown(&loan, Amount::new(1_000_000), at)
            .unwrap();
        assert_eq!(b.prepayment_penalty, loan.terms.principal.apply_bps(Bps(200)));
        assert_eq!(b.fees_portion, b.prepayment_penalty);
        assert!(b.retires_principal());
    }

    #[test]
    fn exact_payoff_without_penalty_is_rejected() {
        let mut loan = active_loan();
        loan.terms.allow_prepayment = true;
        loan.terms.prepayment_penalty_bps = Bps(500);
        let at = loan.funding_at.unwrap().plus_days(10);
        let p = PaymentProcessor::default();
        let outstanding = loan.terms.principal;
        let interest = p.interest(outstanding, loan.terms.interest_rate_bps.value(), 10);
        let payoff = Amount::new(interest.value() + outstanding.value());
        let penalty = outstanding.apply_bps(Bps(500));

        let err = p.breakdown(&loan, payoff, at).unwrap_err();
        assert!(matches!(
            &err,
            LendingError::PrepaymentPenaltyUncovered { required, penalty: owed, .. }
                if *owed == penalty && required.value() == payoff.value() + penalty.value()
        ));
        assert_eq!(err.kind(), credence_core::ErrorKind::Validation);

        let b = p
            .breakdown(&loan, Amount::new(payoff.value() + penalty.value()), at)
            .unwrap();
        assert_eq!(b.prepayment_penalty, penalty);
        assert_eq!(b.fees_portion, penalty);
        assert!(b.retires_principal());
        assert_eq!(b.unapplied, Amount::ZERO);
    }

    #[test]
    fn partial_payment_before_maturity_owes_no_penalty() {
        let mut loan = active_loan();
        loan.terms.allow_prepayment = true;
        loan.terms.prepayment_penalty_bps = Bps(500);
        let at = loan.funding_at.unwrap().plus_days(10);
        let b = PaymentProcessor::default()
            .breakdown(&loan, Amount::new(5_000), at)
            .unwrap();
        assert_eq!(b.prepayment_penalty, Amount::ZERO);
        assert!(!b.retires_principal());
    }

    #[test]
    fn zero_payment_rejected() {
        let loan = active_loan();
        assert!(PaymentProcessor::default()
            .breakdown(&loan, Amount::ZERO, loan.funding_at.unwrap())
            .is_err());
    }

    proptest! {
        #[test]
        fn allocation_conserves_amount(amount in 1u64..5_000_000, days in 0u32..400) {
            let mut loan = active_loan();
            loan.terms.allow_prepayment = true;
            let at = loan.funding_at.unwrap().plus_days(days);
            let b = PaymentProcessor::default().breakdown(&loan, Amount::new(amount), at).unwrap();
            prop_assert_eq!(b.applied().value() + b.unapplied.value(), amount);
            prop_assert!(b.fees_portion <= b.fees_due);
            prop_assert!(b.interest_portion <= b.interest_due);
            prop_assert!(b.principal_portion <= b.outstanding);
            if b.fees_portion < b.fees_due {
                prop_assert!(b.interest_portion.is_zero() && b.principal_portion.is_zero());
            }
        }
    }
}
