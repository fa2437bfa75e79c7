//! # Underwriting
//!
//! Turns a compliant application into an APPROVED loan. Every check runs
//! before the registry is touched, in this order:
//!
//! 1. the application exists and has not produced a loan yet
//! 2. KYC is completed
//! 3. a compliance check exists with KYC verified and AML cleared
//! 4. the rate does not exceed the global cap
//! 5. the score snapshot meets the minimum
//! 6. the debt-to-income ratio is within the maximum
//! 7. the underwriter's terms are consistent with the request
//!
//! Collateral is forced for [`RiskTier::High`] and [`RiskTier::VeryHigh`].

use credence_core::{Amount, ApplicationId, Bps, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::application::ApplicationBook;
use crate::config::UnderwritingConfig;
use crate::error::UnderwritingError;
use crate::loan::{Loan, LoanRegistry, LoanTerms};

/// Risk tier assigned at underwriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskTier {
    /// Canonical tier name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY_HIGH",
        }
    }

    /// Risk level on the profile scale (1 lowest).
    pub fn risk_level(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::VeryHigh => 4,
        }
    }

    /// Whether loans in this tier must be collateralized.
    pub fn requires_collateral(&self) -> bool {
        matches!(self, Self::High | Self::VeryHigh)
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const LOW_MIN_SCORE: u16 = 750;
const LOW_MAX_DTI: Bps = Bps(2_800);
const MEDIUM_MIN_SCORE: u16 = 650;
const MEDIUM_MAX_DTI: Bps = Bps(3_600);
const HIGH_MIN_SCORE: u16 = 550;

/// Tier for a score and debt-to-income ratio.
pub fn classify_risk(score: u16, debt_to_income: Bps) -> RiskTier {
    if score >= LOW_MIN_SCORE && debt_to_income <= LOW_MAX_DTI {
        RiskTier::Low
    } else if score >= MEDIUM_MIN_SCORE && debt_to_income <= MEDIUM_MAX_DTI {
        RiskTier::Medium
    } else if score >= HIGH_MIN_SCORE {
        RiskTier::High
    } else {
        RiskTier::VeryHigh
    }
}

/// Terms chosen by the underwriter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderwritingTerms {
    /// Principal to lend; at most the requested amount.
    pub amount: Amount,
    pub interest_rate_bps: Bps,
    pub term_days: u32,
    #[serde(default)]
    pub origination_fee_bps: Bps,
    #[serde(default)]
    pub late_payment_fee: Amount,
    #[serde(default)]
    pub prepayment_penalty_bps: Bps,
    #[serde(default)]
    pub allow_prepayment: bool,
    /// Ask for collateral regardless of tier.
    #[serde(default)]
    pub require_collateral: bool,
}

/// Applies underwriting limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnderwritingEngine {
    config: UnderwritingConfig,
}

impl UnderwritingEngine {
    pub fn new(config: UnderwritingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &UnderwritingConfig {
        &self.config
    }

    /// Underwrite `application` and create its APPROVED loan.
    pub fn underwrite<'r>(
        &self,
        book: &mut ApplicationBook,
        registry: &'r mut LoanRegistry,
        application: ApplicationId,
        underwriter: &SubjectId,
        terms: UnderwritingTerms,
        now: Timestamp,
    ) -> Result<&'r Loan, UnderwritingError> {
        let app = book
            .application(application)
            .ok_or(UnderwritingError::ApplicationNotFound(application))?;
        if let Some(loan) = app.loan_id {
            return Err(UnderwritingError::AlreadyUnderwritten { application, loan });
        }
        if !app.kyc_completed {
            return Err(UnderwritingError::KycNotCompleted(application));
        }
        match book.check(application) {
            None => {
                return Err(UnderwritingError::ComplianceCheckFailed {
                    application,
                    reason: "no compliance check recorded".into(),
                })
            }
            Some(check) if !check.clears_underwriting() => {
                return Err(UnderwritingError::ComplianceCheckFailed {
                    application,
                    reason: format!(
                        "kyc_verified={} aml_cleared={}",
                        check.kyc_verified, check.aml_cleared
                    ),
                })
            }
            Some(_) => {}
        }
        if terms.interest_rate_bps > self.config.max_interest_rate_bps {
            return Err(UnderwritingError::InterestRateExceedsLimit {
                requested: terms.interest_rate_bps,
                limit: self.config.max_interest_rate_bps,
            });
        }
        if app.credit_score_snapshot < self.config.min_credit_score {
            return Err(UnderwritingError::InsufficientCreditScore {
                score: app.credit_score_snapshot,
                minimum: self.config.min_credit_score,
            });
        }
        if app.debt_to_income_bps > self.config.max_debt_to_income_bps {
            return Err(UnderwritingError::ExcessiveDebtToIncome {
                ratio: app.debt_to_income_bps,
                maximum: self.config.max_debt_to_income_bps,
            });
        }
        check_terms(&terms, app.requested_amount)?;

        let tier = classify_risk(app.credit_score_snapshot, app.debt_to_income_bps);
        let applicant = app.applicant.clone();
        let application_at = app.timestamp;
        let loan_terms = LoanTerms {
            principal: terms.amount,
            interest_rate_bps: terms.interest_rate_bps,
            term_days: terms.term_days,
            origination_fee_bps: terms.origination_fee_bps,
            late_payment_fee: terms.late_payment_fee,
            prepayment_penalty_bps: terms.prepayment_penalty_bps,
            allow_prepayment: terms.allow_prepayment,
            collateral_required: terms.require_collateral || tier.requires_collateral(),
        };
        let loan = registry.create(
            application,
            &applicant,
            application_at,
            loan_terms,
            underwriter,
            tier.risk_level(),
            now,
        );
        if let Some(app) = book.application_mut(application) {
            app.risk_assessment = Some(tier);
            app.loan_id = Some(loan.id);
        }
        tracing::info!(%application, loan = %loan.id, %tier, underwriter = %underwriter, "application underwritten");
        Ok(loan)
    }
}

fn check_terms(terms: &UnderwritingTerms, requested: Amount) -> Result<(), UnderwritingError> {
    if terms.amount.is_zero() || terms.amount > requested {
        return Err(UnderwritingError::InvalidTerms(format!(
            "amount {} must be positive and at most the requested {requested}",
            terms.amount
        )));
    }
    if terms.term_days == 0 {
        return Err(UnderwritingError::InvalidTerms("term must be positive".into()));
    }
    if !terms.origination_fee_bps.is_fraction() || !terms.prepayment_penalty_bps.is_fraction() {
        return Err(UnderwritingError::InvalidTerms("fee rates cannot exceed 100%".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ApplicationRequest, ComplianceCheckInput};
    use crate::config::LendingConfig;
    use crate::loan::LoanStatus;
    use credence_core::ErrorKind;

    fn s(id: &str) -> SubjectId {
        SubjectId::new(id).unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-05-01T00:00:00Z").unwrap()
    }

    fn terms() -> UnderwritingTerms {
        UnderwritingTerms {
            amount: Amount::new(10_000),
            interest_rate_bps: Bps(1_500),
            term_days: 180,
            origination_fee_bps: Bps(100),
            late_payment_fee: Amount::new(25),
            prepayment_penalty_bps: Bps(0),
            allow_prepayment: true,
            require_collateral: false,
        }
    }

    fn submit(book: &mut ApplicationBook, score: u16, dti: Bps) -> ApplicationId {
        let request = ApplicationRequest {
            requested_amount: Amount::new(10_000),
            requested_term_days: 180,
            purpose: "equipment".into(),
            annual_income: Amount::new(80_000),
            debt_to_income_bps: dti,
            employment_status: "employed".into(),
            documents_hash_ref: String::new(),
        };
        book.submit(&s("alice"), request, score, true, &UnderwritingConfig::default(), now())
            .unwrap()
            .id
    }

    fn clear(book: &mut ApplicationBook, id: ApplicationId) {
        let input = ComplianceCheckInput {
            kyc_verified: true,
            aml_cleared: true,
            ..Default::default()
        };
        book.complete_check(id, &s("officer"), input, now()).unwrap();
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(classify_risk(750, Bps(2_800)), RiskTier::Low);
        assert_eq!(classify_risk(750, Bps(2_801)), RiskTier::Medium);
        assert_eq!(classify_risk(650, Bps(3_600)), RiskTier::Medium);
        assert_eq!(classify_risk(650, Bps(3_601)), RiskTier::High);
        assert_eq!(classify_risk(550, Bps(9_000)), RiskTier::High);
        assert_eq!(classify_risk(549, Bps(0)), RiskTier::VeryHigh);
    }

    #[test]
    fn approved_loan_carries_tier() {
        let mut book = ApplicationBook::new();
        let mut registry = LoanRegistry::new(LendingConfig::default());
        let id = submit(&mut book, 760, Bps(2_000));
        clear(&mut book, id);

        let engine = UnderwritingEngine::default();
        let loan = engine
            .underwrite(&mut book, &mut registry, id, &s("uw"), terms(), now())
            .unwrap();
        assert_eq!(loan.status, LoanStatus::Approved);
        assert_eq!(loan.risk_level, 1);
        assert!(!loan.terms.collateral_required);
        let loan_id = loan.id;

        let app = book.application(id).unwrap();
        assert_eq!(app.risk_assessment, Some(RiskTier::Low));
        assert_eq!(app.loan_id, Some(loan_id));

        let err = engine
            .underwrite(&mut book, &mut registry, id, &s("uw"), terms(), now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn high_tier_forces_collateral() {
        let mut book = ApplicationBook::new();
        let mut registry = LoanRegistry::new(LendingConfig::default());
        let id = submit(&mut book, 600, Bps(4_000));
        clear(&mut book, id);
        let loan = UnderwritingEngine::default()
            .underwrite(&mut book, &mut registry, id, &s("uw"), terms(), now())
            .unwrap();
        assert!(loan.terms.collateral_required);
        assert_eq!(loan.risk_level, 3);
    }

    #[test]
    fn missing_check_fails_compliance() {
        let mut book = ApplicationBook::new();
        let mut registry = LoanRegistry::new(LendingConfig::default());
        let id = submit(&mut book, 760, Bps(2_000));
        let err = UnderwritingEngine::default()
            .underwrite(&mut book, &mut registry, id, &s("uw"), terms(), now())
            .unwrap_err();
        assert!(matches!(err, UnderwritingError::ComplianceCheckFailed { .. }));
        assert!(registry.loans_for(&s("alice")).is_empty());
    }

    #[test]
    fn aml_not_cleared_fails_compliance() {
        let mut book = ApplicationBook::new();
        let mut registry = LoanRegistry::new(LendingConfig::default());
        let id = submit(&mut book, 760, Bps(2_000));
        let input = ComplianceCheckInput {
            kyc_verified: true,
            ..Default::default()
        };
        book.complete_check(id, &s("officer"), input, now()).unwrap();
        let err = UnderwritingEngine::default()
            .underwrite(&mut book, &mut registry, id, &s("uw"), terms(), now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Compliance);
    }

    #[test]
    fn kyc_checked_before_compliance() {
        let mut book = ApplicationBook::new();
        let mut registry = LoanRegistry::new(LendingConfig::default());
        let request = ApplicationRequest {
            requested_amount: Amount::new(10_000),
            requested_term_days: 180,
            purpose: "equipment".into(),
            annual_income: Amount::new(80_000),
            debt_to_income_bps: Bps(2_000),
            employment_status: String::new(),
            documents_hash_ref: String::new(),
        };
        let id = book
            .submit(&s("bob"), request, 760, false, &UnderwritingConfig::default(), now())
            .unwrap()
            .id;
        let err = UnderwritingEngine::default()
            .underwrite(&mut book, &mut registry, id, &s("uw"), terms(), now())
            .unwrap_err();
        assert!(matches!(err, UnderwritingError::KycNotCompleted(_)));
    }

    #[test]
    fn rejections_in_order() {
        let engine = UnderwritingEngine::default();
        let mut book = ApplicationBook::new();
        let mut registry = LoanRegistry::new(LendingConfig::default());

        // Rate is checked before score.
        let id = submit(&mut book, 400, Bps(2_000));
        clear(&mut book, id);
        let err = engine
            .underwrite(
                &mut book,
                &mut registry,
                id,
                &s("uw"),
                UnderwritingTerms {
                    interest_rate_bps: Bps(3_601),
                    ..terms()
                },
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, UnderwritingError::InterestRateExceedsLimit { .. }));
        let err = engine
            .underwrite(&mut book, &mut registry, id, &s("uw"), terms(), now())
            .unwrap_err();
        assert!(matches!(err, UnderwritingError::InsufficientCreditScore { .. }));

        let id = submit(&mut book, 700, Bps(4_301));
        clear(&mut book, id);
        let err = engine
            .underwrite(&mut book, &mut registry, id, &s("uw"), terms(), now())
            .unwrap_err();
        assert!(matches!(err, UnderwritingError::ExcessiveDebtToIncome { .. }));

        let id = submit(&mut book, 700, Bps(2_000));
        clear(&mut book, id);
        let err = engine
            .underwrite(
                &mut book,
                &mut registry,
                id,
                &s("uw"),
                UnderwritingTerms {
                    amount: Amount::new(10_001),
                    ..terms()
                },
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, UnderwritingError::InvalidTerms(_)));
        assert!(registry.loans_for(&s("alice")).is_empty());
    }

    #[test]
    fn unknown_application() {
        let mut book = ApplicationBook::new();
        let mut registry = LoanRegistry::new(LendingConfig::default());
        let err = UnderwritingEngine::default()
            .underwrite(&mut book, &mut registry, ApplicationId(3), &s("uw"), terms(), now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
