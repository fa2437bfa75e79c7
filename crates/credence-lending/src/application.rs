//! # Application Intake
//!
//! Loan applications and their compliance checks. An application snapshots
//! the applicant's score and KYC state at submission. A compliance officer
//! records exactly one check per application; a check with `kyc_verified`
//! marks the application's KYC as completed.

use std::collections::BTreeMap;

use credence_core::{Amount, ApplicationId, Bps, LoanId, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::config::UnderwritingConfig;
use crate::error::LendingError;
use crate::underwriting::RiskTier;

/// Fields an applicant supplies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRequest {
    /// Amount requested.
    pub requested_amount: Amount,
    /// Term requested, in days.
    pub requested_term_days: u32,
    /// What the loan is for.
    pub purpose: String,
    /// Declared annual income.
    pub annual_income: Amount,
    /// Declared debt-to-income ratio.
    pub debt_to_income_bps: Bps,
    /// Declared employment status.
    #[serde(default)]
    pub employment_status: String,
    /// Reference to supporting documents held off-engine.
    #[serde(default)]
    pub documents_hash_ref: String,
}

/// A submitted application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanApplication {
    /// Engine-issued identifier.
    pub id: ApplicationId,
    /// The applicant (the submitting caller).
    pub applicant: SubjectId,
    /// Amount requested.
    pub requested_amount: Amount,
    /// Term requested, in days.
    pub requested_term_days: u32,
    /// What the loan is for.
    pub purpose: String,
    /// Applicant's score at submission.
    pub credit_score_snapshot: u16,
    /// Declared annual income.
    pub annual_income: Amount,
    /// Declared debt-to-income ratio.
    pub debt_to_income_bps: Bps,
    /// Declared employment status.
    pub employment_status: String,
    /// Reference to supporting documents.
    pub documents_hash_ref: String,
    /// When it was submitted.
    pub timestamp: Timestamp,
    /// Whether the applicant's KYC is complete.
    pub kyc_completed: bool,
    /// Tier assigned at underwriting.
    pub risk_assessment: Option<RiskTier>,
    /// Loan produced by underwriting.
    pub loan_id: Option<LoanId>,
}

/// Officer-supplied outcome of the compliance review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceCheckInput {
    /// Identity verified.
    pub kyc_verified: bool,
    /// Anti-money-laundering screening cleared.
    pub aml_cleared: bool,
    /// Credit bureau check done.
    pub credit_check_completed: bool,
    /// Income verified.
    pub income_verified: bool,
    /// Sanctions screening cleared.
    pub sanctions_cleared: bool,
    /// Officer notes.
    #[serde(default)]
    pub notes: String,
}

/// The recorded compliance check for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    /// Application checked.
    pub application_id: ApplicationId,
    /// Identity verified.
    pub kyc_verified: bool,
    /// AML cleared.
    pub aml_cleared: bool,
    /// Credit check done.
    pub credit_check_completed: bool,
    /// Income verified.
    pub income_verified: bool,
    /// Sanctions cleared.
    pub sanctions_cleared: bool,
    /// Officer who recorded it.
    pub officer: SubjectId,
    /// When.
    pub timestamp: Timestamp,
    /// Officer notes.
    pub notes: String,
}

impl ComplianceCheck {
    /// Whether the check clears the application for underwriting.
    pub fn clears_underwriting(&self) -> bool {
        self.kyc_verified && self.aml_cleared
    }
}

/// Application and compliance-check store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationBook {
    applications: BTreeMap<ApplicationId, LoanApplication>,
    checks: BTreeMap<ApplicationId, ComplianceCheck>,
    next_id: ApplicationId,
}

impl ApplicationBook {
    /// An empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// An application by id.
    pub fn application(&self, id: ApplicationId) -> Option<&LoanApplication> {
        self.applications.get(&id)
    }

    /// The compliance check recorded for an application.
    pub fn check(&self, id: ApplicationId) -> Option<&ComplianceCheck> {
        self.checks.get(&id)
    }

    /// Applications submitted by `applicant`.
    pub fn applications_for<'a>(
        &'a self,
        applicant: &'a SubjectId,
    ) -> impl Iterator<Item = &'a LoanApplication> + 'a {
        self.applications
            .values()
            .filter(move |a| &a.applicant == applicant)
    }

    /// Validate and store an application.
    pub fn submit(
        &mut self,
        applicant: &SubjectId,
        request: ApplicationRequest,
        credit_score_snapshot: u16,
        kyc_completed: bool,
        limits: &UnderwritingConfig,
        now: Timestamp,
    ) -> Result<&LoanApplication, LendingError> {
        validate_request(&request, limits)?;

        let id = self.next_id;
        self.next_id = id.next();
        tracing::info!(
            application = %id,
            applicant = %applicant,
            amount = %request.requested_amount,
            score = credit_score_snapshot,
            "loan application submitted"
        );
        Ok(self.applications.entry(id).or_insert(LoanApplication {
            id,
            applicant: applicant.clone(),
            requested_amount: request.requested_amount,
            requested_term_days: request.requested_term_days,
            purpose: request.purpose,
            credit_score_snapshot,
            annual_income: request.annual_income,
            debt_to_income_bps: request.debt_to_income_bps,
            employment_status: request.employment_status,
            documents_hash_ref: request.documents_hash_ref,
            timestamp: now,
            kyc_completed,
            risk_assessment: None,
            loan_id: None,
        }))
    }

    /// Record the single compliance check for an application.
    pub fn complete_check(
        &mut self,
        id: ApplicationId,
        officer: &SubjectId,
        input: ComplianceCheckInput,
        now: Timestamp,
    ) -> Result<&ComplianceCheck, LendingError> {
        let application = self
            .applications
            .get_mut(&id)
            .ok_or(LendingError::ApplicationNotFound(id))?;
        if self.checks.contains_key(&id) {
            return Err(LendingError::CheckAlreadyCompleted(id));
        }
        if input.kyc_verified {
            application.kyc_completed = true;
        }
        tracing::info!(
            application = %id,
            officer = %officer,
            kyc = input.kyc_verified,
            aml = input.aml_cleared,
            "compliance check completed"
        );
        Ok(self.checks.entry(id).or_insert(ComplianceCheck {
            application_id: id,
            kyc_verified: input.kyc_verified,
            aml_cleared: input.aml_cleared,
            credit_check_completed: input.credit_check_completed,
            income_verified: input.income_verified,
            sanctions_cleared: input.sanctions_cleared,
            officer: officer.clone(),
            timestamp: now,
            notes: input.notes,
        }))
    }

    pub(crate) fn application_mut(&mut self, id: ApplicationId) -> Option<&mut LoanApplication> {
        self.applications.get_mut(&id)
    }
}

fn validate_request(request: &ApplicationRequest, limits: &UnderwritingConfig) -> Result<(), LendingError> {
    if request.requested_amount < limits.min_loan_amount
        || request.requested_amount > limits.max_loan_amount
    {
        return Err(LendingError::InvalidApplication(format!(
            "requested amount {} outside [{}, {}]",
            request.requested_amount, limits.min_loan_amount, limits.max_loan_amount
        )));
    }
    if request.requested_term_days < limits.min_term_days
        || request.requested_term_days > limits.max_term_days
    {
        return Err(LendingError::InvalidApplication(format!(
            "term of {} days outside [{}, {}]",
            request.requested_term_days, limits.min_term_days, limits.max_term_days
        )));
    }
    if !request.debt_to_income_bps.is_fraction() {
        return Err(LendingError::InvalidApplication(format!(
            "debt-to-income {} exceeds 100%",
            request.debt_to_income_bps
        )));
    }
    if request.purpose.trim().is_empty() {
        return Err(LendingError::InvalidApplication("purpose must not be empty".into()));
    }
    Ok(())
}
