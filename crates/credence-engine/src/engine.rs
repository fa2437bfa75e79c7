//! # Credit Engine
//!
//! Owns every component and runs each signed request through one pipeline:
//!
//! ```text
//! derive nonce subject ─► verify signature + nonce ─► access control
//!        ─► handler (compliance gate + component) ─► commit nonce ─► publish events
//! ```
//!
//! Handlers validate before they mutate, and events are staged until the
//! nonce commits, so a request that fails at any step leaves no trace: no
//! state change, no consumed nonce, no published event.

use credence_auth::{
    AccessControl, AuthError, AuthorizationVerifier, IdentityDirectory, Role, RoleSet,
};
use credence_compliance::{ComplianceGate, ComplianceViolation};
use credence_core::{Amount, ApplicationId, DisputeId, EventId, LoanId, SubjectId, Timestamp};
use credence_lending::{
    ApplicationBook, ComplianceCheckInput, LendingError, LendingPool, Loan, LoanApplication,
    LoanRegistry, LoanScoreEvent, UnderwritingEngine,
};
use credence_score::{
    CreditProfile, CreditRecord, Dispute, DisputeError, DisputeManager, KycStatus, NewRecord,
    RecordType, ScoreEngine, ScoreError, ScoreUpdate, MAX_SCORE, MIN_SCORE,
};
use serde::{Deserialize, Serialize};

use crate::advisory::AdvisoryScorer;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event::{DomainEvent, EventEnvelope, EventSink};
use crate::request::{EngineRequest, Operation, Outcome};

// ─── State ───────────────────────────────────────────────────────────

/// Every piece of engine state, serializable so a host can snapshot it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    verifier: AuthorizationVerifier,
    access: AccessControl,
    compliance: ComplianceGate,
    scores: ScoreEngine,
    disputes: DisputeManager,
    applications: ApplicationBook,
    underwriting: UnderwritingEngine,
    loans: LoanRegistry,
    pool: LendingPool,
    next_event_sequence: u64,
}

impl EngineState {
    /// Fresh state for `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            verifier: AuthorizationVerifier::new(),
            access: AccessControl::new(),
            compliance: ComplianceGate::new(config.compliance.clone()),
            scores: ScoreEngine::new(config.score.clone()),
            disputes: DisputeManager::new(),
            applications: ApplicationBook::new(),
            underwriting: UnderwritingEngine::new(config.underwriting.clone()),
            loans: LoanRegistry::new(config.lending.clone()),
            pool: LendingPool::new(),
            next_event_sequence: 0,
        }
    }

    pub fn verifier(&self) -> &AuthorizationVerifier {
        &self.verifier
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn compliance(&self) -> &ComplianceGate {
        &self.compliance
    }

    pub fn scores(&self) -> &ScoreEngine {
        &self.scores
    }

    pub fn disputes(&self) -> &DisputeManager {
        &self.disputes
    }

    pub fn applications(&self) -> &ApplicationBook {
        &self.applications
    }

    pub fn loans(&self) -> &LoanRegistry {
        &self.loans
    }

    pub fn pool(&self) -> &LendingPool {
        &self.pool
    }

    /// Sequence number the next published event will carry.
    pub fn next_event_sequence(&self) -> u64 {
        self.next_event_sequence
    }
}

/// Caller identity and logical time, threaded through every handler.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub caller: SubjectId,
    pub roles: RoleSet,
    pub now: Timestamp,
}

/// A subject's credit summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditReport {
    pub subject: SubjectId,
    pub score: u16,
    pub risk_level: u8,
    pub kyc_status: KycStatus,
    pub frozen: bool,
    pub record_count: u64,
    pub open_disputes: usize,
    pub active_loans: usize,
    /// Opinion of the external model, if one is installed. Never
    /// authoritative.
    pub advisory_score: Option<u16>,
    pub generated_at: Timestamp,
}

// ─── Engine ──────────────────────────────────────────────────────────

/// The engine facade.
pub struct CreditEngine<D, S> {
    state: EngineState,
    directory: D,
    sink: S,
    advisory: Option<Box<dyn AdvisoryScorer>>,
}

impl<D: IdentityDirectory, S: EventSink> CreditEngine<D, S> {
    /// An engine with fresh state. Fails if `config` does not validate.
    pub fn new(config: EngineConfig, directory: D, sink: S) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::from_state(EngineState::new(&config), directory, sink))
    }

    /// Resume from a snapshot.
    pub fn from_state(state: EngineState, directory: D, sink: S) -> Self {
        Self {
            state,
            directory,
            sink,
            advisory: None,
        }
    }

    /// Install an advisory scorer for credit reports.
    pub fn with_advisory_scorer(mut self, scorer: impl AdvisoryScorer + 'static) -> Self {
        self.advisory = Some(Box::new(scorer));
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn into_state(self) -> EngineState {
        self.state
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut D {
        &mut self.directory
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Whether mutations are halted.
    pub fn is_paused(&self) -> bool {
        self.state.access.is_paused()
    }

    /// The nonce `subject`'s next request must declare.
    pub fn current_nonce(&self, subject: &SubjectId) -> u64 {
        self.state.verifier.current_nonce(subject)
    }

    // ── Mutations ─────────────────────────────────────────────────────

    /// Execute one signed request at logical time `now`.
    pub fn submit(&mut self, request: &EngineRequest, now: Timestamp) -> Result<Outcome, EngineError> {
        let operation = request.payload.operation.name();
        let result = self.execute(request, now);
        let label = match &result {
            Ok(_) => "accepted",
            Err(e) => e.kind().as_str(),
        };
        metrics::counter!("credence_requests_total", "operation" => operation, "outcome" => label)
            .increment(1);
        match &result {
            Ok(_) => tracing::info!(
                operation,
                signer = %request.signer,
                subject = %request.payload.subject,
                nonce = request.payload.nonce,
                "request accepted"
            ),
            Err(e) => tracing::warn!(
                operation,
                signer = %request.signer,
                kind = %e.kind(),
                error = %e,
                "request rejected"
            ),
        }
        result
    }

    fn execute(&mut self, request: &EngineRequest, now: Timestamp) -> Result<Outcome, EngineError> {
        let payload = &request.payload;
        let expected = self.request_subject(&payload.operation, &request.signer)?;
        if payload.subject != expected {
            return Err(AuthError::SubjectMismatch {
                declared: payload.subject.clone(),
                expected,
            }
            .into());
        }
        let reservation = self.state.verifier.verify(request, &self.directory)?;

        let ctx = CallContext {
            caller: request.signer.clone(),
            roles: self.directory.roles(&request.signer),
            now,
        };
        self.state
            .access
            .check(&ctx.caller, &ctx.roles, payload.operation.requirement())?;

        let mut staged = Vec::new();
        let outcome = self.dispatch(&ctx, payload.operation.clone(), &mut staged)?;
        self.state.verifier.commit(reservation)?;
        self.publish(staged, now);
        Ok(outcome)
    }

    /// Whose nonce counter `operation` consumes when signed by `signer`.
    /// A request must declare this subject in its payload.
    pub fn request_subject(
        &self,
        operation: &Operation,
        signer: &SubjectId,
    ) -> Result<SubjectId, EngineError> {
        let state = &self.state;
        let subject = match operation {
            Operation::AddCreditRecord { subject, .. }
            | Operation::MarkRepaid { subject, .. }
            | Operation::DisputeRecord { subject, .. }
            | Operation::FreezeProfile { subject, .. }
            | Operation::UnfreezeProfile { subject }
            | Operation::SetKycStatus { subject, .. } => subject.clone(),
            Operation::ResolveDispute { dispute_id, .. } => state
                .disputes
                .dispute(*dispute_id)
                .ok_or(DisputeError::NotFound(*dispute_id))?
                .subject
                .clone(),
            Operation::CompleteComplianceCheck { application_id, .. }
            | Operation::UnderwriteLoan { application_id, .. } => state
                .applications
                .application(*application_id)
                .ok_or(LendingError::ApplicationNotFound(*application_id))?
                .applicant
                .clone(),
            Operation::FundLoan { loan_id }
            | Operation::MakePayment { loan_id, .. }
            | Operation::DepositCollateral { loan_id, .. }
            | Operation::MarkLoanAsDefaulted { loan_id }
            | Operation::LiquidateLoan { loan_id }
            | Operation::CancelLoan { loan_id, .. } => state.loans.loan(*loan_id)?.borrower.clone(),
            Operation::SubmitLoanApplication { .. }
            | Operation::ProvideLiquidity { .. }
            | Operation::SetPaused { .. } => signer.clone(),
        };
        Ok(subject)
    }

    fn dispatch(
        &mut self,
        ctx: &CallContext,
        operation: Operation,
        staged: &mut Vec<DomainEvent>,
    ) -> Result<Outcome, EngineError> {
        match operation {
            Operation::AddCreditRecord {
                subject,
                amount,
                record_type,
                score_impact,
                data_hash_ref,
            } => {
                let record = NewRecord {
                    amount,
                    record_type,
                    score_impact,
                    data_hash_ref,
                };
                self.add_credit_record(ctx, &subject, record, staged)
            }
            Operation::MarkRepaid {
                subject,
                record_index,
            } => self.mark_repaid(ctx, &subject, record_index, staged),
            Operation::DisputeRecord {
                subject,
                record_index,
                reason,
            } => {
                let state = &mut self.state;
                let dispute = state
                    .disputes
                    .open(&mut state.scores, &ctx.caller, &subject, record_index, &reason, ctx.now)?
                    .clone();
                staged.push(DomainEvent::DisputeRaised {
                    dispute_id: dispute.id,
                    subject: dispute.subject.clone(),
                    record_id: dispute.record_id,
                    reason: dispute.reason.clone(),
                });
                Ok(Outcome::DisputeOpened(dispute))
            }
            Operation::ResolveDispute {
                dispute_id,
                upheld,
                resolution,
            } => self.resolve_dispute(ctx, dispute_id, upheld, &resolution, staged),
            Operation::FreezeProfile { subject, reason } => {
                self.state.scores.freeze(&subject, ctx.now)?;
                let violation = self
                    .state
                    .compliance
                    .record_freeze(&subject, &ctx.caller, &reason, ctx.now);
                staged.push(DomainEvent::ProfileFrozen {
                    subject: subject.clone(),
                    officer: ctx.caller.clone(),
                    reason,
                });
                staged.push(violation_event(&violation));
                Ok(Outcome::ProfileFrozen { subject })
            }
            Operation::UnfreezeProfile { subject } => {
                self.state.scores.unfreeze(&subject, ctx.now)?;
                staged.push(DomainEvent::ProfileUnfrozen {
                    subject: subject.clone(),
                    officer: ctx.caller.clone(),
                });
                Ok(Outcome::ProfileUnfrozen { subject })
            }
            Operation::SetKycStatus { subject, status } => {
                let previous = self.state.scores.set_kyc_status(&subject, status, ctx.now)?;
                staged.push(DomainEvent::KycStatusChanged {
                    subject: subject.clone(),
                    previous,
                    status,
                });
                Ok(Outcome::KycStatusSet { subject, previous })
            }
            Operation::SubmitLoanApplication { application } => {
                let scores = &self.state.scores;
                let snapshot = scores.score_or_initial(&ctx.caller);
                let kyc_completed = scores
                    .profile(&ctx.caller)
                    .is_some_and(CreditProfile::is_kyc_verified);
                let submitted = self
                    .state
                    .applications
                    .submit(
                        &ctx.caller,
                        application,
                        snapshot,
                        kyc_completed,
                        self.state.underwriting.config(),
                        ctx.now,
                    )?
                    .clone();
                staged.push(DomainEvent::ApplicationSubmitted {
                    application_id: submitted.id,
                    applicant: submitted.applicant.clone(),
                    requested_amount: submitted.requested_amount,
                    credit_score_snapshot: submitted.credit_score_snapshot,
                });
                Ok(Outcome::ApplicationSubmitted(submitted))
            }
            Operation::CompleteComplianceCheck {
                application_id,
                check,
            } => self.complete_compliance_check(ctx, application_id, check, staged),
            Operation::UnderwriteLoan {
                application_id,
                terms,
            } => {
                let loan = self
                    .state
                    .underwriting
                    .underwrite(
                        &mut self.state.applications,
                        &mut self.state.loans,
                        application_id,
                        &ctx.caller,
                        terms,
                        ctx.now,
                    )?
                    .clone();
                let risk_tier = self
                    .state
                    .applications
                    .application(application_id)
                    .and_then(|a| a.risk_assessment);
                staged.push(DomainEvent::LoanApproved {
                    loan_id: loan.id,
                    application_id,
                    borrower: loan.borrower.clone(),
                    principal: loan.terms.principal,
                    interest_rate_bps: loan.terms.interest_rate_bps,
                    risk_tier,
                    collateral_required: loan.terms.collateral_required,
                });
                Ok(Outcome::LoanApproved(loan))
            }
            Operation::FundLoan { loan_id } => {
                let principal = self.state.loans.loan(loan_id)?.terms.principal;
                let funded = self.state.loans.fund(loan_id, &mut self.state.pool, ctx.now)?;
                staged.push(DomainEvent::LoanFunded {
                    loan_id,
                    borrower: funded.borrower.clone(),
                    net_disbursed: funded.net_disbursed,
                    origination_fee: funded.origination_fee,
                    due_at: funded.due_at,
                });
                self.post_loan_score(ctx, &funded.borrower, loan_id, funded.score_event, principal, staged)?;
                Ok(Outcome::LoanFunded(funded))
            }
            Operation::MakePayment {
                loan_id,
                amount,
                method,
            } => self.make_payment(ctx, loan_id, amount, &method, staged),
            Operation::DepositCollateral {
                loan_id,
                amount,
                token_ref,
            } => {
                let total = self.state.loans.deposit_collateral(
                    loan_id,
                    &ctx.caller,
                    amount,
                    &token_ref,
                    &mut self.state.pool,
                    ctx.now,
                )?;
                staged.push(DomainEvent::CollateralDeposited {
                    loan_id,
                    amount,
                    total,
                    token_ref,
                });
                Ok(Outcome::CollateralDeposited { loan_id, total })
            }
            Operation::MarkLoanAsDefaulted { loan_id } => {
                let defaulted = self.state.loans.mark_defaulted(loan_id, ctx.now)?;
                staged.push(DomainEvent::LoanDefaulted {
                    loan_id,
                    borrower: defaulted.borrower.clone(),
                    outstanding: defaulted.outstanding,
                });
                self.post_loan_score(
                    ctx,
                    &defaulted.borrower,
                    loan_id,
                    defaulted.score_event,
                    defaulted.outstanding,
                    staged,
                )?;
                Ok(Outcome::LoanDefaulted(defaulted))
            }
            Operation::LiquidateLoan { loan_id } => {
                let liquidated = self.state.loans.liquidate(loan_id, &mut self.state.pool, ctx.now)?;
                staged.push(DomainEvent::LoanLiquidated {
                    loan_id,
                    borrower: liquidated.borrower.clone(),
                    recovered: liquidated.recovered,
                    loss: liquidated.loss,
                });
                Ok(Outcome::LoanLiquidated(liquidated))
            }
            Operation::CancelLoan { loan_id, reason } => {
                let is_officer = ctx.roles.satisfies_any(&[Role::LoanOfficer]);
                let cancelled = self.state.loans.cancel(
                    loan_id,
                    &ctx.caller,
                    is_officer,
                    &reason,
                    &mut self.state.pool,
                    ctx.now,
                )?;
                if let Some(amount) = cancelled.collateral_returned {
                    staged.push(DomainEvent::CollateralReleased {
                        loan_id,
                        borrower: cancelled.borrower.clone(),
                        amount,
                    });
                }
                staged.push(DomainEvent::LoanCancelled {
                    loan_id,
                    borrower: cancelled.borrower.clone(),
                    reason,
                });
                Ok(Outcome::LoanCancelled(cancelled))
            }
            Operation::ProvideLiquidity { amount } => {
                let reserve = self.state.pool.provide_liquidity(&ctx.caller, amount, ctx.now)?;
                staged.push(DomainEvent::LiquidityProvided {
                    provider: ctx.caller.clone(),
                    amount,
                    reserve,
                });
                Ok(Outcome::LiquidityProvided { reserve })
            }
            Operation::SetPaused { paused } => {
                let changed = self.state.access.set_paused(paused, &ctx.caller, ctx.now);
                if changed {
                    staged.push(DomainEvent::PauseChanged {
                        paused,
                        by: ctx.caller.clone(),
                    });
                }
                Ok(Outcome::PauseSet { paused, changed })
            }
        }
    }

    // ── Handlers ──────────────────────────────────────────────────────

    fn add_credit_record(
        &mut self,
        ctx: &CallContext,
        subject: &SubjectId,
        record: NewRecord,
        staged: &mut Vec<DomainEvent>,
    ) -> Result<Outcome, EngineError> {
        let scores = &self.state.scores;
        let admission = self.state.compliance.admit(
            &ctx.caller,
            subject,
            scores.is_frozen(subject),
            record.amount,
            scores.record_timestamps(subject),
            ctx.now,
        )?;
        let flags = admission.flags().to_vec();
        let update = self.state.scores.add_record(
            subject,
            &ctx.caller,
            record,
            admission.flag_labels(),
            ctx.now,
        )?;
        let violations = self.state.compliance.commit(admission);

        stage_score_update(&self.state.scores, &update, staged);
        staged.extend(violations.iter().map(violation_event));
        Ok(Outcome::RecordAdded { update, flags })
    }

    fn mark_repaid(
        &mut self,
        ctx: &CallContext,
        subject: &SubjectId,
        index: usize,
        staged: &mut Vec<DomainEvent>,
    ) -> Result<Outcome, EngineError> {
        let scores = &self.state.scores;
        let amount = scores.repayable(subject, index, &ctx.caller)?.amount;
        let admission = self.state.compliance.admit(
            &ctx.caller,
            subject,
            scores.is_frozen(subject),
            amount,
            scores.record_timestamps(subject),
            ctx.now,
        )?;
        let (record_id, update) = self
            .state
            .scores
            .mark_repaid(subject, index, &ctx.caller, ctx.now)?;
        let violations = self.state.compliance.commit(admission);

        staged.push(DomainEvent::RecordRepaid {
            subject: subject.clone(),
            record_id,
            provider: ctx.caller.clone(),
        });
        stage_score_update(&self.state.scores, &update, staged);
        staged.extend(violations.iter().map(violation_event));
        Ok(Outcome::RecordRepaid { record_id, update })
    }

    fn resolve_dispute(
        &mut self,
        ctx: &CallContext,
        id: DisputeId,
        upheld: bool,
        resolution: &str,
        staged: &mut Vec<DomainEvent>,
    ) -> Result<Outcome, EngineError> {
        let state = &mut self.state;
        let resolved = state
            .disputes
            .resolve(&mut state.scores, id, upheld, resolution, &ctx.caller, ctx.now)?;
        staged.push(DomainEvent::DisputeResolved {
            dispute_id: id,
            subject: resolved.dispute.subject.clone(),
            upheld,
            resolution: resolution.to_string(),
            resolver: ctx.caller.clone(),
        });
        if let Some(update) = &resolved.reversal {
            stage_score_update(&state.scores, update, staged);
        }
        Ok(Outcome::DisputeResolved(resolved))
    }

    fn complete_compliance_check(
        &mut self,
        ctx: &CallContext,
        id: ApplicationId,
        input: ComplianceCheckInput,
        staged: &mut Vec<DomainEvent>,
    ) -> Result<Outcome, EngineError> {
        let applicant = self
            .state
            .applications
            .application(id)
            .ok_or(LendingError::ApplicationNotFound(id))?
            .applicant
            .clone();
        let check = self
            .state
            .applications
            .complete_check(id, &ctx.caller, input, ctx.now)?
            .clone();
        staged.push(DomainEvent::ComplianceCheckCompleted {
            application_id: id,
            officer: ctx.caller.clone(),
            kyc_verified: check.kyc_verified,
            aml_cleared: check.aml_cleared,
        });

        let unverified_profile = self
            .state
            .scores
            .profile(&applicant)
            .is_some_and(|p| !p.is_kyc_verified());
        if check.kyc_verified && unverified_profile {
            let previous = self
                .state
                .scores
                .set_kyc_status(&applicant, KycStatus::Verified, ctx.now)?;
            staged.push(DomainEvent::KycStatusChanged {
                subject: applicant,
                previous,
                status: KycStatus::Verified,
            });
        }
        Ok(Outcome::ComplianceCheckCompleted(check))
    }

    fn make_payment(
        &mut self,
        ctx: &CallContext,
        loan_id: LoanId,
        amount: Amount,
        method: &str,
        staged: &mut Vec<DomainEvent>,
    ) -> Result<Outcome, EngineError> {
        let paid = self.state.loans.make_payment(
            loan_id,
            &ctx.caller,
            amount,
            method,
            &mut self.state.pool,
            ctx.now,
        )?;
        staged.push(DomainEvent::PaymentMade {
            loan_id,
            payer: ctx.caller.clone(),
            amount: paid.payment.amount,
            principal_portion: paid.payment.principal_portion,
            interest_portion: paid.payment.interest_portion,
            fees_portion: paid.payment.fees_portion,
            unapplied: paid.breakdown.unapplied,
            late: paid.breakdown.late,
        });
        if paid.repaid {
            staged.push(DomainEvent::LoanRepaid {
                loan_id,
                borrower: paid.borrower.clone(),
            });
        }
        if let Some(released) = paid.collateral_released {
            staged.push(DomainEvent::CollateralReleased {
                loan_id,
                borrower: paid.borrower.clone(),
                amount: released,
            });
        }
        self.post_loan_score(
            ctx,
            &paid.borrower,
            loan_id,
            paid.score_event,
            paid.payment.amount,
            staged,
        )?;
        Ok(Outcome::PaymentMade(paid))
    }

    /// Post a lifecycle step's score effect as a system record.
    fn post_loan_score(
        &mut self,
        ctx: &CallContext,
        borrower: &SubjectId,
        loan_id: LoanId,
        event: LoanScoreEvent,
        amount: Amount,
        staged: &mut Vec<DomainEvent>,
    ) -> Result<(), EngineError> {
        let record_type = match event {
            LoanScoreEvent::Funded => RecordType::Loan,
            LoanScoreEvent::OnTimePayment => RecordType::Payment,
            LoanScoreEvent::LatePayment => RecordType::LatePayment,
            LoanScoreEvent::Repaid => RecordType::Repayment,
            LoanScoreEvent::Defaulted => RecordType::Default,
        };
        let update = self.state.scores.post_system_record(
            borrower,
            &ctx.caller,
            record_type,
            amount,
            event.impact(),
            format!("{loan_id} {}", event.as_str()),
            ctx.now,
        )?;
        stage_score_update(&self.state.scores, &update, staged);
        Ok(())
    }

    fn publish(&mut self, staged: Vec<DomainEvent>, now: Timestamp) {
        for event in staged {
            let envelope = EventEnvelope {
                event_id: EventId::new(),
                sequence: self.state.next_event_sequence,
                occurred_at: now,
                event,
            };
            self.state.next_event_sequence += 1;
            self.sink.publish(&envelope);
        }
    }

    // ── Reads ─────────────────────────────────────────────────────────

    fn authorize_read(&self, caller: &SubjectId, subject: &SubjectId) -> Result<(), EngineError> {
        let roles = self.directory.roles(caller);
        self.state.access.check_read(caller, &roles, subject)?;
        Ok(())
    }

    /// `subject`'s score.
    pub fn credit_score(&self, caller: &SubjectId, subject: &SubjectId) -> Result<u16, EngineError> {
        self.authorize_read(caller, subject)?;
        Ok(self.state.scores.score(subject)?)
    }

    /// `subject`'s records, oldest first.
    pub fn credit_history(
        &self,
        caller: &SubjectId,
        subject: &SubjectId,
        include_expired: bool,
        now: Timestamp,
    ) -> Result<Vec<&CreditRecord>, EngineError> {
        self.authorize_read(caller, subject)?;
        Ok(self.state.scores.history(subject, include_expired, now))
    }

    /// A loan, readable by its borrower and staff.
    pub fn loan_details(&self, caller: &SubjectId, loan_id: LoanId) -> Result<&Loan, EngineError> {
        let loan = self.state.loans.loan(loan_id)?;
        self.authorize_read(caller, &loan.borrower)?;
        Ok(loan)
    }

    /// Every loan held by `borrower`.
    pub fn borrower_loans(&self, caller: &SubjectId, borrower: &SubjectId) -> Result<Vec<&Loan>, EngineError> {
        self.authorize_read(caller, borrower)?;
        Ok(self.state.loans.loans_for(borrower))
    }

    /// An application, readable by its applicant and staff.
    pub fn application(
        &self,
        caller: &SubjectId,
        id: ApplicationId,
    ) -> Result<&LoanApplication, EngineError> {
        let application = self
            .state
            .applications
            .application(id)
            .ok_or(LendingError::ApplicationNotFound(id))?;
        self.authorize_read(caller, &application.applicant)?;
        Ok(application)
    }

    /// A dispute, readable by the disputed record's subject and staff.
    pub fn dispute(&self, caller: &SubjectId, id: DisputeId) -> Result<&Dispute, EngineError> {
        let dispute = self
            .state
            .disputes
            .dispute(id)
            .ok_or(DisputeError::NotFound(id))?;
        self.authorize_read(caller, &dispute.subject)?;
        Ok(dispute)
    }

    /// Compliance violations concerning `subject`.
    pub fn compliance_violations(
        &self,
        caller: &SubjectId,
        subject: &SubjectId,
    ) -> Result<Vec<&ComplianceViolation>, EngineError> {
        self.authorize_read(caller, subject)?;
        Ok(self.state.compliance.violations().for_subject(subject).collect())
    }

    /// Score, profile summary and advisory opinion for `subject`.
    pub fn credit_report(
        &self,
        caller: &SubjectId,
        subject: &SubjectId,
        now: Timestamp,
    ) -> Result<CreditReport, EngineError> {
        self.authorize_read(caller, subject)?;
        let scores = &self.state.scores;
        let profile = scores
            .profile(subject)
            .ok_or_else(|| ScoreError::ProfileNotFound(subject.clone()))?;
        let advisory_score = self.advisory.as_ref().and_then(|scorer| {
            let history = scores.history(subject, false, now);
            scorer
                .advisory_score(profile, &history)
                .filter(|s| (MIN_SCORE..=MAX_SCORE).contains(s))
        });
        Ok(CreditReport {
            subject: subject.clone(),
            score: profile.score,
            risk_level: profile.risk_level,
            kyc_status: profile.kyc_status,
            frozen: profile.frozen,
            record_count: profile.record_count,
            open_disputes: self
                .state
                .disputes
                .disputes_for(subject)
                .filter(|d| !d.resolved)
                .count(),
            active_loans: self
                .state
                .loans
                .loans_for(subject)
                .iter()
                .filter(|l| !l.status.is_terminal())
                .count(),
            advisory_score,
            generated_at: now,
        })
    }
}

fn stage_score_update(scores: &ScoreEngine, update: &ScoreUpdate, staged: &mut Vec<DomainEvent>) {
    if let Some(record) = scores.record_by_id(update.record_id) {
        staged.push(DomainEvent::RecordAdded {
            subject: update.subject.clone(),
            record_id: record.id,
            record_index: update.record_index,
            provider: record.provider.clone(),
            record_type: record.record_type,
            amount: record.amount,
            score_impact: record.score_impact,
            compliance_flags: record.compliance_flags.clone(),
        });
    }
    staged.push(DomainEvent::ScoreUpdated {
        subject: update.subject.clone(),
        old_score: update.old_score,
        new_score: update.new_score,
        decay: update.decay,
        risk_level: update.risk_level,
        reason: update.reason.clone(),
    });
}

fn violation_event(violation: &ComplianceViolation) -> DomainEvent {
    DomainEvent::ComplianceViolation {
        sequence: violation.sequence,
        subject: violation.subject.clone(),
        kind: violation.kind,
        reported_by: violation.reported_by.clone(),
        detail: violation.detail.clone(),
        digest: violation.digest().map(|d| d.to_hex()),
    }
}
