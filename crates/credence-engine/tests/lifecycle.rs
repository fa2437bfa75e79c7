//! End-to-end tests through the signed-request pipeline.

use std::collections::HashMap;

use credence_auth::{AuthError, InMemoryDirectory, RequestPayload, Role};
use credence_compliance::{ComplianceError, ViolationKind};
use credence_core::{Amount, Bps, ErrorKind, LoanId, SubjectId, Timestamp};
use credence_crypto::Ed25519KeyPair;
use credence_engine::{
    CreditEngine, DomainEvent, EngineConfig, EngineError, EngineRequest, Operation, Outbox,
    Outcome,
};
use credence_lending::{
    ApplicationRequest, ComplianceCheckInput, InterestScaling, LendingError, LoanStatus,
    UnderwritingTerms,
};
use credence_score::{
    CreditProfile, CreditRecord, DisputeError, KycStatus, RecordType, ScoreError, MAX_SCORE,
    MIN_SCORE,
};
use proptest::prelude::*;

// ── Harness ──────────────────────────────────────────────────────────

const ACTORS: &[(&str, &[Role])] = &[
    ("bureau", &[Role::DataProvider]),
    ("bureau2", &[Role::DataProvider]),
    ("officer", &[Role::ComplianceOfficer]),
    ("underwriter", &[Role::Underwriter]),
    ("lender", &[Role::LoanOfficer]),
    ("admin", &[Role::Admin]),
    ("auditor", &[Role::Auditor]),
    ("alice", &[]),
    ("bob", &[]),
];

fn s(id: &str) -> SubjectId {
    SubjectId::new(id).unwrap()
}

fn t0() -> Timestamp {
    Timestamp::parse("2026-01-05T09:00:00Z").unwrap()
}

struct Harness {
    engine: CreditEngine<InMemoryDirectory, Outbox>,
    keys: HashMap<&'static str, Ed25519KeyPair>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        let mut directory = InMemoryDirectory::new();
        let mut keys = HashMap::new();
        for (i, (name, roles)) in ACTORS.iter().enumerate() {
            let key = Ed25519KeyPair::from_seed(&[i as u8 + 1; 32]);
            directory.register(s(name), key.public_key(), roles.iter().copied());
            keys.insert(*name, key);
        }
        let engine = CreditEngine::new(config, directory, Outbox::new()).unwrap();
        Self { engine, keys }
    }

    fn request(&self, signer: &str, subject: &str, operation: Operation) -> EngineRequest {
        let nonce = self.engine.current_nonce(&s(subject));
        RequestPayload::new(s(subject), nonce, operation)
            .sign(s(signer), &self.keys[signer])
            .unwrap()
    }

    fn submit(
        &mut self,
        signer: &str,
        subject: &str,
        operation: Operation,
        now: Timestamp,
    ) -> Result<Outcome, EngineError> {
        let request = self.request(signer, subject, operation);
        self.engine.submit(&request, now)
    }

    fn add_record(&mut self, subject: &str, impact: i32, now: Timestamp) -> Result<Outcome, EngineError> {
        self.submit(
            "bureau",
            subject,
            Operation::AddCreditRecord {
                subject: s(subject),
                amount: Amount::new(1_000),
                record_type: RecordType::Payment,
                score_impact: impact,
                data_hash_ref: String::new(),
            },
            now,
        )
    }

    fn score(&self, subject: &str) -> u16 {
        self.engine.credit_score(&s(subject), &s(subject)).unwrap()
    }

    fn event_count(&self) -> usize {
        self.engine.sink().len()
    }

    fn events_named(&self, name: &str) -> usize {
        self.engine
            .sink()
            .events()
            .iter()
            .filter(|e| e.event.name() == name)
            .count()
    }

    fn loan_status(&self, id: LoanId) -> LoanStatus {
        self.engine.loan_details(&s("lender"), id).unwrap().status
    }

    /// Take alice from nothing to an APPROVED, collateralized loan of
    /// 100_000 at 12% for a year.
    fn approved_loan(&mut self, allow_prepayment: bool) -> LoanId {
        self.add_record("alice", 5, t0()).unwrap();
        self.submit(
            "lender",
            "lender",
            Operation::ProvideLiquidity {
                amount: Amount::new(1_000_000),
            },
            t0(),
        )
        .unwrap();

        let application = match self
            .submit(
                "alice",
                "alice",
                Operation::SubmitLoanApplication {
                    application: ApplicationRequest {
                        requested_amount: Amount::new(100_000),
                        requested_term_days: 365,
                        purpose: "equipment".into(),
                        annual_income: Amount::new(600_000),
                        debt_to_income_bps: Bps(2_000),
                        employment_status: "employed".into(),
                        documents_hash_ref: String::new(),
                    },
                },
                t0(),
            )
            .unwrap()
        {
            Outcome::ApplicationSubmitted(app) => app.id,
            other => panic!("unexpected outcome {other:?}"),
        };

        self.submit(
            "officer",
            "alice",
            Operation::CompleteComplianceCheck {
                application_id: application,
                check: ComplianceCheckInput {
                    kyc_verified: true,
                    aml_cleared: true,
                    ..Default::default()
                },
            },
            t0(),
        )
        .unwrap();

        let loan = match self
            .submit(
                "underwriter",
                "alice",
                Operation::UnderwriteLoan {
                    application_id: application,
                    terms: UnderwritingTerms {
                        amount: Amount::new(100_000),
                        interest_rate_bps: Bps(1_200),
                        term_days: 365,
                        origination_fee_bps: Bps(100),
                        late_payment_fee: Amount::new(50),
                        prepayment_penalty_bps: Bps(0),
                        allow_prepayment,
                        require_collateral: false,
                    },
                },
                t0(),
            )
            .unwrap()
        {
            Outcome::LoanApproved(loan) => loan,
            other => panic!("unexpected outcome {other:?}"),
        };
        // A 505 snapshot is VERY_HIGH risk, so collateral is mandatory.
        assert!(loan.terms.collateral_required);

        self.submit(
            "alice",
            "alice",
            Operation::DepositCollateral {
                loan_id: loan.id,
                amount: Amount::new(20_000),
                token_ref: "TOKEN-A".into(),
            },
            t0(),
        )
        .unwrap();
        loan.id
    }

    fn funded_loan(&mut self, allow_prepayment: bool) -> LoanId {
        let id = self.approved_loan(allow_prepayment);
        self.submit("lender", "alice", Operation::FundLoan { loan_id: id }, t0())
            .unwrap();
        id
    }

    fn pay(&mut self, loan_id: LoanId, amount: u64, now: Timestamp) -> Result<Outcome, EngineError> {
        self.submit(
            "alice",
            "alice",
            Operation::MakePayment {
                loan_id,
                amount: Amount::new(amount),
                method: "transfer".into(),
            },
            now,
        )
    }
}

// ── Scoring ──────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn score_stays_within_bounds(impacts in prop::collection::vec(-50i32..=50, 1..25)) {
        let mut h = Harness::new();
        for (i, impact) in impacts.iter().enumerate() {
            let now = t0().plus_secs(i as i64 * 3_600);
            h.add_record("alice", *impact, now).unwrap();
            let score = h.score("alice");
            prop_assert!((MIN_SCORE..=MAX_SCORE).contains(&score));
        }
    }
}

#[test]
fn first_record_on_fresh_profile_moves_score_from_500() {
    let mut h = Harness::new();
    let outcome = h.add_record("alice", 5, t0()).unwrap();
    match outcome {
        Outcome::RecordAdded { update, flags } => {
            assert_eq!(update.old_score, 500);
            assert_eq!(update.new_score, 505);
            assert!(update.profile_created);
            assert!(flags.is_empty());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(h.score("alice"), 505);
    assert_eq!(h.events_named("record_added"), 1);
    assert_eq!(h.events_named("score_updated"), 1);
}

#[test]
fn impact_limits_are_inclusive() {
    let mut h = Harness::new();
    h.add_record("alice", 50, t0()).unwrap();
    h.add_record("alice", -50, t0()).unwrap();

    let err = h.add_record("alice", 51, t0()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = h.add_record("alice", -51, t0()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.score("alice"), 500);
}

#[test]
fn repeated_positive_records_never_exceed_ceiling() {
    let mut h = Harness::new();
    let mut last = 500;
    for i in 0..20 {
        h.add_record("alice", 10, t0().plus_secs(i * 60)).unwrap();
        let score = h.score("alice");
        assert!(score >= last);
        assert!(score <= MAX_SCORE);
        last = score;
    }
    assert_eq!(last, 700);

    let mut h = Harness::new();
    for i in 0..20 {
        h.add_record("bob", 50, t0().plus_secs(i * 60)).unwrap();
    }
    assert_eq!(h.score("bob"), MAX_SCORE);
}

#[test]
fn mark_repaid_twice_is_a_state_error() {
    let mut h = Harness::new();
    h.add_record("alice", -20, t0()).unwrap();
    let repay = Operation::MarkRepaid {
        subject: s("alice"),
        record_index: 0,
    };
    match h.submit("bureau", "alice", repay.clone(), t0()).unwrap() {
        Outcome::RecordRepaid { update, .. } => assert_eq!(update.new_score, 490),
        other => panic!("unexpected outcome {other:?}"),
    }
    let err = h.submit("bureau", "alice", repay, t0()).unwrap_err();
    assert!(matches!(err, EngineError::Score(ScoreError::AlreadyRepaid(_))));
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn repaid_record_is_a_state_error_even_with_quota_spent() {
    let mut config = EngineConfig::default();
    config.compliance.daily_provider_quota = 2;
    let mut h = Harness::with_config(config);
    h.add_record("alice", -20, t0()).unwrap();
    let repay = Operation::MarkRepaid {
        subject: s("alice"),
        record_index: 0,
    };
    h.submit("bureau", "alice", repay.clone(), t0()).unwrap();

    let err = h.submit("bureau", "alice", repay, t0()).unwrap_err();
    assert!(matches!(err, EngineError::Score(ScoreError::AlreadyRepaid(_))));
    assert_eq!(err.kind(), ErrorKind::State);

    let err = h.add_record("alice", 1, t0()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compliance);
}

#[test]
fn only_the_original_provider_may_mark_repaid() {
    let mut h = Harness::new();
    h.add_record("alice", -20, t0()).unwrap();
    let err = h
        .submit(
            "bureau2",
            "alice",
            Operation::MarkRepaid {
                subject: s("alice"),
                record_index: 0,
            },
            t0(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Score(ScoreError::NotOriginalProvider { .. })));
}

#[test]
fn frozen_profile_rejects_provider_records_until_unfrozen() {
    let mut h = Harness::new();
    h.add_record("alice", 5, t0()).unwrap();
    h.submit(
        "officer",
        "alice",
        Operation::FreezeProfile {
            subject: s("alice"),
            reason: "identity theft report".into(),
        },
        t0(),
    )
    .unwrap();
    assert_eq!(h.events_named("compliance_violation"), 1);

    let err = h.add_record("alice", 5, t0()).unwrap_err();
    assert!(matches!(err, EngineError::Compliance(ComplianceError::ProfileFrozen { .. })));
    assert_eq!(err.kind(), ErrorKind::Compliance);

    h.submit(
        "officer",
        "alice",
        Operation::UnfreezeProfile { subject: s("alice") },
        t0(),
    )
    .unwrap();
    h.add_record("alice", 5, t0()).unwrap();
    assert_eq!(h.score("alice"), 510);
}

#[test]
fn large_amounts_are_flagged_but_accepted() {
    let mut h = Harness::new();
    let outcome = h
        .submit(
            "bureau",
            "alice",
            Operation::AddCreditRecord {
                subject: s("alice"),
                amount: Amount::new(5_000_000),
                record_type: RecordType::Loan,
                score_impact: 0,
                data_hash_ref: String::new(),
            },
            t0(),
        )
        .unwrap();
    match outcome {
        Outcome::RecordAdded { flags, .. } => assert_eq!(flags, vec![ViolationKind::LargeAmount]),
        other => panic!("unexpected outcome {other:?}"),
    }
    let violations = h
        .engine
        .compliance_violations(&s("auditor"), &s("alice"))
        .unwrap();
    assert_eq!(violations.len(), 1);
    let history = h
        .engine
        .credit_history(&s("alice"), &s("alice"), false, t0())
        .unwrap();
    assert_eq!(history[0].compliance_flags, vec!["large_amount".to_string()]);
}

// ── Authorization ────────────────────────────────────────────────────

#[test]
fn replayed_request_is_rejected_without_effect() {
    let mut h = Harness::new();
    let request = h.request(
        "bureau",
        "alice",
        Operation::AddCreditRecord {
            subject: s("alice"),
            amount: Amount::new(1_000),
            record_type: RecordType::Payment,
            score_impact: 5,
            data_hash_ref: String::new(),
        },
    );
    h.engine.submit(&request, t0()).unwrap();
    let events = h.event_count();

    let err = h.engine.submit(&request, t0()).unwrap_err();
    assert!(matches!(err, EngineError::Auth(AuthError::NonceReused { .. })));
    assert_eq!(h.score("alice"), 505);
    assert_eq!(h.engine.current_nonce(&s("alice")), 1);
    assert_eq!(h.event_count(), events);
}

#[test]
fn failed_request_leaves_nonce_reusable() {
    let mut h = Harness::new();
    let err = h.add_record("alice", 51, t0()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.engine.current_nonce(&s("alice")), 0);
    assert_eq!(h.event_count(), 0);

    // Same nonce, valid content.
    h.add_record("alice", 5, t0()).unwrap();
    assert_eq!(h.engine.current_nonce(&s("alice")), 1);
}

#[test]
fn tampered_payload_fails_verification() {
    let mut h = Harness::new();
    let mut request = h.request(
        "bureau",
        "alice",
        Operation::AddCreditRecord {
            subject: s("alice"),
            amount: Amount::new(1_000),
            record_type: RecordType::Payment,
            score_impact: 5,
            data_hash_ref: String::new(),
        },
    );
    request.payload.operation = Operation::AddCreditRecord {
        subject: s("alice"),
        amount: Amount::new(1_000),
        record_type: RecordType::Payment,
        score_impact: 50,
        data_hash_ref: String::new(),
    };
    let err = h.engine.submit(&request, t0()).unwrap_err();
    assert!(matches!(err, EngineError::Auth(AuthError::BadSignature { .. })));
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(h.engine.state().scores().profile(&s("alice")).is_none());
}

#[test]
fn unknown_signer_fails_verification() {
    let mut h = Harness::new();
    let stranger = Ed25519KeyPair::from_seed(&[99u8; 32]);
    let request = RequestPayload::new(
        s("alice"),
        0,
        Operation::AddCreditRecord {
            subject: s("alice"),
            amount: Amount::new(1_000),
            record_type: RecordType::Payment,
            score_impact: 5,
            data_hash_ref: String::new(),
        },
    )
    .sign(s("mallory"), &stranger)
    .unwrap();
    let err = h.engine.submit(&request, t0()).unwrap_err();
    assert!(matches!(err, EngineError::Auth(AuthError::UnknownSigner(_))));
}

#[test]
fn payload_subject_must_match_the_operation() {
    let mut h = Harness::new();
    let err = h
        .submit(
            "bureau",
            "bob",
            Operation::AddCreditRecord {
                subject: s("alice"),
                amount: Amount::new(1_000),
                record_type: RecordType::Payment,
                score_impact: 5,
                data_hash_ref: String::new(),
            },
            t0(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Auth(AuthError::SubjectMismatch { .. })));
}

#[test]
fn missing_role_is_an_authorization_error() {
    let mut h = Harness::new();
    let err = h
        .submit(
            "alice",
            "alice",
            Operation::AddCreditRecord {
                subject: s("alice"),
                amount: Amount::new(1_000),
                record_type: RecordType::Payment,
                score_impact: 50,
                data_hash_ref: String::new(),
            },
            t0(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Auth(AuthError::MissingRole { .. })));
    assert_eq!(h.engine.current_nonce(&s("alice")), 0);
}

#[test]
fn paused_engine_rejects_everything_but_pause_control() {
    let mut h = Harness::new();
    h.submit("admin", "admin", Operation::SetPaused { paused: true }, t0())
        .unwrap();
    assert!(h.engine.is_paused());

    let err = h.add_record("alice", 5, t0()).unwrap_err();
    assert!(matches!(err, EngineError::Auth(AuthError::EmergencyModeActive)));
    let err = h
        .submit(
            "lender",
            "lender",
            Operation::ProvideLiquidity {
                amount: Amount::new(10),
            },
            t0(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Auth(AuthError::EmergencyModeActive)));

    // Non-admins cannot lift it.
    let err = h
        .submit("lender", "lender", Operation::SetPaused { paused: false }, t0())
        .unwrap_err();
    assert!(matches!(err, EngineError::Auth(AuthError::MissingRole { .. })));

    h.submit("admin", "admin", Operation::SetPaused { paused: false }, t0())
        .unwrap();
    h.add_record("alice", 5, t0()).unwrap();
    assert_eq!(h.events_named("pause_changed"), 2);
}

#[test]
fn reads_are_limited_to_subject_and_staff() {
    let mut h = Harness::new();
    h.add_record("alice", 5, t0()).unwrap();
    assert_eq!(h.engine.credit_score(&s("auditor"), &s("alice")).unwrap(), 505);
    let err = h.engine.credit_score(&s("bob"), &s("alice")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let err = h.engine.credit_score(&s("bob"), &s("bob")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ── Compliance quota ─────────────────────────────────────────────────

#[test]
fn daily_quota_resets_at_utc_midnight() {
    let mut config = EngineConfig::default();
    config.compliance.daily_provider_quota = 2;
    let mut h = Harness::with_config(config);
    let morning = Timestamp::parse("2026-01-05T00:30:00Z").unwrap();
    let late = Timestamp::parse("2026-01-05T23:59:59Z").unwrap();
    let midnight = Timestamp::parse("2026-01-06T00:00:00Z").unwrap();

    h.add_record("alice", 1, morning).unwrap();
    h.add_record("bob", 1, morning).unwrap();
    let err = h.add_record("alice", 1, late).unwrap_err();
    assert!(matches!(err, EngineError::Compliance(ComplianceError::QuotaExceeded { .. })));

    h.add_record("alice", 1, midnight).unwrap();
    assert_eq!(h.score("alice"), 502);
}

// ── Disputes ─────────────────────────────────────────────────────────

fn dispute(h: &mut Harness, now: Timestamp) -> Result<Outcome, EngineError> {
    h.submit(
        "alice",
        "alice",
        Operation::DisputeRecord {
            subject: s("alice"),
            record_index: 0,
            reason: "never borrowed from this lender".into(),
        },
        now,
    )
}

#[test]
fn dispute_window_closes_after_ninety_days() {
    let mut h = Harness::new();
    h.add_record("alice", -30, t0()).unwrap();
    let err = dispute(&mut h, t0().plus_days(91)).unwrap_err();
    assert!(matches!(err, EngineError::Dispute(DisputeError::WindowClosed { .. })));
    assert_eq!(err.kind(), ErrorKind::Temporal);

    dispute(&mut h, t0().plus_days(90)).unwrap();
}

#[test]
fn upheld_dispute_posts_compensating_adjustment() {
    let mut h = Harness::new();
    h.add_record("alice", -30, t0()).unwrap();
    let opened = match dispute(&mut h, t0().plus_days(1)).unwrap() {
        Outcome::DisputeOpened(d) => d,
        other => panic!("unexpected outcome {other:?}"),
    };

    let err = h
        .submit(
            "bob",
            "alice",
            Operation::ResolveDispute {
                dispute_id: opened.id,
                upheld: true,
                resolution: "verified".into(),
            },
            t0().plus_days(2),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    h.submit(
        "officer",
        "alice",
        Operation::ResolveDispute {
            dispute_id: opened.id,
            upheld: true,
            resolution: "provider could not substantiate".into(),
        },
        t0().plus_days(2),
    )
    .unwrap();
    assert_eq!(h.score("alice"), 500);

    let history = h
        .engine
        .credit_history(&s("alice"), &s("alice"), false, t0().plus_days(2))
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].score_impact, -30);
    assert!(history[0].disputed);
    assert_eq!(history[1].record_type, RecordType::Adjustment);
    assert_eq!(history[1].score_impact, 30);

    let err = h
        .submit(
            "officer",
            "alice",
            Operation::ResolveDispute {
                dispute_id: opened.id,
                upheld: false,
                resolution: "again".into(),
            },
            t0().plus_days(3),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Dispute(DisputeError::AlreadyResolved(_))));
}

// ── Loan lifecycle ───────────────────────────────────────────────────

#[test]
fn compliance_check_verifies_profile_kyc() {
    let mut h = Harness::new();
    h.approved_loan(false);
    let profile = h.engine.state().scores().profile(&s("alice")).unwrap();
    assert_eq!(profile.kyc_status, KycStatus::Verified);
    assert_eq!(h.events_named("kyc_status_changed"), 1);
}

#[test]
fn funding_twice_is_a_state_error() {
    let mut h = Harness::new();
    let id = h.funded_loan(false);
    assert_eq!(h.loan_status(id), LoanStatus::Active);
    // 505 + 5 for funding.
    assert_eq!(h.score("alice"), 510);

    let err = h
        .submit("lender", "alice", Operation::FundLoan { loan_id: id }, t0())
        .unwrap_err();
    assert!(matches!(err, EngineError::Lending(LendingError::InvalidTransition { .. })));
    assert_eq!(err.kind(), ErrorKind::State);

    let pool = h.engine.state().pool();
    assert_eq!(pool.treasury(), Amount::new(1_000));
    assert_eq!(pool.reserve(), Amount::new(900_000));
}

#[test]
fn cancelling_an_approved_loan_returns_collateral() {
    let mut h = Harness::new();
    let id = h.approved_loan(false);
    assert_eq!(h.engine.state().pool().escrowed_collateral(), Amount::new(20_000));

    h.submit(
        "alice",
        "alice",
        Operation::CancelLoan {
            loan_id: id,
            reason: "changed my mind".into(),
        },
        t0(),
    )
    .unwrap();
    assert_eq!(h.loan_status(id), LoanStatus::Cancelled);
    assert_eq!(h.events_named("collateral_released"), 1);
    assert_eq!(h.engine.state().pool().escrowed_collateral(), Amount::ZERO);

    let err = h
        .submit("lender", "alice", Operation::FundLoan { loan_id: id }, t0())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn payment_below_fees_goes_entirely_to_fees() {
    let mut h = Harness::new();
    let id = h.funded_loan(false);
    let late = t0().plus_days(31);
    match h.pay(id, 40, late).unwrap() {
        Outcome::PaymentMade(paid) => {
            assert!(paid.breakdown.late);
            assert_eq!(paid.payment.fees_portion, Amount::new(40));
            assert_eq!(paid.payment.interest_portion, Amount::ZERO);
            assert_eq!(paid.payment.principal_portion, Amount::ZERO);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    // Late payment costs 10.
    assert_eq!(h.score("alice"), 500);
}

#[test]
fn on_time_payment_allocates_interest_then_principal() {
    let mut h = Harness::new();
    let id = h.funded_loan(false);
    match h.pay(id, 10_000, t0().plus_days(30)).unwrap() {
        Outcome::PaymentMade(paid) => {
            // 100_000 × 1200 × 30 / 3_650_000
            assert_eq!(paid.payment.interest_portion, Amount::new(986));
            assert_eq!(paid.payment.principal_portion, Amount::new(9_014));
            assert!(!paid.repaid);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(h.score("alice"), 512);
}

#[test]
fn double_scaled_interest_truncates_to_zero() {
    let mut config = EngineConfig::default();
    config.lending.interest_scaling = InterestScaling::DoubleScale;
    let mut h = Harness::with_config(config);
    let id = h.funded_loan(false);
    match h.pay(id, 10_000, t0().plus_days(30)).unwrap() {
        Outcome::PaymentMade(paid) => {
            assert_eq!(paid.payment.interest_portion, Amount::ZERO);
            assert_eq!(paid.payment.principal_portion, Amount::new(10_000));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn early_payoff_is_refused_without_prepayment() {
    let mut h = Harness::new();
    let id = h.funded_loan(false);
    let err = h.pay(id, 200_000, t0().plus_days(30)).unwrap_err();
    assert!(matches!(err, EngineError::Lending(LendingError::PrepaymentNotAllowed { .. })));
    assert_eq!(h.loan_status(id), LoanStatus::Active);
}

#[test]
fn full_repayment_releases_collateral_once() {
    let mut h = Harness::new();
    let id = h.funded_loan(true);
    let now = t0().plus_days(30);
    match h.pay(id, 200_000, now).unwrap() {
        Outcome::PaymentMade(paid) => {
            assert!(paid.repaid);
            assert_eq!(paid.collateral_released, Some(Amount::new(20_000)));
            assert_eq!(paid.payment.principal_portion, Amount::new(100_000));
            assert_eq!(paid.breakdown.unapplied, Amount::new(99_014));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(h.loan_status(id), LoanStatus::Repaid);
    assert_eq!(h.events_named("loan_repaid"), 1);
    assert_eq!(h.events_named("collateral_released"), 1);
    assert_eq!(h.engine.state().pool().escrowed_collateral(), Amount::ZERO);
    // 505 + 5 funded + 20 repaid.
    assert_eq!(h.score("alice"), 530);

    let err = h.pay(id, 1, now).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(h.events_named("collateral_released"), 1);
}

#[test]
fn default_is_allowed_from_the_grace_boundary() {
    let mut h = Harness::new();
    let id = h.funded_loan(false);
    // First payment due at day 30, grace of 30 days.
    let boundary = t0().plus_days(60);

    let err = h
        .submit(
            "lender",
            "alice",
            Operation::MarkLoanAsDefaulted { loan_id: id },
            boundary.plus_secs(-1),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Lending(LendingError::DefaultNotYetAllowed { .. })));
    assert_eq!(err.kind(), ErrorKind::Temporal);

    match h
        .submit("lender", "alice", Operation::MarkLoanAsDefaulted { loan_id: id }, boundary)
        .unwrap()
    {
        Outcome::LoanDefaulted(d) => assert_eq!(d.outstanding, Amount::new(100_000)),
        other => panic!("unexpected outcome {other:?}"),
    }
    // 510 after funding, -50 on default.
    assert_eq!(h.score("alice"), 460);
}

#[test]
fn liquidation_seizes_collateral_and_reports_loss() {
    let mut h = Harness::new();
    let id = h.funded_loan(false);
    h.submit(
        "lender",
        "alice",
        Operation::MarkLoanAsDefaulted { loan_id: id },
        t0().plus_days(60),
    )
    .unwrap();

    // Due at day 30, threshold of 90 days: strictly after day 120.
    let threshold = t0().plus_days(120);
    let err = h
        .submit("lender", "alice", Operation::LiquidateLoan { loan_id: id }, threshold)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Temporal);

    match h
        .submit(
            "lender",
            "alice",
            Operation::LiquidateLoan { loan_id: id },
            threshold.plus_secs(1),
        )
        .unwrap()
    {
        Outcome::LoanLiquidated(l) => {
            assert_eq!(l.recovered, Amount::new(20_000));
            assert_eq!(l.loss, Amount::new(80_000));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    let pool = h.engine.state().pool();
    assert_eq!(pool.escrowed_collateral(), Amount::ZERO);
    assert_eq!(pool.treasury(), Amount::new(21_000));
    assert_eq!(h.loan_status(id), LoanStatus::Liquidated);
}

#[test]
fn only_the_borrower_deposits_collateral() {
    let mut h = Harness::new();
    let id = h.approved_loan(false);
    let err = h
        .submit(
            "bob",
            "alice",
            Operation::DepositCollateral {
                loan_id: id,
                amount: Amount::new(5),
                token_ref: "TOKEN-A".into(),
            },
            t0(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Lending(LendingError::NotBorrower { .. })));
}

// ── Events and reports ───────────────────────────────────────────────

#[test]
fn events_are_gapless_and_only_follow_success() {
    let mut h = Harness::new();
    let id = h.funded_loan(false);
    let before = h.event_count();
    h.pay(id, 0, t0().plus_days(1)).unwrap_err();
    assert_eq!(h.event_count(), before);

    let events = h.engine.sink().events();
    for (i, envelope) in events.iter().enumerate() {
        assert_eq!(envelope.sequence, i as u64);
    }
    assert_eq!(h.engine.state().next_event_sequence(), events.len() as u64);
    assert!(events
        .iter()
        .any(|e| matches!(e.event, DomainEvent::LoanFunded { loan_id, .. } if loan_id == id)));
}

fn generous(_: &CreditProfile, _: &[&CreditRecord]) -> Option<u16> {
    Some(900)
}

fn modest(_: &CreditProfile, history: &[&CreditRecord]) -> Option<u16> {
    Some(600 + history.len() as u16)
}

#[test]
fn credit_report_includes_advisory_score_in_range() {
    let mut h = Harness::new();
    h.add_record("alice", 5, t0()).unwrap();
    let report = h.engine.credit_report(&s("alice"), &s("alice"), t0()).unwrap();
    assert_eq!(report.score, 505);
    assert_eq!(report.advisory_score, None);

    let engine = h.engine.with_advisory_scorer(modest);
    let report = engine.credit_report(&s("auditor"), &s("alice"), t0()).unwrap();
    assert_eq!(report.advisory_score, Some(601));
    assert_eq!(report.record_count, 1);

    let engine = CreditEngine::from_state(
        engine.into_state(),
        InMemoryDirectory::new(),
        Outbox::new(),
    )
    .with_advisory_scorer(generous);
    // Fresh directory: only the subject may read.
    let report = engine.credit_report(&s("alice"), &s("alice"), t0()).unwrap();
    assert_eq!(report.advisory_score, None);
}

#[test]
fn state_round_trips_through_a_snapshot() {
    let mut h = Harness::new();
    h.funded_loan(false);
    let json = serde_json::to_string(h.engine.state()).unwrap();
    let restored: credence_engine::EngineState = serde_json::from_str(&json).unwrap();
    assert_eq!(
        restored.verifier().current_nonce(&s("alice")),
        h.engine.current_nonce(&s("alice"))
    );
    assert_eq!(restored.pool().reserve(), h.engine.state().pool().reserve());
    assert_eq!(restored.next_event_sequence(), h.engine.state().next_event_sequence());
}
