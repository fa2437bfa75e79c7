//! # Simulate Subcommand
//!
//! Replays a YAML scenario against a fresh in-memory engine. A scenario
//! declares identities (subject, hex seed, roles) and a list of steps.
//! A step is either a pre-signed request or an operation plus signer, in
//! which case the request is built and signed here with the signer's seed
//! and current nonce.
//!
//! ```yaml
//! identities:
//!   - subject: bureau
//!     seed: "0101010101010101010101010101010101010101010101010101010101010101"
//!     roles: [data_provider]
//! steps:
//!   - at: "2026-01-05T09:00:00Z"
//!     signer: bureau
//!     operation: {op: add_credit_record, subject: alice, amount: 1000,
//!                 record_type: PAYMENT, score_impact: 5}
//!   - at: "2026-01-05T09:05:00Z"
//!     signer: bureau
//!     operation: {op: add_credit_record, subject: alice, amount: 1000,
//!                 record_type: PAYMENT, score_impact: 51}
//!     expect_error: validation
//! ```
//!
//! Every committed event is printed to standard output as one JSON line.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use credence_auth::{InMemoryDirectory, RequestPayload, Role};
use credence_core::{ErrorKind, SubjectId, Timestamp};
use credence_crypto::Ed25519KeyPair;
use credence_engine::{
    CreditEngine, EngineConfig, EngineError, EngineRequest, EventEnvelope, Operation, Outbox,
    TracingSink,
};
use serde::Deserialize;

/// Arguments for `credence simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML), or `-` for standard input.
    pub scenario: PathBuf,

    /// Stop at the first step whose result differs from its expectation.
    #[arg(long)]
    pub fail_fast: bool,
}

/// A replayable scenario.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub identities: Vec<Identity>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// An identity registered in the scenario's directory.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Identity {
    pub subject: SubjectId,
    /// 64-character hex seed.
    pub seed: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// One request in a scenario.
#[derive(Debug, Deserialize)]
pub struct Step {
    /// Logical time the request is submitted at.
    pub at: Timestamp,
    #[serde(flatten)]
    pub action: StepAction,
    /// Error kind the step should fail with. Absent means it should succeed.
    #[serde(default)]
    pub expect_error: Option<ErrorKind>,
}

/// What a step submits.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StepAction {
    /// A request signed elsewhere, submitted verbatim.
    Signed { request: EngineRequest },
    /// An operation to sign here as `signer`.
    Unsigned { signer: SubjectId, operation: Operation },
}

/// How one step went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub index: usize,
    pub operation: &'static str,
    /// `None` if accepted, else the error kind.
    pub error: Option<ErrorKind>,
    pub as_expected: bool,
}

/// Everything a replay produced.
#[derive(Debug, Default)]
pub struct SimulationReport {
    pub steps: Vec<StepReport>,
    pub events: Vec<EventEnvelope>,
}

impl SimulationReport {
    /// Steps whose result differed from the expectation.
    pub fn mismatches(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.as_expected)
    }
}

type SimEngine = CreditEngine<InMemoryDirectory, (Outbox, TracingSink)>;

/// Parse a scenario document.
pub fn parse_scenario(yaml: &str) -> Result<Scenario> {
    serde_yaml::from_str(yaml).context("parsing scenario")
}

/// Replay `scenario` against a fresh engine built from `config`.
pub fn run_scenario(scenario: &Scenario, config: EngineConfig, fail_fast: bool) -> Result<SimulationReport> {
    let mut directory = InMemoryDirectory::new();
    let mut keys = HashMap::new();
    for identity in &scenario.identities {
        let key = Ed25519KeyPair::from_seed_hex(&identity.seed)
            .with_context(|| format!("invalid seed for {}", identity.subject))?;
        directory.register(
            identity.subject.clone(),
            key.public_key(),
            identity.roles.iter().copied(),
        );
        keys.insert(identity.subject.clone(), key);
    }
    let mut engine: SimEngine = CreditEngine::new(config, directory, (Outbox::new(), TracingSink))?;

    let mut report = SimulationReport::default();
    for (index, step) in scenario.steps.iter().enumerate() {
        let (operation, result) = match &step.action {
            StepAction::Signed { request } => (
                request.payload.operation.name(),
                engine.submit(request, step.at).map(|_| ()),
            ),
            StepAction::Unsigned { signer, operation } => {
                let key = keys
                    .get(signer)
                    .with_context(|| format!("step {index}: no seed declared for {signer}"))?;
                (operation.name(), sign_and_submit(&mut engine, signer, key, operation, step.at))
            }
        };
        let error = result.err().map(|e| e.kind());
        let as_expected = error == step.expect_error;
        if !as_expected {
            tracing::warn!(
                step = index,
                operation,
                expected = ?step.expect_error,
                actual = ?error,
                "step did not go as expected"
            );
        }
        report.steps.push(StepReport {
            index,
            operation,
            error,
            as_expected,
        });
        report.events.extend(engine.sink_mut().0.drain());
        if fail_fast && !as_expected {
            break;
        }
    }
    Ok(report)
}

fn sign_and_submit(
    engine: &mut SimEngine,
    signer: &SubjectId,
    key: &Ed25519KeyPair,
    operation: &Operation,
    at: Timestamp,
) -> Result<(), EngineError> {
    let subject = engine.request_subject(operation, signer)?;
    let nonce = engine.current_nonce(&subject);
    let request = RequestPayload::new(subject, nonce, operation.clone()).sign(signer.clone(), key)?;
    engine.submit(&request, at).map(|_| ())
}

/// Execute `credence simulate`.
pub fn run_simulate(args: &SimulateArgs, config_path: Option<&Path>) -> Result<u8> {
    let config = EngineConfig::load(config_path)?;
    let scenario = parse_scenario(&crate::read_input(&args.scenario)?)?;
    let report = run_scenario(&scenario, config, args.fail_fast)?;

    for envelope in &report.events {
        println!("{}", serde_json::to_string(envelope)?);
    }
    let failed = report.mismatches().count();
    tracing::info!(
        steps = report.steps.len(),
        events = report.events.len(),
        failed,
        "scenario replayed"
    );
    if failed > 0 {
        bail!("{failed} of {} steps did not go as expected", report.steps.len());
    }
    Ok(0)
}
