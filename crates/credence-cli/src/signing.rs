//! # Sign Subcommand
//!
//! Wraps an operation in a request payload and signs it. The payload file
//! names the subject, nonce and operation; the request domain is filled in.
//!
//! ```json
//! {"subject": "alice", "nonce": 0,
//!  "operation": {"op": "make_payment", "loan_id": 0, "amount": 1500}}
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use credence_auth::RequestPayload;
use credence_core::SubjectId;
use credence_crypto::Ed25519KeyPair;
use credence_engine::{EngineRequest, Operation};
use serde::Deserialize;

/// Arguments for `credence sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// JSON payload file, or `-` for standard input.
    pub payload: PathBuf,

    /// Subject id of the signer.
    #[arg(long)]
    pub signer: String,

    /// Signer's 64-character hex seed.
    #[arg(long)]
    pub seed: String,
}

/// The operator-supplied part of a request payload.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PayloadInput {
    pub subject: SubjectId,
    pub nonce: u64,
    pub operation: Operation,
}

/// Parse `json` and sign it as `signer`.
pub fn sign_payload(json: &str, signer: &str, seed: &str) -> Result<EngineRequest> {
    let input: PayloadInput = serde_json::from_str(json).context("parsing request payload")?;
    let key = Ed25519KeyPair::from_seed_hex(seed).context("invalid seed")?;
    let signer = SubjectId::new(signer).context("invalid signer id")?;
    let request = RequestPayload::new(input.subject, input.nonce, input.operation)
        .sign(signer, &key)
        .context("signing request")?;
    Ok(request)
}

/// Execute `credence sign`.
pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let json = crate::read_input(&args.payload)?;
    let request = sign_payload(&json, &args.signer, &args.seed)?;
    tracing::info!(
        signer = %request.signer,
        subject = %request.payload.subject,
        nonce = request.payload.nonce,
        operation = request.payload.operation.name(),
        "request signed"
    );
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(0)
}
