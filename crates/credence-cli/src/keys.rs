//! # Keygen Subcommand
//!
//! Ed25519 key generation for operators and test identities.

use anyhow::{Context, Result};
use clap::Args;
use credence_crypto::Ed25519KeyPair;
use serde::Serialize;

/// Arguments for `credence keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Re-derive the public key from an existing 64-character hex seed
    /// instead of generating a fresh key.
    #[arg(long)]
    pub seed: Option<String>,
}

/// A seed and its public key, both hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyMaterial {
    pub seed: String,
    pub public_key: String,
}

/// Generate a key, or derive one from `seed`.
pub fn key_material(seed: Option<&str>) -> Result<KeyMaterial> {
    let pair = match seed {
        Some(hex) => Ed25519KeyPair::from_seed_hex(hex).context("invalid seed")?,
        None => Ed25519KeyPair::generate(),
    };
    Ok(KeyMaterial {
        seed: pair.seed_hex(),
        public_key: pair.public_key().to_hex(),
    })
}

/// Execute `credence keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let material = key_material(args.seed.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&material)?);
    tracing::debug!(public_key = %material.public_key, "key material emitted");
    Ok(0)
}
