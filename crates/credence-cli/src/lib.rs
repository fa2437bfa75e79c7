//! # credence-cli: Operator Command-Line Interface
//!
//! The `credence` binary. Argument parsing lives in `main.rs`; each
//! subcommand's handler lives in its own module and delegates to the
//! library crates.
//!
//! ## Subcommands
//!
//! - `credence keygen`: generate (or re-derive) an Ed25519 signing key.
//! - `credence sign`: sign a request payload for submission.
//! - `credence simulate`: replay a YAML scenario against a fresh engine and
//!   print the resulting domain events as JSON lines.
//!
//! ```bash
//! credence keygen
//! credence sign payload.json --signer bureau --seed 0101...01
//! credence --config engine.yaml simulate scenarios/loan_lifecycle.yaml
//! ```

pub mod keys;
pub mod signing;
pub mod simulate;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a file, or standard input when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading standard input")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
