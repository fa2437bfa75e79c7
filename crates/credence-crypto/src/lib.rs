//! # credence-crypto: Cryptographic Primitives
//!
//! - **Ed25519** signing and verification of request payloads. Signing and
//!   verification accept only `&CanonicalBytes`.
//! - **Domain-separated SHA-256** ([`domain_digest`]) binding a canonical
//!   payload to a protocol tag, so a signature over one message kind can
//!   never be replayed as another.
//!
//! ## Crate Policy
//!
//! - Depends only on `credence-core` internally.
//! - No mocking of cryptographic operations in tests.

pub mod ed25519;
pub mod error;

use credence_core::{CanonicalBytes, ContentDigest, DigestAlgorithm};
use sha2::{Digest, Sha256};

pub use ed25519::{verify, verify_with_public_key, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;

/// SHA-256 over `domain || 0x00 || canonical`.
///
/// The separator byte keeps a domain tag from ever being read as a prefix
/// of the canonical payload.
pub fn domain_digest(domain: &str, canonical: &CanonicalBytes) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}
