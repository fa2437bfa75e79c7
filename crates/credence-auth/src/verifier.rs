//! # Authorization Verifier
//!
//! Replay protection for signed requests.
//!
//! ## Protocol
//!
//! A client builds a [`RequestPayload`] `{ domain, subject, nonce, operation }`,
//! canonicalizes it (RFC 8785), and signs the canonical bytes with its
//! Ed25519 key. The engine:
//!
//! 1. checks the domain tag,
//! 2. re-canonicalizes the decoded payload and computes its
//!    domain-separated digest,
//! 3. verifies the signature under the claimed signer's registered key,
//! 4. checks `nonce == current(subject)`.
//!
//! Verification is read-only. It returns a [`NonceReservation`]; the
//! counter advances only when the engine commits that reservation after the
//! downstream mutation has succeeded. A (payload, nonce) pair therefore
//! takes effect at most once, and a request that fails anywhere leaves the
//! counter untouched.

use std::collections::BTreeMap;

use credence_core::{CanonicalBytes, ContentDigest, SubjectId};
use credence_crypto::{domain_digest, verify_with_public_key, Ed25519KeyPair, Ed25519Signature};
use serde::{Deserialize, Serialize};

use crate::directory::IdentityDirectory;
use crate::error::AuthError;

/// Domain tag every request payload is bound to.
pub const REQUEST_DOMAIN: &str = "credence.request.v1";

/// The signed portion of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload<Op> {
    /// Protocol domain tag; must equal [`REQUEST_DOMAIN`].
    pub domain: String,
    /// Subject whose nonce counter this request consumes.
    pub subject: SubjectId,
    /// Declared nonce; must equal the subject's current counter.
    pub nonce: u64,
    /// The operation being requested.
    pub operation: Op,
}

impl<Op: Serialize> RequestPayload<Op> {
    /// A payload in the current request domain.
    pub fn new(subject: SubjectId, nonce: u64, operation: Op) -> Self {
        Self {
            domain: REQUEST_DOMAIN.to_string(),
            subject,
            nonce,
            operation,
        }
    }

    /// Canonical bytes of this payload, the exact bytes that get signed.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, AuthError> {
        Ok(CanonicalBytes::new(self)?)
    }

    /// Domain-separated digest identifying this payload.
    pub fn digest(&self) -> Result<ContentDigest, AuthError> {
        Ok(domain_digest(&self.domain, &self.canonical_bytes()?))
    }

    /// Sign this payload as `signer`.
    pub fn sign(
        self,
        signer: SubjectId,
        key: &Ed25519KeyPair,
    ) -> Result<SignedRequest<Op>, AuthError> {
        let signature = key.sign(&self.canonical_bytes()?);
        Ok(SignedRequest {
            payload: self,
            signer,
            signature,
        })
    }
}

/// A payload together with its claimed signer and signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedRequest<Op> {
    /// The signed payload.
    pub payload: RequestPayload<Op>,
    /// The identity claiming to have signed it.
    pub signer: SubjectId,
    /// Ed25519 signature over the payload's canonical bytes.
    pub signature: Ed25519Signature,
}

/// Proof that a request verified, redeemable exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a reservation does nothing until committed"]
pub struct NonceReservation {
    subject: SubjectId,
    nonce: u64,
    digest: ContentDigest,
}

impl NonceReservation {
    /// Subject whose counter is reserved.
    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    /// Reserved nonce.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Domain-separated digest of the verified payload.
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }
}

/// Per-subject nonce ledger and signature checker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationVerifier {
    nonces: BTreeMap<SubjectId, u64>,
}

impl AuthorizationVerifier {
    /// A verifier with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next nonce `subject` must use.
    pub fn current_nonce(&self, subject: &SubjectId) -> u64 {
        self.nonces.get(subject).copied().unwrap_or(0)
    }

    /// Verify `request` without mutating any state.
    pub fn verify<Op: Serialize>(
        &self,
        request: &SignedRequest<Op>,
        directory: &impl IdentityDirectory,
    ) -> Result<NonceReservation, AuthError> {
        let payload = &request.payload;
        if payload.domain != REQUEST_DOMAIN {
            return Err(AuthError::DomainMismatch {
                expected: REQUEST_DOMAIN.to_string(),
                actual: payload.domain.clone(),
            });
        }

        let canonical = payload.canonical_bytes()?;
        let digest = domain_digest(&payload.domain, &canonical);

        let key = directory
            .public_key(&request.signer)
            .ok_or_else(|| AuthError::UnknownSigner(request.signer.clone()))?;
        verify_with_public_key(&canonical, &request.signature, &key).map_err(|source| {
            AuthError::BadSignature {
                signer: request.signer.clone(),
                source,
            }
        })?;

        let current = self.current_nonce(&payload.subject);
        if payload.nonce < current {
            return Err(AuthError::NonceReused {
                subject: payload.subject.clone(),
                declared: payload.nonce,
                current,
            });
        }
        if payload.nonce > current {
            return Err(AuthError::NonceMismatch {
                subject: payload.subject.clone(),
                declared: payload.nonce,
                expected: current,
            });
        }

        tracing::debug!(
            subject = %payload.subject,
            signer = %request.signer,
            nonce = payload.nonce,
            digest = %digest,
            "request signature verified"
        );
        Ok(NonceReservation {
            subject: payload.subject.clone(),
            nonce: payload.nonce,
            digest,
        })
    }

    /// Consume a reservation, advancing the subject's counter by one.
    pub fn commit(&mut self, reservation: NonceReservation) -> Result<(), AuthError> {
        let current = self.current_nonce(&reservation.subject);
        if current != reservation.nonce {
            return Err(AuthError::StaleReservation {
                subject: reservation.subject,
                reserved: reservation.nonce,
                current,
            });
        }
        self.nonces
            .insert(reservation.subject, current.saturating_add(1));
        Ok(())
    }
}
