//! # credence-auth: Request Authorization
//!
//! The first two stages of every mutating call:
//!
//! 1. [`AuthorizationVerifier`] re-derives the canonical payload, verifies
//!    the Ed25519 signature under the claimed signer's registered key, and
//!    checks the declared nonce against the subject's counter. Success
//!    yields a [`NonceReservation`] that the caller commits once the
//!    downstream mutation has succeeded.
//! 2. [`AccessControl`] checks the caller's role set against the operation's
//!    requirement and enforces the emergency pause.
//!
//! Identity, roles and key material come from the external identity
//! collaborator through the [`IdentityDirectory`] trait.

pub mod access;
pub mod directory;
pub mod error;
pub mod verifier;

pub use access::{AccessControl, Requirement, Role, RoleSet, READ_ROLES};
pub use directory::{IdentityDirectory, InMemoryDirectory};
pub use error::AuthError;
pub use verifier::{
    AuthorizationVerifier, NonceReservation, RequestPayload, SignedRequest, REQUEST_DOMAIN,
};
