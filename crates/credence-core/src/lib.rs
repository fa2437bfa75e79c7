//! # credence-core: Foundational Types
//!
//! The leaf of the Credence crate graph. Every other crate depends on
//! `credence-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `SubjectId`, `RecordId`,
//!    `LoanId`, `Amount`, `Bps`: no bare integers or strings crossing
//!    component boundaries.
//!
//! 2. **`CanonicalBytes` newtype.** Everything that is signed or digested
//!    flows through `CanonicalBytes::new()` (RFC 8785 JCS, floats rejected).
//!
//! 3. **Logical time only.** `Timestamp` is UTC with seconds precision and is
//!    always supplied by the caller. Deadlines (grace period, dispute window,
//!    decay period) are comparisons between timestamps, never timers.
//!
//! 4. **One error taxonomy.** [`ErrorKind`] is the seven-way classification
//!    every component error maps onto.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `credence-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use amount::{Amount, Bps, BPS_DENOMINATOR};
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, CoreError, ErrorKind};
pub use identity::{ApplicationId, DisputeId, EventId, LoanId, RecordId, SubjectId};
pub use temporal::{Timestamp, SECONDS_PER_DAY};
