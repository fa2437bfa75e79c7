//! # credence-compliance: Compliance Gate
//!
//! Sits between access control and the business components. It answers
//! three questions about a provider-initiated mutation:
//!
//! - **Blocking**: is the target profile frozen, and has the provider used
//!   up today's quota? Either stops the request.
//! - **Advisory**: is the amount unusually large, or is the subject seeing
//!   an unusual burst of records? These never block. They are appended to
//!   the [`ViolationLog`] and stamped on the record.
//!
//! Admission is a pure check. Quota usage and violations are recorded only
//! through [`ComplianceGate::commit`] once the mutation has gone through, so
//! a request rejected downstream consumes nothing.

pub mod config;
pub mod error;
pub mod gate;
pub mod violation;

pub use config::ComplianceConfig;
pub use error::ComplianceError;
pub use gate::{Admission, ComplianceGate, DailyQuota};
pub use violation::{ComplianceViolation, ViolationKind, ViolationLog};
