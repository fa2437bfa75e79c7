//! # credence-engine: Engine Facade
//!
//! [`CreditEngine`] is the single entry point hosts talk to. It owns the
//! state of every component and runs each signed [`EngineRequest`] through
//! the same pipeline:
//!
//! ```text
//!  SignedRequest<Operation>
//!        │
//!        ▼
//!  AuthorizationVerifier ── signature, nonce ──► NonceReservation
//!        │
//!        ▼
//!  AccessControl ── role requirement, pause
//!        │
//!        ▼
//!  ComplianceGate ── freeze, quota, advisory flags   (provider operations)
//!        │
//!        ▼
//!  ScoreEngine / DisputeManager / ApplicationBook /
//!  UnderwritingEngine / LoanRegistry / LendingPool
//!        │
//!        ▼
//!  commit nonce ──► EventSink
//! ```
//!
//! Identity and key material come from an [`IdentityDirectory`]. Domain
//! events go to an [`EventSink`]. Both are injected by the host, as is an
//! optional [`AdvisoryScorer`].
//!
//! ## Crate Policy
//!
//! - Time is always supplied by the caller; the engine never reads a clock.
//! - A rejected request changes nothing and publishes nothing.
//!
//! [`IdentityDirectory`]: credence_auth::IdentityDirectory

pub mod advisory;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod request;

pub use advisory::AdvisoryScorer;
pub use config::{EngineConfig, CONFIG_ENV};
pub use engine::{CallContext, CreditEngine, CreditReport, EngineState};
pub use error::{ConfigError, EngineError};
pub use event::{DomainEvent, EventEnvelope, EventSink, Outbox, TracingSink};
pub use request::{EngineRequest, Operation, Outcome};
