//! # credence-score: Credit Profiles and Disputes
//!
//! [`ScoreEngine`] owns every credit profile and the record arena. Scores
//! stay in `[300, 850]`, decay upward toward 500 after a year of
//! inactivity, and map to a risk level from 1 (best) to 5.
//!
//! [`DisputeManager`] lets a subject contest one of their records within
//! 90 days. An upheld dispute posts a compensating adjustment; the original
//! record is never rewritten.

pub mod config;
pub mod dispute;
pub mod engine;
pub mod error;
pub mod profile;
pub mod record;

pub use config::ScoreConfig;
pub use dispute::{Dispute, DisputeManager, DisputeResolution};
pub use engine::{ScoreEngine, ScoreUpdate, REPAYMENT_BONUS};
pub use error::{DisputeError, ScoreError};
pub use profile::{
    risk_level_for, CreditProfile, KycStatus, INITIAL_RISK_LEVEL, INITIAL_SCORE, MAX_IMPACT,
    MAX_SCORE, MIN_SCORE,
};
pub use record::{CreditRecord, NewRecord, RecordType};
