//! Boundary to an external predictive scoring model. Its output is shown
//! next to the engine's own score in credit reports and never feeds back
//! into any decision.

use credence_score::{CreditProfile, CreditRecord};

/// Supplies an advisory score for a profile.
pub trait AdvisoryScorer {
    /// A score in `[300, 850]`, or `None` if the model has no opinion.
    /// Values outside the range are discarded by the engine.
    fn advisory_score(&self, profile: &CreditProfile, history: &[&CreditRecord]) -> Option<u16>;
}

impl<F> AdvisoryScorer for F
where
    F: Fn(&CreditProfile, &[&CreditRecord]) -> Option<u16>,
{
    fn advisory_score(&self, profile: &CreditProfile, history: &[&CreditRecord]) -> Option<u16> {
        self(profile, history)
    }
}
