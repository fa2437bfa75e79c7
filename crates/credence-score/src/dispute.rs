//! # Record Disputes
//!
//! A subject may dispute one of their own records within the dispute
//! window (90 days by default, inclusive of the last instant). Each dispute
//! is resolved exactly once. Upholding it posts an `ADJUSTMENT` record with
//! the negated original impact; the disputed record itself keeps its
//! impact and its `disputed` flag.

use std::collections::BTreeMap;

use credence_core::{DisputeId, RecordId, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::engine::{ScoreEngine, ScoreUpdate};
use crate::error::DisputeError;
use crate::record::RecordType;

/// A dispute against a single credit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Engine-issued identifier.
    pub id: DisputeId,
    /// Subject of the disputed record.
    pub subject: SubjectId,
    /// Position of the record in the subject's history.
    pub record_index: usize,
    /// Arena key of the record.
    pub record_id: RecordId,
    /// Who raised it (always the subject).
    pub disputer: SubjectId,
    /// Why.
    pub reason: String,
    /// When it was raised.
    pub timestamp: Timestamp,
    /// Whether it has been resolved.
    pub resolved: bool,
    /// Outcome, once resolved.
    pub upheld: Option<bool>,
    /// Resolution notes.
    pub resolution: Option<String>,
    /// Officer who resolved it.
    pub resolver: Option<SubjectId>,
    /// When it was resolved.
    pub resolved_at: Option<Timestamp>,
}

/// Outcome of resolving a dispute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeResolution {
    /// The dispute after resolution.
    pub dispute: Dispute,
    /// The compensating score update, if the dispute was upheld.
    pub reversal: Option<ScoreUpdate>,
}

/// Dispute store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisputeManager {
    disputes: BTreeMap<DisputeId, Dispute>,
    next_id: DisputeId,
}

impl DisputeManager {
    /// An empty dispute store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispute by id.
    pub fn dispute(&self, id: DisputeId) -> Option<&Dispute> {
        self.disputes.get(&id)
    }

    /// Every dispute raised by or about `subject`.
    pub fn disputes_for<'a>(&'a self, subject: &'a SubjectId) -> impl Iterator<Item = &'a Dispute> + 'a {
        self.disputes.values().filter(move |d| &d.subject == subject)
    }

    /// Open a dispute against the record at `index` in `subject`'s history.
    pub fn open(
        &mut self,
        scores: &mut ScoreEngine,
        caller: &SubjectId,
        subject: &SubjectId,
        index: usize,
        reason: &str,
        now: Timestamp,
    ) -> Result<&Dispute, DisputeError> {
        if caller != subject {
            return Err(DisputeError::NotRecordSubject {
                caller: caller.clone(),
                subject: subject.clone(),
            });
        }
        if reason.trim().is_empty() {
            return Err(DisputeError::EmptyReason);
        }
        let record = scores.record(subject, index)?;
        let record_id = record.id;
        if record.disputed {
            return Err(DisputeError::AlreadyDisputed(record_id));
        }
        let deadline = record
            .timestamp
            .plus_days(scores.config().dispute_window_days);
        if now > deadline {
            return Err(DisputeError::WindowClosed {
                record: record_id,
                deadline,
                now,
            });
        }

        scores.mark_disputed(subject, index)?;
        let id = self.next_id;
        self.next_id = id.next();
        tracing::info!(dispute = %id, record = %record_id, subject = %subject, "dispute raised");
        Ok(self.disputes.entry(id).or_insert(Dispute {
            id,
            subject: subject.clone(),
            record_index: index,
            record_id,
            disputer: caller.clone(),
            reason: reason.to_string(),
            timestamp: now,
            resolved: false,
            upheld: None,
            resolution: None,
            resolver: None,
            resolved_at: None,
        }))
    }

    /// Resolve a dispute. If `upheld`, post the compensating adjustment.
    pub fn resolve(
        &mut self,
        scores: &mut ScoreEngine,
        id: DisputeId,
        upheld: bool,
        resolution: &str,
        resolver: &SubjectId,
        now: Timestamp,
    ) -> Result<DisputeResolution, DisputeError> {
        let dispute = self.disputes.get(&id).ok_or(DisputeError::NotFound(id))?;
        if dispute.resolved {
            return Err(DisputeError::AlreadyResolved(id));
        }

        let reversal = if upheld {
            let original = scores.record(&dispute.subject, dispute.record_index)?;
            let negated = -original.score_impact;
            let amount = original.amount;
            let subject = dispute.subject.clone();
            let record_id = dispute.record_id;
            Some(scores.post_system_record(
                &subject,
                resolver,
                RecordType::Adjustment,
                amount,
                negated,
                format!("{id} upheld: reversal of {record_id}"),
                now,
            )?)
        } else {
            None
        };

        let dispute = self.disputes.get_mut(&id).ok_or(DisputeError::NotFound(id))?;
        dispute.resolved = true;
        dispute.upheld = Some(upheld);
        dispute.resolution = Some(resolution.to_string());
        dispute.resolver = Some(resolver.clone());
        dispute.resolved_at = Some(now);
        tracing::info!(dispute = %id, upheld, resolver = %resolver, "dispute resolved");

        Ok(DisputeResolution {
            dispute: dispute.clone(),
            reversal,
        })
    }
}
