//! # Score Engine
//!
//! Owns credit profiles and the record arena. Every update runs the same
//! pipeline:
//!
//! 1. validate the impact (and, for provider records, the amount and the
//!    freeze flag),
//! 2. create the profile at 500 if this is the subject's first record,
//! 3. apply decay if the decay period has elapsed since the last decay:
//!    scores below 500 move up by `(500 - score) / 10`,
//! 4. add the impact and clamp to `[300, 850]`,
//! 5. recompute the risk level,
//! 6. append the record and bump the counters.
//!
//! Validation happens entirely before step 2, so a rejected update leaves
//! the engine untouched.

use std::collections::BTreeMap;

use credence_core::{Amount, RecordId, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::config::ScoreConfig;
use crate::error::ScoreError;
use crate::profile::{
    risk_level_for, CreditProfile, KycStatus, INITIAL_SCORE, MAX_IMPACT, MAX_SCORE, MIN_SCORE,
};
use crate::record::{CreditRecord, NewRecord, RecordType};

/// Impact of the synthetic record posted when a provider marks a record repaid.
pub const REPAYMENT_BONUS: i32 = 10;

/// What a single score update did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    /// Subject whose score changed.
    pub subject: SubjectId,
    /// The record that was appended.
    pub record_id: RecordId,
    /// Position of that record in the subject's history.
    pub record_index: usize,
    /// Score before decay and impact.
    pub old_score: u16,
    /// Score after.
    pub new_score: u16,
    /// Decay added before the impact (zero if none was due).
    pub decay: u16,
    /// Risk level after.
    pub risk_level: u8,
    /// Why the score moved.
    pub reason: String,
    /// Whether this update created the profile.
    pub profile_created: bool,
}

/// Profile store, record arena and per-subject index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreEngine {
    config: ScoreConfig,
    profiles: BTreeMap<SubjectId, CreditProfile>,
    records: Vec<CreditRecord>,
    index: BTreeMap<SubjectId, Vec<RecordId>>,
}

impl ScoreEngine {
    /// An empty engine.
    pub fn new(config: ScoreConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// The subject's profile, if one exists.
    pub fn profile(&self, subject: &SubjectId) -> Option<&CreditProfile> {
        self.profiles.get(subject)
    }

    /// The subject's score.
    pub fn score(&self, subject: &SubjectId) -> Result<u16, ScoreError> {
        self.profiles
            .get(subject)
            .map(|p| p.score)
            .ok_or_else(|| ScoreError::ProfileNotFound(subject.clone()))
    }

    /// The subject's score, or the initial score for an unknown subject.
    pub fn score_or_initial(&self, subject: &SubjectId) -> u16 {
        self.profiles
            .get(subject)
            .map_or(INITIAL_SCORE, |p| p.score)
    }

    /// Whether the subject's profile is frozen. Unknown subjects are not.
    pub fn is_frozen(&self, subject: &SubjectId) -> bool {
        self.profiles.get(subject).is_some_and(|p| p.frozen)
    }

    /// The record at `index` in the subject's history.
    pub fn record(&self, subject: &SubjectId, index: usize) -> Result<&CreditRecord, ScoreError> {
        let id = self.record_id(subject, index)?;
        self.record_by_id(id).ok_or_else(|| ScoreError::RecordNotFound {
            subject: subject.clone(),
            index,
        })
    }

    /// A record by arena key.
    pub fn record_by_id(&self, id: RecordId) -> Option<&CreditRecord> {
        usize::try_from(id.value())
            .ok()
            .and_then(|i| self.records.get(i))
    }

    /// The subject's records in posting order. Expired records are skipped
    /// unless `include_expired`.
    pub fn history(
        &self,
        subject: &SubjectId,
        include_expired: bool,
        now: Timestamp,
    ) -> Vec<&CreditRecord> {
        self.index
            .get(subject)
            .into_iter()
            .flatten()
            .filter_map(|id| self.record_by_id(*id))
            .filter(|r| include_expired || !r.is_expired(now))
            .collect()
    }

    /// Timestamps of every record about the subject.
    pub fn record_timestamps(&self, subject: &SubjectId) -> Vec<Timestamp> {
        self.history_ids(subject)
            .iter()
            .filter_map(|id| self.record_by_id(*id))
            .map(|r| r.timestamp)
            .collect()
    }

    /// Number of profiles.
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    // ── Record posting ─────────────────────────────────────────────────

    /// Post a provider-submitted record.
    pub fn add_record(
        &mut self,
        subject: &SubjectId,
        provider: &SubjectId,
        record: NewRecord,
        compliance_flags: Vec<String>,
        now: Timestamp,
    ) -> Result<ScoreUpdate, ScoreError> {
        validate_impact(record.score_impact)?;
        if record.amount.is_zero() {
            return Err(ScoreError::ZeroAmount);
        }
        if self.is_frozen(subject) {
            return Err(ScoreError::ProfileFrozen(subject.clone()));
        }
        let reason = format!("{} record from {provider}", record.record_type);
        Ok(self.apply(subject, provider, record, compliance_flags, reason, now))
    }

    /// Post an engine-originated record (loan lifecycle, dispute reversal).
    /// Not subject to the freeze, which guards provider data only.
    pub fn post_system_record(
        &mut self,
        subject: &SubjectId,
        source: &SubjectId,
        record_type: RecordType,
        amount: Amount,
        score_impact: i32,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<ScoreUpdate, ScoreError> {
        validate_impact(score_impact)?;
        let record = NewRecord {
            amount,
            record_type,
            score_impact,
            data_hash_ref: String::new(),
        };
        Ok(self.apply(subject, source, record, Vec::new(), reason.into(), now))
    }

    /// The record at `index`, provided it can be marked repaid by `caller`.
    pub fn repayable(
        &self,
        subject: &SubjectId,
        index: usize,
        caller: &SubjectId,
    ) -> Result<&CreditRecord, ScoreError> {
        let existing = self.record(subject, index)?;
        if &existing.provider != caller {
            return Err(ScoreError::NotOriginalProvider {
                record: existing.id,
                provider: existing.provider.clone(),
                caller: caller.clone(),
            });
        }
        if existing.repaid {
            return Err(ScoreError::AlreadyRepaid(existing.id));
        }
        Ok(existing)
    }

    /// Mark the record at `index` repaid and post the repayment bonus.
    pub fn mark_repaid(
        &mut self,
        subject: &SubjectId,
        index: usize,
        caller: &SubjectId,
        now: Timestamp,
    ) -> Result<(RecordId, ScoreUpdate), ScoreError> {
        let existing = self.repayable(subject, index, caller)?;
        let id = existing.id;
        if self.is_frozen(subject) {
            return Err(ScoreError::ProfileFrozen(subject.clone()));
        }
        let amount = existing.amount;

        let update = self.apply(
            subject,
            caller,
            NewRecord {
                amount,
                record_type: RecordType::Repayment,
                score_impact: REPAYMENT_BONUS,
                data_hash_ref: String::new(),
            },
            Vec::new(),
            format!("{id} repaid"),
            now,
        );
        if let Some(r) = self.record_mut(id) {
            r.repaid = true;
            r.repayment_timestamp = Some(now);
        }
        Ok((id, update))
    }

    // ── Profile administration ─────────────────────────────────────────

    /// Block provider-initiated updates.
    pub fn freeze(&mut self, subject: &SubjectId, now: Timestamp) -> Result<(), ScoreError> {
        let profile = self.profile_mut(subject)?;
        if profile.frozen {
            return Err(ScoreError::AlreadyFrozen(subject.clone()));
        }
        profile.frozen = true;
        profile.last_updated = now;
        tracing::warn!(subject = %subject, "credit profile frozen");
        Ok(())
    }

    /// Lift a freeze.
    pub fn unfreeze(&mut self, subject: &SubjectId, now: Timestamp) -> Result<(), ScoreError> {
        let profile = self.profile_mut(subject)?;
        if !profile.frozen {
            return Err(ScoreError::NotFrozen(subject.clone()));
        }
        profile.frozen = false;
        profile.last_updated = now;
        tracing::info!(subject = %subject, "credit profile unfrozen");
        Ok(())
    }

    /// Set the KYC state of an existing profile. Returns the previous state.
    pub fn set_kyc_status(
        &mut self,
        subject: &SubjectId,
        status: KycStatus,
        now: Timestamp,
    ) -> Result<KycStatus, ScoreError> {
        let profile = self.profile_mut(subject)?;
        let previous = profile.kyc_status;
        profile.kyc_status = status;
        profile.last_updated = now;
        tracing::info!(subject = %subject, from = %previous, to = %status, "kyc status changed");
        Ok(previous)
    }

    /// Flag the record at `index` as disputed. Returns false if it already was.
    pub(crate) fn mark_disputed(&mut self, subject: &SubjectId, index: usize) -> Result<bool, ScoreError> {
        let id = self.record_id(subject, index)?;
        match self.record_mut(id) {
            Some(r) if r.disputed => Ok(false),
            Some(r) => {
                r.disputed = true;
                Ok(true)
            }
            None => Err(ScoreError::RecordNotFound {
                subject: subject.clone(),
                index,
            }),
        }
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn apply(
        &mut self,
        subject: &SubjectId,
        provider: &SubjectId,
        record: NewRecord,
        compliance_flags: Vec<String>,
        reason: String,
        now: Timestamp,
    ) -> ScoreUpdate {
        let decay_period = self.config.decay_period_days;
        let retention = self.config.record_retention_days;
        let id = RecordId(self.records.len() as u64);

        let profile_created = !self.profiles.contains_key(subject);
        let profile = self
            .profiles
            .entry(subject.clone())
            .or_insert_with(|| CreditProfile::new(subject.clone(), now));
        let old_score = profile.score;

        let mut decay = 0;
        if now > profile.last_decay_at.plus_days(decay_period) {
            if profile.score < INITIAL_SCORE {
                decay = (INITIAL_SCORE - profile.score) / 10;
                profile.score += decay;
            }
            profile.last_decay_at = now;
        }

        let raw = i32::from(profile.score) + record.score_impact;
        profile.score = raw.clamp(i32::from(MIN_SCORE), i32::from(MAX_SCORE)) as u16;
        profile.risk_level = risk_level_for(profile.score);
        profile.record_count = profile.record_count.saturating_add(1);
        profile.last_updated = now;
        let new_score = profile.score;
        let risk_level = profile.risk_level;

        self.records.push(CreditRecord {
            id,
            subject: subject.clone(),
            timestamp: now,
            amount: record.amount,
            repaid: false,
            repayment_timestamp: None,
            provider: provider.clone(),
            record_type: record.record_type,
            score_impact: record.score_impact,
            data_hash_ref: record.data_hash_ref,
            disputed: false,
            expiry_at: now.plus_days(retention),
            compliance_flags,
        });
        let history = self.index.entry(subject.clone()).or_default();
        history.push(id);
        let record_index = history.len() - 1;

        tracing::info!(
            subject = %subject,
            record = %id,
            old_score,
            new_score,
            decay,
            "credit score updated"
        );
        ScoreUpdate {
            subject: subject.clone(),
            record_id: id,
            record_index,
            old_score,
            new_score,
            decay,
            risk_level,
            reason,
            profile_created,
        }
    }

    fn history_ids(&self, subject: &SubjectId) -> &[RecordId] {
        self.index.get(subject).map(Vec::as_slice).unwrap_or(&[])
    }

    fn record_id(&self, subject: &SubjectId, index: usize) -> Result<RecordId, ScoreError> {
        self.history_ids(subject)
            .get(index)
            .copied()
            .ok_or_else(|| ScoreError::RecordNotFound {
                subject: subject.clone(),
                index,
            })
    }

    fn record_mut(&mut self, id: RecordId) -> Option<&mut CreditRecord> {
        usize::try_from(id.value())
            .ok()
            .and_then(|i| self.records.get_mut(i))
    }

    fn profile_mut(&mut self, subject: &SubjectId) -> Result<&mut CreditProfile, ScoreError> {
        self.profiles
            .get_mut(subject)
            .ok_or_else(|| ScoreError::ProfileNotFound(subject.clone()))
    }
}

fn validate_impact(impact: i32) -> Result<(), ScoreError> {
    if !(-MAX_IMPACT..=MAX_IMPACT).contains(&impact) {
        return Err(ScoreError::ImpactOutOfRange {
            impact,
            max: MAX_IMPACT,
        });
    }
    Ok(())
}
