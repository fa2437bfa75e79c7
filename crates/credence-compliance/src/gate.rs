//! # Compliance Gate
//!
//! Two-phase: [`ComplianceGate::admit`] evaluates a provider-initiated
//! record without touching state; [`ComplianceGate::commit`] spends quota
//! and logs advisory flags once the record has been stored.

use std::collections::BTreeMap;

use credence_core::{Amount, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::config::ComplianceConfig;
use crate::error::ComplianceError;
use crate::violation::{ComplianceViolation, ViolationKind, ViolationLog};

/// A provider's usage for one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuota {
    /// UTC day number the counter belongs to.
    pub day: i64,
    /// Records submitted on that day.
    pub used: u32,
}

/// Result of a successful admission, redeemed by [`ComplianceGate::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "quota is only spent when the admission is committed"]
pub struct Admission {
    provider: SubjectId,
    subject: SubjectId,
    amount: Amount,
    day: i64,
    flags: Vec<ViolationKind>,
    timestamp: Timestamp,
}

impl Admission {
    /// Advisory flags raised for this record.
    pub fn flags(&self) -> &[ViolationKind] {
        &self.flags
    }

    /// Flag labels as stored on the credit record.
    pub fn flag_labels(&self) -> Vec<String> {
        self.flags.iter().map(|k| k.as_str().to_string()).collect()
    }
}

/// Freeze enforcement, daily quotas and advisory screening.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceGate {
    config: ComplianceConfig,
    quotas: BTreeMap<SubjectId, DailyQuota>,
    violations: ViolationLog,
}

impl ComplianceGate {
    /// A gate with empty counters.
    pub fn new(config: ComplianceConfig) -> Self {
        Self {
            config,
            quotas: BTreeMap::new(),
            violations: ViolationLog::new(),
        }
    }

    /// Active thresholds.
    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// The violation log.
    pub fn violations(&self) -> &ViolationLog {
        &self.violations
    }

    /// Reject provider-initiated mutation of a frozen profile.
    pub fn ensure_not_frozen(subject: &SubjectId, frozen: bool) -> Result<(), ComplianceError> {
        if frozen {
            return Err(ComplianceError::ProfileFrozen {
                subject: subject.clone(),
            });
        }
        Ok(())
    }

    /// Records `provider` has submitted on the UTC day containing `now`.
    /// A counter from an earlier day reads as zero.
    pub fn quota_used(&self, provider: &SubjectId, now: Timestamp) -> u32 {
        let today = now.utc_day();
        match self.quotas.get(provider) {
            Some(q) if q.day == today => q.used,
            _ => 0,
        }
    }

    /// Fail if `provider` has no quota left today.
    pub fn check_quota(&self, provider: &SubjectId, now: Timestamp) -> Result<(), ComplianceError> {
        let limit = self.config.daily_provider_quota;
        if self.quota_used(provider, now) >= limit {
            return Err(ComplianceError::QuotaExceeded {
                provider: provider.clone(),
                day: now.utc_day(),
                limit,
            });
        }
        Ok(())
    }

    /// Advisory flags for a record of `amount`, given the timestamps of the
    /// subject's existing records.
    pub fn screen(
        &self,
        amount: Amount,
        existing: impl IntoIterator<Item = Timestamp>,
        now: Timestamp,
    ) -> Vec<ViolationKind> {
        let mut flags = Vec::new();
        if amount > self.config.large_amount_threshold {
            flags.push(ViolationKind::LargeAmount);
        }
        let window_start = now.plus_secs(-self.config.high_frequency_window_secs);
        let in_window = existing
            .into_iter()
            .filter(|t| *t > window_start && *t <= now)
            .count();
        // Counts the record being admitted.
        if in_window.saturating_add(1) > self.config.high_frequency_threshold as usize {
            flags.push(ViolationKind::HighFrequency);
        }
        flags
    }

    /// Evaluate a provider-initiated record. Pure: nothing is recorded until
    /// the returned admission is committed.
    pub fn admit(
        &self,
        provider: &SubjectId,
        subject: &SubjectId,
        frozen: bool,
        amount: Amount,
        existing: impl IntoIterator<Item = Timestamp>,
        now: Timestamp,
    ) -> Result<Admission, ComplianceError> {
        Self::ensure_not_frozen(subject, frozen)?;
        self.check_quota(provider, now)?;
        let flags = self.screen(amount, existing, now);
        Ok(Admission {
            provider: provider.clone(),
            subject: subject.clone(),
            amount,
            day: now.utc_day(),
            flags,
            timestamp: now,
        })
    }

    /// Spend one unit of the provider's quota and log any advisory flags.
    /// Returns the violations appended.
    pub fn commit(&mut self, admission: Admission) -> Vec<ComplianceViolation> {
        let quota = self
            .quotas
            .entry(admission.provider.clone())
            .or_insert(DailyQuota {
                day: admission.day,
                used: 0,
            });
        if quota.day != admission.day {
            tracing::debug!(provider = %admission.provider, day = admission.day, "daily quota reset");
            *quota = DailyQuota {
                day: admission.day,
                used: 0,
            };
        }
        quota.used = quota.used.saturating_add(1);

        let mut logged = Vec::with_capacity(admission.flags.len());
        for kind in &admission.flags {
            let detail = match kind {
                ViolationKind::LargeAmount => format!(
                    "amount {} exceeds threshold {}",
                    admission.amount, self.config.large_amount_threshold
                ),
                ViolationKind::HighFrequency => format!(
                    "more than {} records within {}s",
                    self.config.high_frequency_threshold, self.config.high_frequency_window_secs
                ),
                ViolationKind::ProfileFrozen => "profile frozen".to_string(),
            };
            let entry = self.violations.append(
                admission.subject.clone(),
                *kind,
                admission.provider.clone(),
                Some(admission.amount),
                detail,
                admission.timestamp,
            );
            logged.push(entry.clone());
        }
        logged
    }

    /// Log a profile freeze.
    pub fn record_freeze(
        &mut self,
        subject: &SubjectId,
        officer: &SubjectId,
        reason: &str,
        now: Timestamp,
    ) -> ComplianceViolation {
        self.violations
            .append(
                subject.clone(),
                ViolationKind::ProfileFrozen,
                officer.clone(),
                None,
                reason,
                now,
            )
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn s(id: &str) -> SubjectId {
        SubjectId::new(id).unwrap()
    }

    fn at(iso: &str) -> Timestamp {
        Timestamp::parse(iso).unwrap()
    }

    fn gate_with_quota(quota: u32) -> ComplianceGate {
        ComplianceGate::new(ComplianceConfig {
            daily_provider_quota: quota,
            ..Default::default()
        })
    }

    // ── Blocking checks ────────────────────────────────────────────────

    #[test]
    fn frozen_profile_is_rejected() {
        let gate = ComplianceGate::default();
        let err = gate
            .admit(&s("p"), &s("a"), true, Amount::new(10), [], at("2026-01-01T00:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, ComplianceError::ProfileFrozen { .. }));
        assert_eq!(err.kind(), credence_core::ErrorKind::Compliance);
    }

    #[test]
    fn quota_exhausts_and_resets_at_utc_midnight() {
        let mut gate = gate_with_quota(2);
        let provider = s("p");
        let day1 = at("2026-01-01T23:59:00Z");
        for _ in 0..2 {
            let adm = gate
                .admit(&provider, &s("a"), false, Amount::new(1), [], day1)
                .unwrap();
            gate.commit(adm);
        }
        let err = gate
            .admit(&provider, &s("a"), false, Amount::new(1), [], day1)
            .unwrap_err();
        assert!(matches!(err, ComplianceError::QuotaExceeded { limit: 2, .. }));

        let day2 = at("2026-01-02T00:00:00Z");
        assert_eq!(gate.quota_used(&provider, day2), 0);
        let adm = gate
            .admit(&provider, &s("a"), false, Amount::new(1), [], day2)
            .unwrap();
        gate.commit(adm);
        assert_eq!(gate.quota_used(&provider, day2), 1);
    }

    #[test]
    fn uncommitted_admission_spends_nothing() {
        let gate = gate_with_quota(1);
        let now = at("2026-01-01T10:00:00Z");
        let _ = gate.admit(&s("p"), &s("a"), false, Amount::new(1), [], now).unwrap();
        assert_eq!(gate.quota_used(&s("p"), now), 0);
    }

    // ── Advisory screening ─────────────────────────────────────────────

    #[test]
    fn large_amount_is_flagged_not_blocked() {
        let mut gate = ComplianceGate::default();
        let now = at("2026-01-01T10:00:00Z");
        let adm = gate
            .admit(&s("p"), &s("a"), false, Amount::new(1_000_001), [], now)
            .unwrap();
        assert_eq!(adm.flag_labels(), vec!["large_amount".to_string()]);
        let logged = gate.commit(adm);
        assert_eq!(logged.len(), 1);
        assert_eq!(gate.violations().for_subject(&s("a")).count(), 1);
    }

    #[test]
    fn threshold_amount_is_not_flagged() {
        let gate = ComplianceGate::default();
        let flags = gate.screen(Amount::new(1_000_000), [], at("2026-01-01T10:00:00Z"));
        assert!(flags.is_empty());
    }

    #[test]
    fn high_frequency_counts_trailing_day_only() {
        let gate = ComplianceGate::default();
        let now = at("2026-01-02T12:00:00Z");
        let recent: Vec<Timestamp> = (0..10).map(|i| now.plus_secs(-60 * i)).collect();
        assert_eq!(gate.screen(Amount::new(1), recent.clone(), now), vec![ViolationKind::HighFrequency]);

        let nine = recent[..9].to_vec();
        assert!(gate.screen(Amount::new(1), nine, now).is_empty());

        let stale: Vec<Timestamp> = (0..10).map(|i| now.plus_secs(-86_400 - i)).collect();
        assert!(gate.screen(Amount::new(1), stale, now).is_empty());
    }

    #[test]
    fn freeze_is_logged() {
        let mut gate = ComplianceGate::default();
        let v = gate.record_freeze(&s("a"), &s("officer"), "suspected fraud", at("2026-01-01T00:00:00Z"));
        assert_eq!(v.kind, ViolationKind::ProfileFrozen);
        assert_eq!(gate.violations().len(), 1);
    }

    proptest! {
        #[test]
        fn quota_never_exceeds_cap(quota in 1u32..20, attempts in 0usize..40) {
            let mut gate = gate_with_quota(quota);
            let now = at("2026-05-05T05:05:05Z");
            for _ in 0..attempts {
                if let Ok(adm) = gate.admit(&s("p"), &s("a"), false, Amount::new(1), [], now) {
                    gate.commit(adm);
                }
            }
            prop_assert!(gate.quota_used(&s("p"), now) <= quota);
        }
    }
}
