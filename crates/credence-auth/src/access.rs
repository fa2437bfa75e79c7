//! # Access Control
//!
//! A side-effect-free predicate evaluated before every operation: does the
//! caller hold one of the roles the operation accepts, and is the engine
//! out of emergency mode? Role dispatch is explicit, via [`Requirement`]
//! values declared per operation, never inherited behaviour.
//!
//! `Admin` satisfies every staff requirement. Ownership checks
//! ("only the borrower may deposit collateral") belong to the business
//! component that knows the owner; this module only offers
//! [`AccessControl::require_owner`] for them to call.

use std::collections::BTreeSet;

use credence_core::{SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

// ── Role ────────────────────────────────────────────────────────────────────

/// Staff roles recognised by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full control, including the emergency pause.
    Admin,
    /// Submits credit records about subjects.
    DataProvider,
    /// Freezes profiles, resolves disputes, records compliance checks.
    ComplianceOfficer,
    /// Underwrites loan applications.
    Underwriter,
    /// Funds, defaults, liquidates and cancels loans; manages pool liquidity.
    LoanOfficer,
    /// Read-only access to every subject.
    Auditor,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::DataProvider => "data_provider",
            Self::ComplianceOfficer => "compliance_officer",
            Self::Underwriter => "underwriter",
            Self::LoanOfficer => "loan_officer",
            Self::Auditor => "auditor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles allowed to read any subject's profile and loans.
pub const READ_ROLES: &[Role] = &[
    Role::Admin,
    Role::ComplianceOfficer,
    Role::Underwriter,
    Role::LoanOfficer,
    Role::Auditor,
];

/// The set of roles held by one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// An empty role set (an ordinary borrower).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the set contains `role`.
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Add a role.
    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    /// Remove a role.
    pub fn remove(&mut self, role: Role) -> bool {
        self.0.remove(&role)
    }

    /// Whether the set satisfies any of `accepted`, with `Admin` as a wildcard.
    pub fn satisfies_any(&self, accepted: &[Role]) -> bool {
        self.contains(Role::Admin) || accepted.iter().any(|r| self.contains(*r))
    }

    /// Iterate over held roles in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── Requirement ─────────────────────────────────────────────────────────────

/// What an operation demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any authenticated caller; ownership is checked downstream.
    Authenticated,
    /// At least one of these roles (or `Admin`).
    AnyOf(&'static [Role]),
    /// Pause control. `Admin` only, and permitted while paused.
    PauseControl,
}

// ── AccessControl ───────────────────────────────────────────────────────────

/// Role predicate plus the emergency pause flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControl {
    paused: bool,
    changed_at: Option<Timestamp>,
    changed_by: Option<SubjectId>,
}

impl AccessControl {
    /// A new, unpaused access controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether mutating operations are halted.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// When and by whom the pause flag last changed.
    pub fn last_change(&self) -> Option<(Timestamp, &SubjectId)> {
        self.changed_at.zip(self.changed_by.as_ref())
    }

    /// Check `caller` (holding `roles`) against `requirement`.
    pub fn check(
        &self,
        caller: &SubjectId,
        roles: &RoleSet,
        requirement: Requirement,
    ) -> Result<(), AuthError> {
        if self.paused && requirement != Requirement::PauseControl {
            return Err(AuthError::EmergencyModeActive);
        }
        match requirement {
            Requirement::Authenticated => Ok(()),
            Requirement::AnyOf(accepted) => require_any(caller, roles, accepted),
            Requirement::PauseControl => require_any(caller, roles, &[Role::Admin]),
        }
    }

    /// Read access to `subject`'s data: the subject themselves or a read role.
    /// Reads stay available while paused.
    pub fn check_read(
        &self,
        caller: &SubjectId,
        roles: &RoleSet,
        subject: &SubjectId,
    ) -> Result<(), AuthError> {
        if caller == subject {
            return Ok(());
        }
        require_any(caller, roles, READ_ROLES)
    }

    /// Require `caller` to be `owner`.
    pub fn require_owner(caller: &SubjectId, owner: &SubjectId) -> Result<(), AuthError> {
        if caller == owner {
            Ok(())
        } else {
            Err(AuthError::NotOwner {
                caller: caller.clone(),
                owner: owner.clone(),
            })
        }
    }

    /// Set or clear the pause flag. Returns whether the flag changed.
    pub fn set_paused(&mut self, paused: bool, by: &SubjectId, now: Timestamp) -> bool {
        if self.paused == paused {
            return false;
        }
        self.paused = paused;
        self.changed_at = Some(now);
        self.changed_by = Some(by.clone());
        if paused {
            tracing::warn!(by = %by, "emergency pause engaged");
        } else {
            tracing::info!(by = %by, "emergency pause lifted");
        }
        true
    }
}

fn require_any(caller: &SubjectId, roles: &RoleSet, accepted: &[Role]) -> Result<(), AuthError> {
    if roles.satisfies_any(accepted) {
        Ok(())
    } else {
        Err(AuthError::MissingRole {
            caller: caller.clone(),
            required: accepted
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(s: &str) -> SubjectId {
        SubjectId::new(s).unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-01-01T00:00:00Z").unwrap()
    }

    #[test]
    fn data_provider_passes_provider_requirement() {
        let ac = AccessControl::new();
        let roles: RoleSet = [Role::DataProvider].into_iter().collect();
        ac.check(&subject("p"), &roles, Requirement::AnyOf(&[Role::DataProvider]))
            .unwrap();
    }

    #[test]
    fn borrower_fails_staff_requirement() {
        let ac = AccessControl::new();
        let err = ac
            .check(&subject("b"), &RoleSet::empty(), Requirement::AnyOf(&[Role::Underwriter]))
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingRole { .. }));
        assert!(err.to_string().contains("underwriter"));
    }

    #[test]
    fn admin_is_a_wildcard() {
        let ac = AccessControl::new();
        let roles: RoleSet = [Role::Admin].into_iter().collect();
        ac.check(&subject("a"), &roles, Requirement::AnyOf(&[Role::LoanOfficer]))
            .unwrap();
    }

    #[test]
    fn pause_blocks_everything_but_pause_control() {
        let mut ac = AccessControl::new();
        let admin = subject("admin");
        let roles: RoleSet = [Role::Admin].into_iter().collect();
        assert!(ac.set_paused(true, &admin, now()));
        assert!(!ac.set_paused(true, &admin, now()));

        let err = ac.check(&admin, &roles, Requirement::Authenticated).unwrap_err();
        assert!(matches!(err, AuthError::EmergencyModeActive));
        assert_eq!(err.kind(), credence_core::ErrorKind::State);

        ac.check(&admin, &roles, Requirement::PauseControl).unwrap();
    }

    #[test]
    fn pause_control_requires_admin() {
        let ac = AccessControl::new();
        let roles: RoleSet = [Role::LoanOfficer].into_iter().collect();
        assert!(ac.check(&subject("lo"), &roles, Requirement::PauseControl).is_err());
    }

    #[test]
    fn reads_allowed_for_self_and_read_roles() {
        let ac = AccessControl::new();
        let alice = subject("alice");
        ac.check_read(&alice, &RoleSet::empty(), &alice).unwrap();
        assert!(ac.check_read(&subject("bob"), &RoleSet::empty(), &alice).is_err());
        let auditor: RoleSet = [Role::Auditor].into_iter().collect();
        ac.check_read(&subject("aud"), &auditor, &alice).unwrap();
    }
}
