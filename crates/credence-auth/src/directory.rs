//! # Identity Directory
//!
//! The boundary to the identity/session collaborator. The engine never
//! manages identities itself; it asks the directory for a caller's role
//! set and signing key.

use std::collections::HashMap;

use credence_core::SubjectId;
use credence_crypto::Ed25519PublicKey;

use crate::access::{Role, RoleSet};

/// Source of caller roles and public key material.
pub trait IdentityDirectory {
    /// Roles currently held by `subject`. Unknown subjects hold none.
    fn roles(&self, subject: &SubjectId) -> RoleSet;

    /// The key `subject` signs requests with, if registered.
    fn public_key(&self, subject: &SubjectId) -> Option<Ed25519PublicKey>;
}

#[derive(Debug, Clone)]
struct DirectoryEntry {
    key: Ed25519PublicKey,
    roles: RoleSet,
}

/// A directory held in memory, for embedding hosts, tests and the CLI.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    entries: HashMap<SubjectId, DirectoryEntry>,
}

impl InMemoryDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) `subject` with a key and roles.
    pub fn register(
        &mut self,
        subject: SubjectId,
        key: Ed25519PublicKey,
        roles: impl IntoIterator<Item = Role>,
    ) {
        self.entries.insert(
            subject,
            DirectoryEntry {
                key,
                roles: roles.into_iter().collect(),
            },
        );
    }

    /// Grant a role to a registered subject. Returns false if unknown.
    pub fn grant(&mut self, subject: &SubjectId, role: Role) -> bool {
        match self.entries.get_mut(subject) {
            Some(entry) => {
                entry.roles.insert(role);
                true
            }
            None => false,
        }
    }

    /// Revoke a role. Returns whether the subject held it.
    pub fn revoke(&mut self, subject: &SubjectId, role: Role) -> bool {
        self.entries
            .get_mut(subject)
            .map(|entry| entry.roles.remove(role))
            .unwrap_or(false)
    }
}

impl IdentityDirectory for InMemoryDirectory {
    fn roles(&self, subject: &SubjectId) -> RoleSet {
        self.entries
            .get(subject)
            .map(|e| e.roles.clone())
            .unwrap_or_default()
    }

    fn public_key(&self, subject: &SubjectId) -> Option<Ed25519PublicKey> {
        self.entries.get(subject).map(|e| e.key.clone())
    }
}
