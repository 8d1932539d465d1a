//! # Delegation
//!
//! Per-role delegation tables. A role can be handed to:
//!
//! - **Managers**: may assign and unassign that one role, nothing else.
//! - **Admins**: may do anything to that one role.
//!
//! Both tables map `role → {principal}` and drop a role's entry as soon as
//! its set is empty.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::ids::{PrincipalId, RoleId};
use crate::table::RevokeOutcome;

/// Which delegation table an operation targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DelegationKind {
    /// Assign/unassign authority over one role.
    Manager,
    /// Unconditional authority over one role.
    Admin,
}

impl DelegationKind {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DelegationKind::Manager => "manager",
            DelegationKind::Admin => "admin",
        }
    }
}

/// One delegation table: role → delegated principals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegationTable {
    roles: BTreeMap<RoleId, BTreeSet<PrincipalId>>,
}

impl DelegationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delegate `role` to `principal`. Idempotent.
    ///
    /// # Returns
    ///
    /// `true` if the principal was not already a delegate
    pub fn add(&mut self, role: RoleId, principal: PrincipalId) -> bool {
        self.roles.entry(role).or_default().insert(principal)
    }

    /// Withdraw a delegation; the role entry is dropped once empty.
    pub fn remove(&mut self, role: RoleId, principal: PrincipalId) -> RevokeOutcome {
        let Some(delegates) = self.roles.get_mut(&role) else {
            return RevokeOutcome::NotFound;
        };
        if !delegates.remove(&principal) {
            return RevokeOutcome::NotFound;
        }
        if delegates.is_empty() {
            self.roles.remove(&role);
        }
        RevokeOutcome::Removed
    }

    /// Check whether `principal` is a delegate of `role`.
    pub fn contains(&self, role: RoleId, principal: PrincipalId) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|delegates| delegates.contains(&principal))
    }

    /// Roles delegated to `principal`, in ascending id order.
    pub fn roles_for(&self, principal: PrincipalId) -> Vec<RoleId> {
        self.roles
            .iter()
            .filter(|(_, delegates)| delegates.contains(&principal))
            .map(|(role, _)| *role)
            .collect()
    }

    /// Iterate over every role and its delegates.
    pub fn iter(&self) -> impl Iterator<Item = (RoleId, &BTreeSet<PrincipalId>)> {
        self.roles.iter().map(|(role, delegates)| (*role, delegates))
    }

    /// Check if no role is delegated.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Both delegation tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegationRegistry {
    managers: DelegationTable,
    admins: DelegationTable,
}

impl DelegationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow one table.
    pub fn table(&self, kind: DelegationKind) -> &DelegationTable {
        match kind {
            DelegationKind::Manager => &self.managers,
            DelegationKind::Admin => &self.admins,
        }
    }

    /// Mutably borrow one table.
    pub fn table_mut(&mut self, kind: DelegationKind) -> &mut DelegationTable {
        match kind {
            DelegationKind::Manager => &mut self.managers,
            DelegationKind::Admin => &mut self.admins,
        }
    }

    /// See [`DelegationTable::add`].
    pub fn add(&mut self, kind: DelegationKind, role: RoleId, principal: PrincipalId) -> bool {
        self.table_mut(kind).add(role, principal)
    }

    /// See [`DelegationTable::remove`].
    pub fn remove(
        &mut self,
        kind: DelegationKind,
        role: RoleId,
        principal: PrincipalId,
    ) -> RevokeOutcome {
        self.table_mut(kind).remove(role, principal)
    }

    /// See [`DelegationTable::contains`].
    pub fn contains(&self, kind: DelegationKind, role: RoleId, principal: PrincipalId) -> bool {
        self.table(kind).contains(role, principal)
    }

    /// Check whether `principal` manages `role`.
    pub fn is_role_manager(&self, role: RoleId, principal: PrincipalId) -> bool {
        self.managers.contains(role, principal)
    }

    /// Check whether `principal` administers `role`.
    pub fn is_role_admin(&self, role: RoleId, principal: PrincipalId) -> bool {
        self.admins.contains(role, principal)
    }

    /// Check if neither table holds anything.
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty() && self.admins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: RoleId = PrincipalId(500);
    const ALICE: PrincipalId = PrincipalId(1);
    const BOB: PrincipalId = PrincipalId(2);

    #[test]
    fn test_add_is_idempotent() {
        let mut table = DelegationTable::new();
        assert!(table.add(ROLE, ALICE));
        assert!(!table.add(ROLE, ALICE));
        assert!(table.contains(ROLE, ALICE));
        assert_eq!(table.roles_for(ALICE), vec![ROLE]);
    }

    #[test]
    fn test_remove_drops_empty_role() {
        let mut table = DelegationTable::new();
        table.add(ROLE, ALICE);
        table.add(ROLE, BOB);

        assert!(table.remove(ROLE, ALICE).is_removed());
        assert!(table.contains(ROLE, BOB));
        assert!(table.remove(ROLE, BOB).is_removed());
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut table = DelegationTable::new();
        assert_eq!(table.remove(ROLE, ALICE), RevokeOutcome::NotFound);

        table.add(ROLE, ALICE);
        let before = table.clone();
        assert_eq!(table.remove(ROLE, BOB), RevokeOutcome::NotFound);
        assert_eq!(table, before);
    }

    #[test]
    fn test_roles_for() {
        let mut table = DelegationTable::new();
        table.add(PrincipalId(3), ALICE);
        table.add(ROLE, ALICE);
        table.add(ROLE, BOB);

        assert_eq!(table.roles_for(ALICE), vec![PrincipalId(3), ROLE]);
        assert_eq!(table.roles_for(BOB), vec![ROLE]);
        assert!(table.roles_for(PrincipalId(9)).is_empty());
    }

    #[test]
    fn test_registry_tables_are_independent() {
        let mut registry = DelegationRegistry::new();
        registry.add(DelegationKind::Manager, ROLE, ALICE);
        registry.add(DelegationKind::Admin, ROLE, BOB);

        assert!(registry.is_role_manager(ROLE, ALICE));
        assert!(!registry.is_role_admin(ROLE, ALICE));
        assert!(registry.is_role_admin(ROLE, BOB));
        assert!(!registry.is_role_manager(ROLE, BOB));

        assert_eq!(
            registry.remove(DelegationKind::Admin, ROLE, ALICE),
            RevokeOutcome::NotFound
        );
        assert!(registry.remove(DelegationKind::Manager, ROLE, ALICE).is_removed());
        assert!(!registry.is_empty());
    }
}
