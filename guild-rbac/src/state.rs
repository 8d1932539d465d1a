//! # Access state
//!
//! The complete set of tables: generic grants plus both delegation tables.
//! This is the unit that is locked, persisted and restored as a whole.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::delegation::{DelegationKind, DelegationRegistry};
use crate::governance::{GovernancePolicy, RoleGovernance};
use crate::ids::{PrincipalId, RoleId};
use crate::resolver::{Actor, AuthorizationResolver};
use crate::table::{CommandGrants, PermissionTable};

/// Generic permission table and delegation registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessState {
    /// tenant → principal → command → subcommands
    pub permissions: PermissionTable,
    /// role → managers / admins
    pub delegations: DelegationRegistry,
}

impl AccessState {
    /// Create empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver over the permission table.
    pub fn resolver(&self) -> AuthorizationResolver<'_> {
        AuthorizationResolver::new(&self.permissions)
    }

    /// Governance over both tables.
    pub fn governance(&self, policy: GovernancePolicy) -> RoleGovernance<'_> {
        RoleGovernance::new(self.resolver(), &self.delegations).with_policy(policy)
    }

    /// Everything that applies to `actor`.
    ///
    /// Only principals that actually hold grants appear in the report.
    pub fn report(&self, actor: &Actor) -> PermissionReport {
        let user = self
            .permissions
            .grants(actor.tenant, actor.user)
            .cloned()
            .unwrap_or_default();
        let roles = actor
            .roles
            .iter()
            .filter_map(|role| {
                self.permissions
                    .grants(actor.tenant, *role)
                    .map(|grants| (*role, grants.clone()))
            })
            .collect();

        PermissionReport {
            user,
            roles,
            manager_of: self
                .delegations
                .table(DelegationKind::Manager)
                .roles_for(actor.user),
            admin_of: self
                .delegations
                .table(DelegationKind::Admin)
                .roles_for(actor.user),
        }
    }

    /// Check if all tables are empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.delegations.is_empty()
    }
}

/// The "what am I allowed to do" view for one actor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionReport {
    /// The user's own grants.
    pub user: CommandGrants,
    /// Grants of each held role that has any.
    pub roles: BTreeMap<PrincipalId, CommandGrants>,
    /// Roles the user manages.
    pub manager_of: Vec<RoleId>,
    /// Roles the user administers.
    pub admin_of: Vec<RoleId>,
}

impl PermissionReport {
    /// Check if the actor holds nothing special.
    pub fn is_empty(&self) -> bool {
        self.user.is_empty()
            && self.roles.is_empty()
            && self.manager_of.is_empty()
            && self.admin_of.is_empty()
    }
}
