//! # Authorization
//!
//! Decides whether an acting user may run a command.
//!
//! Check order (first match wins):
//! 1. User holds the full wildcard → Allowed
//! 2. Any held role holds the full wildcard → Allowed
//! 3. User's own grants cover the command/subcommand → Allowed
//! 4. Any held role's grants cover the command/subcommand → Allowed
//! 5. Default: Denied
//!
//! Held roles are a union: none of them outranks another. Command names are
//! not validated here; an unknown command is simply not granted.

use serde::{Deserialize, Serialize};

use crate::identifier::{normalize_command, normalize_subcommand};
use crate::ids::{PrincipalId, TenantId};
use crate::table::{
    grants_cover, has_full_wildcard, CommandGrants, PermissionTable, TenantGrants,
};

/// The acting principal: one user plus the roles it currently holds, inside
/// one tenant.
///
/// The caller is trusted to supply a correct identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Tenant the request is made in.
    pub tenant: TenantId,
    /// The acting user.
    pub user: PrincipalId,
    /// Roles held by the user.
    #[serde(default)]
    pub roles: Vec<PrincipalId>,
}

impl Actor {
    /// Create an actor holding no roles.
    pub fn new(tenant: TenantId, user: PrincipalId) -> Self {
        Self {
            tenant,
            user,
            roles: Vec::new(),
        }
    }

    /// Set the held roles.
    pub fn with_roles<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = PrincipalId>,
    {
        self.roles = roles.into_iter().collect();
        self
    }

    /// The user followed by every held role.
    pub fn principals(&self) -> impl Iterator<Item = PrincipalId> + '_ {
        std::iter::once(self.user).chain(self.roles.iter().copied())
    }
}

/// Why a request was allowed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "kind", content = "principal")]
pub enum Grounds {
    /// The user holds the full wildcard.
    UserWildcard,
    /// A held role holds the full wildcard.
    RoleWildcard(PrincipalId),
    /// The user's own grants cover the request.
    UserGrant,
    /// A held role's grants cover the request.
    RoleGrant(PrincipalId),
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Allowed, with the first rule that matched.
    Allowed(Grounds),
    /// No rule matched.
    Denied,
}

impl Decision {
    /// Check if the request was allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }
}

/// Read-only resolver over a [`PermissionTable`].
///
/// # Example
///
/// ```
/// use guild_rbac::{Actor, AuthorizationResolver, PermissionTable, PrincipalId, TenantId};
///
/// let tenant = TenantId(1);
/// let moderator_role = PrincipalId(900);
///
/// let mut table = PermissionTable::new();
/// table.grant(tenant, moderator_role, "testlog", None);
///
/// let actor = Actor::new(tenant, PrincipalId(5)).with_roles([moderator_role]);
/// let resolver = AuthorizationResolver::new(&table);
/// assert!(resolver.authorize(&actor, "testlog", None));
/// assert!(!resolver.authorize(&actor, "perms", None));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationResolver<'a> {
    table: &'a PermissionTable,
}

impl<'a> AuthorizationResolver<'a> {
    /// Create a resolver over `table`.
    pub fn new(table: &'a PermissionTable) -> Self {
        Self { table }
    }

    /// Check whether `actor` may run `command` / `subcommand`.
    pub fn authorize(&self, actor: &Actor, command: &str, subcommand: Option<&str>) -> bool {
        self.resolve(actor, command, subcommand).is_allowed()
    }

    /// Like [`authorize`](Self::authorize), but reports which rule matched.
    pub fn resolve(&self, actor: &Actor, command: &str, subcommand: Option<&str>) -> Decision {
        let Some(tenant) = self.table.tenant(actor.tenant) else {
            return Decision::Denied;
        };
        let user_grants = tenant.get(&actor.user);

        if user_grants.is_some_and(has_full_wildcard) {
            return Decision::Allowed(Grounds::UserWildcard);
        }
        if let Some((role, _)) =
            held_role_grants(actor, tenant).find(|(_, grants)| has_full_wildcard(grants))
        {
            return Decision::Allowed(Grounds::RoleWildcard(role));
        }

        let command = normalize_command(command);
        let subcommand = subcommand.and_then(normalize_subcommand);
        let subcommand = subcommand.as_deref();

        if user_grants.is_some_and(|grants| grants_cover(grants, &command, subcommand)) {
            return Decision::Allowed(Grounds::UserGrant);
        }
        if let Some((role, _)) = held_role_grants(actor, tenant)
            .find(|(_, grants)| grants_cover(grants, &command, subcommand))
        {
            return Decision::Allowed(Grounds::RoleGrant(role));
        }

        Decision::Denied
    }
}

fn held_role_grants<'t>(
    actor: &'t Actor,
    tenant: &'t TenantGrants,
) -> impl Iterator<Item = (PrincipalId, &'t CommandGrants)> + 't {
    actor
        .roles
        .iter()
        .filter_map(move |role| tenant.get(role).map(|grants| (*role, grants)))
}
