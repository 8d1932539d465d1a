//! # Role governance
//!
//! Decides whether an actor may act on one specific role.
//!
//! Check order (first match wins):
//! 1. RoleAdmin for the role → Allowed, whatever the action
//! 2. RoleManager for the role → Allowed for assign/unassign, otherwise
//!    Denied (no fall-through)
//! 3. Generic grant of command `role` with the role id as subcommand →
//!    Allowed
//! 4. Default: Denied
//!
//! Delegations are looked up by user id. With
//! [`GovernancePolicy::probe_held_roles`] the held role ids are probed as
//! well, admin before manager.

use serde::{Deserialize, Serialize};

use crate::actions::RoleAction;
use crate::delegation::{DelegationKind, DelegationRegistry};
use crate::ids::{PrincipalId, RoleId};
use crate::resolver::{Actor, AuthorizationResolver, Decision, Grounds};

/// Command key under which generic per-role grants are stored.
pub const ROLE_COMMAND: &str = "role";

/// Tunables for [`RoleGovernance`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GovernancePolicy {
    /// Also look up each held role id in the delegation tables.
    #[serde(default)]
    pub probe_held_roles: bool,
}

/// Why a role action was allowed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleGrounds {
    /// The principal (user, or a held role when probing) is a RoleAdmin.
    RoleAdmin(PrincipalId),
    /// The principal is a RoleManager and the action is a membership change.
    RoleManager(PrincipalId),
    /// Generic `role <id>` grant.
    Permission(Grounds),
}

/// Why a role action was denied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleDenial {
    /// A RoleManager attempted a structural action.
    ManagerStructural(PrincipalId),
    /// No delegation or grant applies.
    NoGrant,
}

/// Outcome of a role governance check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleDecision {
    /// Allowed, with the first rule that matched.
    Allowed(RoleGrounds),
    /// Denied, with the reason.
    Denied(RoleDenial),
}

impl RoleDecision {
    /// Check if the action was allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RoleDecision::Allowed(_))
    }
}

/// Role-instance policy combining delegation with generic grants.
///
/// # Example
///
/// ```
/// use guild_rbac::{
///     Actor, AuthorizationResolver, DelegationKind, DelegationRegistry, PermissionTable,
///     PrincipalId, RoleAction, RoleGovernance, TenantId,
/// };
///
/// let tenant = TenantId(1);
/// let role = PrincipalId(500);
/// let manager = PrincipalId(7);
///
/// let table = PermissionTable::new();
/// let mut registry = DelegationRegistry::new();
/// registry.add(DelegationKind::Manager, role, manager);
///
/// let governance = RoleGovernance::new(AuthorizationResolver::new(&table), &registry);
/// let actor = Actor::new(tenant, manager);
/// assert!(governance.can_manage_role(&actor, role, Some(RoleAction::Assign)));
/// assert!(!governance.can_manage_role(&actor, role, None));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RoleGovernance<'a> {
    resolver: AuthorizationResolver<'a>,
    registry: &'a DelegationRegistry,
    policy: GovernancePolicy,
}

impl<'a> RoleGovernance<'a> {
    /// Create a governance view with the default policy.
    pub fn new(resolver: AuthorizationResolver<'a>, registry: &'a DelegationRegistry) -> Self {
        Self {
            resolver,
            registry,
            policy: GovernancePolicy::default(),
        }
    }

    /// Replace the policy.
    pub fn with_policy(mut self, policy: GovernancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check whether `actor` may perform `action` on `role`.
    ///
    /// `None` stands for a structural action (create/edit/delete).
    pub fn can_manage_role(&self, actor: &Actor, role: RoleId, action: Option<RoleAction>) -> bool {
        self.decide(actor, role, action).is_allowed()
    }

    /// Like [`can_manage_role`](Self::can_manage_role), with the reason.
    pub fn decide(&self, actor: &Actor, role: RoleId, action: Option<RoleAction>) -> RoleDecision {
        if let Some(admin) = self.delegate(actor, role, DelegationKind::Admin) {
            return RoleDecision::Allowed(RoleGrounds::RoleAdmin(admin));
        }

        if let Some(manager) = self.delegate(actor, role, DelegationKind::Manager) {
            return if action.is_some_and(|a| a.is_membership()) {
                RoleDecision::Allowed(RoleGrounds::RoleManager(manager))
            } else {
                RoleDecision::Denied(RoleDenial::ManagerStructural(manager))
            };
        }

        let role_token = role.to_string();
        match self.resolver.resolve(actor, ROLE_COMMAND, Some(&role_token)) {
            Decision::Allowed(grounds) => RoleDecision::Allowed(RoleGrounds::Permission(grounds)),
            Decision::Denied => RoleDecision::Denied(RoleDenial::NoGrant),
        }
    }

    fn delegate(&self, actor: &Actor, role: RoleId, kind: DelegationKind) -> Option<PrincipalId> {
        let table = self.registry.table(kind);
        if table.contains(role, actor.user) {
            return Some(actor.user);
        }
        if !self.policy.probe_held_roles {
            return None;
        }
        actor
            .roles
            .iter()
            .copied()
            .find(|held| table.contains(role, *held))
    }
}
