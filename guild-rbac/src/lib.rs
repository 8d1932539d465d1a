//! # Guild RBAC
//!
//! Permission model and resolution for guild command access.
//!
//! ## Overview
//!
//! The guild-rbac crate handles:
//! - **Grants**: tenant-scoped `command → {subcommand}` grants per principal
//! - **Wildcard**: the `*` → `{"*"}` superuser grant
//! - **Delegation**: per-role managers (assign/unassign) and admins (anything)
//! - **Resolution**: whether an actor may run a command
//! - **Governance**: whether an actor may act on one specific role
//!
//! Everything here is pure and synchronous. Persistence and locking live in
//! `guild-store`.
//!
//! ## Architecture
//!
//! ```text
//! AccessState
//!   ├─ PermissionTable     tenant → principal → command → {subcommand}
//!   └─ DelegationRegistry
//!        ├─ managers       role → {principal}
//!        └─ admins         role → {principal}
//!
//! AuthorizationResolver    wildcard (user, roles) → grant (user, roles) → deny
//! RoleGovernance           admin → manager (assign/unassign only) → `role <id>` grant → deny
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use guild_rbac::{AccessState, Actor, GovernancePolicy, PrincipalId, RoleAction, TenantId};
//!
//! let tenant = TenantId(1);
//! let owner = PrincipalId(10);
//! let helper = PrincipalId(11);
//! let role = PrincipalId(500);
//!
//! let mut state = AccessState::new();
//! state.permissions.grant_wildcard(tenant, owner);
//! state.permissions.grant(tenant, helper, "role", Some("<@&500>"));
//!
//! assert!(state.resolver().authorize(&Actor::new(tenant, owner), "perms", None));
//!
//! let governance = state.governance(GovernancePolicy::default());
//! assert!(governance.can_manage_role(&Actor::new(tenant, helper), role, Some(RoleAction::Edit)));
//! ```

pub mod actions;
pub mod delegation;
pub mod governance;
pub mod identifier;
pub mod ids;
pub mod resolver;
pub mod state;
pub mod table;

// Re-export main types for convenience
pub use actions::RoleAction;
pub use delegation::{DelegationKind, DelegationRegistry, DelegationTable};
pub use governance::{
    GovernancePolicy, RoleDecision, RoleDenial, RoleGovernance, RoleGrounds, ROLE_COMMAND,
};
pub use identifier::{
    normalize_command, normalize_subcommand, parse_principal, IdentifierError, ParsedPrincipal,
    PrincipalKind,
};
pub use ids::{PrincipalId, RoleId, TenantId};
pub use resolver::{Actor, AuthorizationResolver, Decision, Grounds};
pub use state::{AccessState, PermissionReport};
pub use table::{
    CommandGrants, PermissionTable, RevokeOutcome, TenantGrants, WHOLE_COMMAND, WILDCARD,
};
