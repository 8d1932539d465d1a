//! Role command guards
//!
//! The `role` command group acts on platform roles; the platform calls are
//! the caller's business. This module decides whether each call is allowed
//! and owns the delegate bookkeeping behind `role edit`,
//! `role remove_manager` and `role remove_admin`.

use guild_rbac::{
    parse_principal, Actor, DelegationKind, IdentifierError, PrincipalId, PrincipalKind,
    RevokeOutcome, RoleAction, RoleDecision, RoleDenial, RoleId, ROLE_COMMAND,
};
use guild_store::PermissionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::{CommandError, CommandResult};
use crate::perms::require;

/// Parse a comma-separated role list (`<@&1>, 2, ...`).
///
/// Each entry keeps its original text so the caller can report failures
/// per token. User mentions are rejected.
pub fn parse_role_list(input: &str) -> Vec<(String, Result<RoleId, IdentifierError>)> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            let parsed = parse_principal(token).and_then(|p| match p.kind {
                PrincipalKind::User => Err(IdentifierError::Malformed(token.to_string())),
                _ => Ok(p.id),
            });
            (token.to_string(), parsed)
        })
        .collect()
}

/// Per-role verdicts for a batch action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCheck {
    /// Roles the actor may act on.
    pub allowed: Vec<RoleId>,
    /// Roles refused, with the reason.
    pub denied: Vec<(RoleId, RoleDenial)>,
}

impl BatchCheck {
    /// Check if every role was allowed.
    pub fn all_allowed(&self) -> bool {
        self.denied.is_empty()
    }
}

/// Delegates recorded by [`RoleCommands::edit_delegates`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegateUpdate {
    /// Principal added as manager.
    pub manager: Option<PrincipalId>,
    /// Principal added as admin.
    pub admin: Option<PrincipalId>,
}

impl DelegateUpdate {
    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.manager.is_none() && self.admin.is_none()
    }
}

/// Guards for the `role` command group.
#[derive(Debug, Clone)]
pub struct RoleCommands {
    store: Arc<PermissionStore>,
}

impl RoleCommands {
    /// Create the handlers.
    pub fn new(store: Arc<PermissionStore>) -> Self {
        Self { store }
    }

    /// `role create` needs the `role create` permission.
    pub async fn authorize_create(&self, actor: &Actor) -> CommandResult<()> {
        require(
            &self.store,
            actor,
            ROLE_COMMAND,
            Some(RoleAction::Create.as_str()),
        )
        .await
    }

    /// Check each role of a `delete`, `assign` or `unassign` batch.
    ///
    /// A refused role does not stop the others.
    pub async fn check_batch(
        &self,
        actor: &Actor,
        action: RoleAction,
        roles: &[RoleId],
    ) -> BatchCheck {
        let mut check = BatchCheck::default();
        for &role in roles {
            match self.store.decide_role(actor, role, Some(action)).await {
                RoleDecision::Allowed(_) => check.allowed.push(role),
                RoleDecision::Denied(reason) => check.denied.push((role, reason)),
            }
        }
        check
    }

    /// Record the delegates named in `role edit`.
    ///
    /// Requires structural authority over `role`. Both tokens are parsed
    /// before either is stored.
    pub async fn edit_delegates(
        &self,
        actor: &Actor,
        role: RoleId,
        manager: Option<&str>,
        admin: Option<&str>,
    ) -> CommandResult<DelegateUpdate> {
        if !self
            .store
            .can_manage_role(actor, role, Some(RoleAction::Edit))
            .await
        {
            return Err(CommandError::forbidden(ROLE_COMMAND, Some(&role.to_string())));
        }

        let update = DelegateUpdate {
            manager: parse_delegate(manager)?,
            admin: parse_delegate(admin)?,
        };

        if let Some(principal) = update.manager {
            self.store.add_role_manager(role, principal).await?;
            info!(role = %role, manager = %principal, "role manager added");
        }
        if let Some(principal) = update.admin {
            self.store.add_role_admin(role, principal).await?;
            info!(role = %role, admin = %principal, "role admin added");
        }
        Ok(update)
    }

    /// `role remove_manager` / `role remove_admin`: needs `role edit`.
    pub async fn remove_delegate(
        &self,
        actor: &Actor,
        kind: DelegationKind,
        role: RoleId,
        principal: &str,
    ) -> CommandResult<RevokeOutcome> {
        require(
            &self.store,
            actor,
            ROLE_COMMAND,
            Some(RoleAction::Edit.as_str()),
        )
        .await?;

        let principal = parse_principal(principal)?.id;
        let outcome = match kind {
            DelegationKind::Manager => self.store.remove_role_manager(role, principal).await?,
            DelegationKind::Admin => self.store.remove_role_admin(role, principal).await?,
        };

        info!(
            role = %role,
            principal = %principal,
            kind = kind.as_str(),
            removed = outcome.is_removed(),
            "role delegate removal"
        );
        Ok(outcome)
    }
}

fn parse_delegate(token: Option<&str>) -> CommandResult<Option<PrincipalId>> {
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => Ok(Some(parse_principal(token)?.id)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_rbac::{RoleGrounds, TenantId};
    use guild_store::{MemorySnapshotBackend, StoreConfig};

    const T: TenantId = TenantId(1);
    const ROLE: RoleId = PrincipalId(500);
    const OTHER_ROLE: RoleId = PrincipalId(501);
    const ADMIN: PrincipalId = PrincipalId(1);
    const MANAGER: PrincipalId = PrincipalId(2);
    const EDITOR: PrincipalId = PrincipalId(3);
    const STRANGER: PrincipalId = PrincipalId(4);

    async fn setup() -> (RoleCommands, Arc<PermissionStore>, Arc<MemorySnapshotBackend>) {
        let backend = Arc::new(MemorySnapshotBackend::new());
        let store = Arc::new(
            PermissionStore::with_backend(backend.clone(), StoreConfig::default())
                .await
                .unwrap(),
        );
        store.add_role_admin(ROLE, ADMIN).await.unwrap();
        store.add_role_manager(ROLE, MANAGER).await.unwrap();
        store.grant(T, EDITOR, "role", Some("edit")).await.unwrap();
        store.grant(T, EDITOR, "role", Some("<@&501>")).await.unwrap();
        (RoleCommands::new(store.clone()), store, backend)
    }

    #[test]
    fn test_parse_role_list() {
        let parsed = parse_role_list("<@&500>, 501 ,, <@7>, mods");
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[0].1, Ok(ROLE));
        assert_eq!(parsed[1].1, Ok(OTHER_ROLE));
        assert!(parsed[2].1.is_err());
        assert_eq!(parsed[3].0, "mods");
        assert!(parsed[3].1.is_err());
    }

    #[tokio::test]
    async fn test_authorize_create() {
        let (roles, store, _) = setup().await;
        assert!(roles.authorize_create(&Actor::new(T, EDITOR)).await.is_err());

        store.grant(T, EDITOR, "role", Some("Create")).await.unwrap();
        assert!(roles.authorize_create(&Actor::new(T, EDITOR)).await.is_ok());
    }

    #[tokio::test]
    async fn test_bare_role_grant_gives_no_role_authority() {
        let (roles, store, _) = setup().await;
        store.grant(T, STRANGER, "role", None).await.unwrap();
        let stranger = Actor::new(T, STRANGER);

        assert!(roles.authorize_create(&stranger).await.is_err());
        let check = roles
            .check_batch(&stranger, RoleAction::Delete, &[ROLE, OTHER_ROLE])
            .await;
        assert!(check.allowed.is_empty());
        assert_eq!(check.denied.len(), 2);
        let err = roles
            .edit_delegates(&stranger, OTHER_ROLE, Some("<@9>"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_check_batch() {
        let (roles, _, _) = setup().await;
        let manager = Actor::new(T, MANAGER);

        let check = roles
            .check_batch(&manager, RoleAction::Assign, &[ROLE, OTHER_ROLE])
            .await;
        assert_eq!(check.allowed, vec![ROLE]);
        assert_eq!(check.denied, vec![(OTHER_ROLE, RoleDenial::NoGrant)]);

        let check = roles.check_batch(&manager, RoleAction::Delete, &[ROLE]).await;
        assert_eq!(
            check.denied,
            vec![(ROLE, RoleDenial::ManagerStructural(MANAGER))]
        );

        let check = roles
            .check_batch(&Actor::new(T, EDITOR), RoleAction::Delete, &[OTHER_ROLE])
            .await;
        assert!(check.all_allowed());
    }

    #[tokio::test]
    async fn test_edit_delegates() {
        let (roles, store, backend) = setup().await;

        let update = roles
            .edit_delegates(&Actor::new(T, ADMIN), ROLE, Some("<@9>"), Some("<@&700>"))
            .await
            .unwrap();
        assert_eq!(update.manager, Some(PrincipalId(9)));
        assert_eq!(update.admin, Some(PrincipalId(700)));
        assert!(store.is_role_manager(ROLE, PrincipalId(9)).await);

        // the new admin is a role id; it counts through held roles only
        // when the policy probes them
        let via_role = Actor::new(T, STRANGER).with_roles([PrincipalId(700)]);
        assert!(!store.can_manage_role(&via_role, ROLE, None).await);
        assert!(matches!(
            store.decide_role(&Actor::new(T, ADMIN), ROLE, None).await,
            RoleDecision::Allowed(RoleGrounds::RoleAdmin(ADMIN))
        ));

        // a bad admin token stores neither delegate
        let writes = backend.writes();
        let err = roles
            .edit_delegates(&Actor::new(T, ADMIN), ROLE, Some("<@20>"), Some("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidTarget(_)));
        assert_eq!(backend.writes(), writes);
        assert!(!store.is_role_manager(ROLE, PrincipalId(20)).await);
    }

    #[tokio::test]
    async fn test_edit_delegates_requires_structural_authority() {
        let (roles, _, _) = setup().await;

        let err = roles
            .edit_delegates(&Actor::new(T, MANAGER), ROLE, Some("<@9>"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Forbidden(_)));

        let update = roles
            .edit_delegates(&Actor::new(T, EDITOR), OTHER_ROLE, None, Some("  "))
            .await
            .unwrap();
        assert!(update.is_empty());
    }

    #[tokio::test]
    async fn test_remove_delegate() {
        let (roles, store, _) = setup().await;

        let err = roles
            .remove_delegate(&Actor::new(T, ADMIN), DelegationKind::Manager, ROLE, "<@2>")
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Forbidden(_)));

        let editor = Actor::new(T, EDITOR);
        let outcome = roles
            .remove_delegate(&editor, DelegationKind::Manager, ROLE, "<@2>")
            .await
            .unwrap();
        assert_eq!(outcome, RevokeOutcome::Removed);
        assert!(!store.is_role_manager(ROLE, MANAGER).await);

        let outcome = roles
            .remove_delegate(&editor, DelegationKind::Admin, ROLE, "4")
            .await
            .unwrap();
        assert_eq!(outcome, RevokeOutcome::NotFound);
    }
}
