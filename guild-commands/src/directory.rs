//! Platform seams
//!
//! The handlers never talk to the chat platform directly. Membership lookups
//! go through [`GuildDirectory`]; the administrator side effect of master
//! access goes through [`PrivilegeEscalator`].

use async_trait::async_trait;
use guild_rbac::{PrincipalId, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::CommandResult;

/// Whether a resolved target is a user or a role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A member of the tenant.
    User,
    /// A role of the tenant.
    Role,
}

/// A principal whose kind has been settled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResolvedTarget {
    /// Principal id.
    pub id: PrincipalId,
    /// User or role.
    pub kind: TargetKind,
}

impl ResolvedTarget {
    /// A user target.
    pub fn user(id: PrincipalId) -> Self {
        Self {
            id,
            kind: TargetKind::User,
        }
    }

    /// A role target.
    pub fn role(id: PrincipalId) -> Self {
        Self {
            id,
            kind: TargetKind::Role,
        }
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TargetKind::User => write!(f, "<@{}>", self.id),
            TargetKind::Role => write!(f, "<@&{}>", self.id),
        }
    }
}

/// Membership lookups against the platform.
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    /// Check if `id` is a member of `tenant`.
    async fn is_member(&self, tenant: TenantId, id: PrincipalId) -> bool;
}

/// Platform side effect of granting or revoking master access.
///
/// Called after the bookkeeping has been persisted. A failure is reported to
/// the invoker as `CommandError::Privilege`; the bookkeeping stays.
#[async_trait]
pub trait PrivilegeEscalator: Send + Sync {
    /// Give the target the platform's administrator privilege.
    async fn apply_administrator_privilege(
        &self,
        tenant: TenantId,
        target: ResolvedTarget,
    ) -> CommandResult<()>;

    /// Take the platform's administrator privilege away from the target.
    async fn revoke_administrator_privilege(
        &self,
        tenant: TenantId,
        target: ResolvedTarget,
    ) -> CommandResult<()>;
}

/// Fixed membership list.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    members: BTreeSet<(TenantId, PrincipalId)>,
}

impl StaticDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member.
    pub fn with_member(mut self, tenant: TenantId, id: PrincipalId) -> Self {
        self.members.insert((tenant, id));
        self
    }
}

#[async_trait]
impl GuildDirectory for StaticDirectory {
    async fn is_member(&self, tenant: TenantId, id: PrincipalId) -> bool {
        self.members.contains(&(tenant, id))
    }
}

/// Escalator that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEscalator;

#[async_trait]
impl PrivilegeEscalator for NoopEscalator {
    async fn apply_administrator_privilege(
        &self,
        tenant: TenantId,
        target: ResolvedTarget,
    ) -> CommandResult<()> {
        tracing::debug!(tenant = %tenant, target = %target, "administrator privilege not applied");
        Ok(())
    }

    async fn revoke_administrator_privilege(
        &self,
        tenant: TenantId,
        target: ResolvedTarget,
    ) -> CommandResult<()> {
        tracing::debug!(tenant = %tenant, target = %target, "administrator privilege not revoked");
        Ok(())
    }
}
