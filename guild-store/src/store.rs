//! The permission store
//!
//! [`PermissionStore`] owns the [`AccessState`] behind one
//! `tokio::sync::RwLock` and keeps the snapshot in step with it.
//!
//! ## Locking
//!
//! Reads (`authorize`, `can_manage_role`, `query`, `report`, ...) share the
//! read lock. Mutations take the write lock and hold it across mutate and
//! persist, so readers never see a half-pruned table and snapshot writes
//! never interleave.
//!
//! ## Persistence
//!
//! A mutation only succeeds once its snapshot is written. When the write
//! fails the configured [`PersistFailurePolicy`] decides whether the
//! in-memory edit stays (`Keep`, retry with [`PermissionStore::flush`]) or
//! is undone (`Rollback`). A kept edit marks the store dirty, and the next
//! mutation writes the snapshot even when it changes nothing itself. A
//! revoke that finds nothing on a clean store never writes.

use guild_rbac::{
    normalize_command, normalize_subcommand, AccessState, Actor, CommandGrants, Decision,
    DelegationKind, PermissionReport, PrincipalId, RevokeOutcome, RoleAction, RoleDecision,
    RoleId, TenantId,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditKind, AuditSink, TracingAuditSink};
use crate::backend::{FileSnapshotBackend, SnapshotBackend};
use crate::config::{PersistFailurePolicy, StoreConfig};
use crate::error::StoreResult;
use crate::snapshot::Snapshot;

/// Shared handle to the access state and its snapshot.
///
/// Create one at startup with [`open`](Self::open), share it behind an
/// `Arc`, and call [`flush`](Self::flush) on shutdown.
#[derive(Debug)]
pub struct PermissionStore {
    state: RwLock<AccessState>,
    backend: Arc<dyn SnapshotBackend>,
    audit: Arc<dyn AuditSink>,
    config: StoreConfig,
    /// Memory holds edits the backend has not seen. Only touched under the
    /// write lock.
    dirty: AtomicBool,
}

impl PermissionStore {
    /// Open the file-backed store at `config.snapshot_path`.
    ///
    /// A missing file starts an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let backend = Arc::new(FileSnapshotBackend::new(config.snapshot_path.clone()));
        Self::with_backend(backend, config).await
    }

    /// Open a store over any backend.
    pub async fn with_backend(
        backend: Arc<dyn SnapshotBackend>,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        let state = match backend.load().await? {
            Some(snapshot) => snapshot.restore()?,
            None => AccessState::new(),
        };

        info!(
            backend = %backend.describe(),
            tenants = state.permissions.tenant_count(),
            "permission store loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
            backend,
            audit: Arc::new(TracingAuditSink),
            config,
            dirty: AtomicBool::new(false),
        })
    }

    /// Replace the audit sink.
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // =========================================================================
    // Grants
    // =========================================================================

    /// Grant `command` (optionally one subcommand) to a principal.
    ///
    /// Idempotent, and always persists.
    pub async fn grant(
        &self,
        tenant: TenantId,
        principal: PrincipalId,
        command: &str,
        subcommand: Option<&str>,
    ) -> StoreResult<()> {
        let command = normalize_command(command);
        let subcommand = subcommand.and_then(normalize_subcommand);

        self.mutate(|state| {
            state
                .permissions
                .grant(tenant, principal, &command, subcommand.as_deref());
            let change = AuditKind::Granted {
                tenant,
                principal,
                command: command.clone(),
                subcommand: subcommand.clone(),
            };
            ((), Some(change))
        })
        .await
    }

    /// Give a principal the full wildcard. Always persists.
    pub async fn grant_wildcard(
        &self,
        tenant: TenantId,
        principal: PrincipalId,
    ) -> StoreResult<()> {
        self.mutate(|state| {
            state.permissions.grant_wildcard(tenant, principal);
            ((), Some(AuditKind::WildcardGranted { tenant, principal }))
        })
        .await
    }

    /// Revoke a grant. Persists when something was removed or the store is
    /// dirty.
    pub async fn revoke(
        &self,
        tenant: TenantId,
        principal: PrincipalId,
        command: &str,
        subcommand: Option<&str>,
    ) -> StoreResult<RevokeOutcome> {
        let command = normalize_command(command);
        let subcommand = subcommand.and_then(normalize_subcommand);

        self.mutate(|state| {
            let outcome =
                state
                    .permissions
                    .revoke(tenant, principal, &command, subcommand.as_deref());
            let change = outcome.is_removed().then(|| AuditKind::Revoked {
                tenant,
                principal,
                command: command.clone(),
                subcommand: subcommand.clone(),
            });
            (outcome, change)
        })
        .await
    }

    /// Remove a principal's `*` entry. Persists when it existed or the store
    /// is dirty.
    pub async fn revoke_wildcard(
        &self,
        tenant: TenantId,
        principal: PrincipalId,
    ) -> StoreResult<RevokeOutcome> {
        self.mutate(|state| {
            let outcome = state.permissions.revoke_wildcard(tenant, principal);
            let change = outcome
                .is_removed()
                .then_some(AuditKind::WildcardRevoked { tenant, principal });
            (outcome, change)
        })
        .await
    }

    /// Copy of a principal's grants.
    pub async fn query(&self, tenant: TenantId, principal: PrincipalId) -> CommandGrants {
        self.state.read().await.permissions.query(tenant, principal)
    }

    /// Grant the wildcard to a tenant owner unless they already hold it.
    ///
    /// # Returns
    ///
    /// `true` if this call granted the wildcard, or wrote a grant that an
    /// earlier failed persist left in memory only
    pub async fn ensure_owner_wildcard(
        &self,
        tenant: TenantId,
        owner: PrincipalId,
    ) -> StoreResult<bool> {
        let (granted, persisted) = self
            .mutate_tracked(|state| {
                if state.permissions.has_wildcard(tenant, owner) {
                    return (false, None);
                }
                state.permissions.grant_wildcard(tenant, owner);
                (
                    true,
                    Some(AuditKind::WildcardGranted {
                        tenant,
                        principal: owner,
                    }),
                )
            })
            .await?;

        let granted = granted || persisted;
        if granted {
            info!(tenant = %tenant, owner = %owner, "owner wildcard bootstrapped");
        }
        Ok(granted)
    }

    // =========================================================================
    // Delegation
    // =========================================================================

    /// Make `principal` a manager of `role`. Always persists.
    pub async fn add_role_manager(&self, role: RoleId, principal: PrincipalId) -> StoreResult<()> {
        self.add_delegate(DelegationKind::Manager, role, principal)
            .await
    }

    /// Make `principal` an admin of `role`. Always persists.
    pub async fn add_role_admin(&self, role: RoleId, principal: PrincipalId) -> StoreResult<()> {
        self.add_delegate(DelegationKind::Admin, role, principal)
            .await
    }

    /// Remove a manager. Persists on change or when the store is dirty.
    pub async fn remove_role_manager(
        &self,
        role: RoleId,
        principal: PrincipalId,
    ) -> StoreResult<RevokeOutcome> {
        self.remove_delegate(DelegationKind::Manager, role, principal)
            .await
    }

    /// Remove an admin. Persists on change or when the store is dirty.
    pub async fn remove_role_admin(
        &self,
        role: RoleId,
        principal: PrincipalId,
    ) -> StoreResult<RevokeOutcome> {
        self.remove_delegate(DelegationKind::Admin, role, principal)
            .await
    }

    /// Check if `principal` manages `role`.
    pub async fn is_role_manager(&self, role: RoleId, principal: PrincipalId) -> bool {
        self.state
            .read()
            .await
            .delegations
            .is_role_manager(role, principal)
    }

    /// Check if `principal` administers `role`.
    pub async fn is_role_admin(&self, role: RoleId, principal: PrincipalId) -> bool {
        self.state
            .read()
            .await
            .delegations
            .is_role_admin(role, principal)
    }

    async fn add_delegate(
        &self,
        kind: DelegationKind,
        role: RoleId,
        principal: PrincipalId,
    ) -> StoreResult<()> {
        self.mutate(|state| {
            state.delegations.add(kind, role, principal);
            (
                (),
                Some(AuditKind::DelegateAdded {
                    kind,
                    role,
                    principal,
                }),
            )
        })
        .await
    }

    async fn remove_delegate(
        &self,
        kind: DelegationKind,
        role: RoleId,
        principal: PrincipalId,
    ) -> StoreResult<RevokeOutcome> {
        self.mutate(|state| {
            let outcome = state.delegations.remove(kind, role, principal);
            let change = outcome.is_removed().then_some(AuditKind::DelegateRemoved {
                kind,
                role,
                principal,
            });
            (outcome, change)
        })
        .await
    }

    // =========================================================================
    // Decisions
    // =========================================================================

    /// Check whether `actor` may run `command` (optionally `subcommand`).
    pub async fn authorize(&self, actor: &Actor, command: &str, subcommand: Option<&str>) -> bool {
        self.resolve(actor, command, subcommand).await.is_allowed()
    }

    /// Like [`authorize`](Self::authorize), with the grounds.
    pub async fn resolve(
        &self,
        actor: &Actor,
        command: &str,
        subcommand: Option<&str>,
    ) -> Decision {
        let decision = self
            .state
            .read()
            .await
            .resolver()
            .resolve(actor, command, subcommand);

        debug!(
            tenant = %actor.tenant,
            user = %actor.user,
            command = command,
            subcommand = subcommand.unwrap_or(""),
            decision = ?decision,
            "authorization resolved"
        );
        decision
    }

    /// Check whether `actor` may perform `action` on `role`.
    ///
    /// `None` stands for a structural action.
    pub async fn can_manage_role(
        &self,
        actor: &Actor,
        role: RoleId,
        action: Option<RoleAction>,
    ) -> bool {
        self.decide_role(actor, role, action).await.is_allowed()
    }

    /// Like [`can_manage_role`](Self::can_manage_role), with the reason.
    pub async fn decide_role(
        &self,
        actor: &Actor,
        role: RoleId,
        action: Option<RoleAction>,
    ) -> RoleDecision {
        let decision = self
            .state
            .read()
            .await
            .governance(self.config.governance)
            .decide(actor, role, action);

        debug!(
            tenant = %actor.tenant,
            user = %actor.user,
            role = %role,
            action = action.map(|a| a.as_str()).unwrap_or("structural"),
            decision = ?decision,
            "role governance resolved"
        );
        decision
    }

    /// Everything `actor` holds, for "check my permissions".
    pub async fn report(&self, actor: &Actor) -> PermissionReport {
        self.state.read().await.report(actor)
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// Capture the current state.
    pub async fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&*self.state.read().await)
    }

    /// Write the current state to the backend.
    ///
    /// Used on shutdown and to retry after a failed persist under
    /// [`PersistFailurePolicy::Keep`].
    pub async fn flush(&self) -> StoreResult<()> {
        // write lock so the save cannot interleave with a mutation's save
        let state = self.state.write().await;
        if let Err(err) = self.backend.save(&Snapshot::capture(&state)).await {
            self.dirty.store(true, Ordering::SeqCst);
            return Err(err);
        }
        self.dirty.store(false, Ordering::SeqCst);
        info!(backend = %self.backend.describe(), "permission store flushed");
        Ok(())
    }

    /// Apply `apply` under the write lock and persist if it reports a change
    /// or the store is dirty.
    async fn mutate<T, F>(&self, apply: F) -> StoreResult<T>
    where
        F: FnOnce(&mut AccessState) -> (T, Option<AuditKind>),
    {
        self.mutate_tracked(apply).await.map(|(value, _)| value)
    }

    /// Like [`mutate`](Self::mutate), also reporting whether the snapshot
    /// was written.
    async fn mutate_tracked<T, F>(&self, apply: F) -> StoreResult<(T, bool)>
    where
        F: FnOnce(&mut AccessState) -> (T, Option<AuditKind>),
    {
        let mut state = self.state.write().await;
        let before = match self.config.on_persist_failure {
            PersistFailurePolicy::Rollback => Some(state.clone()),
            PersistFailurePolicy::Keep => None,
        };

        let (value, change) = apply(&mut *state);
        let pending = self.dirty.load(Ordering::SeqCst);
        if change.is_none() && !pending {
            return Ok((value, false));
        }
        let event = change.as_ref().map_or("pending", AuditKind::as_str);

        if let Err(err) = self.backend.save(&Snapshot::capture(&state)).await {
            match before {
                Some(before) => {
                    *state = before;
                    warn!(event, error = %err, "persist failed, mutation rolled back");
                }
                None => {
                    self.dirty.store(true, Ordering::SeqCst);
                    warn!(event, error = %err, "persist failed, mutation kept in memory");
                }
            }
            return Err(err);
        }

        self.dirty.store(false, Ordering::SeqCst);
        info!(event, pending, "permission change persisted");
        if let Some(change) = change {
            self.audit.record(AuditEvent::new(change)).await;
        }
        Ok((value, true))
    }
}
