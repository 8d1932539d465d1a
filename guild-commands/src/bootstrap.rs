//! Owner bootstrap
//!
//! Every tenant owner holds the wildcard. On startup the bot calls
//! [`ensure_owners`] for all tenants it knows about; when it joins a new
//! tenant it calls [`on_tenant_join`].

use guild_rbac::{PrincipalId, TenantId};
use guild_store::PermissionStore;
use tracing::{info, warn};

use crate::error::CommandResult;

/// What [`ensure_owners`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapSummary {
    /// Tenants whose owner wildcard was granted or made durable now.
    pub granted: Vec<TenantId>,
    /// Tenants whose owner already held it.
    pub unchanged: Vec<TenantId>,
    /// Tenants whose grant could not be persisted.
    pub failed: Vec<TenantId>,
}

/// Grant each owner the wildcard where missing.
///
/// A failure for one tenant is logged and does not stop the others.
pub async fn ensure_owners<I>(store: &PermissionStore, owners: I) -> BootstrapSummary
where
    I: IntoIterator<Item = (TenantId, PrincipalId)>,
{
    let mut summary = BootstrapSummary::default();
    for (tenant, owner) in owners {
        match store.ensure_owner_wildcard(tenant, owner).await {
            Ok(true) => summary.granted.push(tenant),
            Ok(false) => summary.unchanged.push(tenant),
            Err(e) => {
                warn!(tenant = %tenant, owner = %owner, error = %e, "owner bootstrap failed");
                summary.failed.push(tenant);
            }
        }
    }

    info!(
        granted = summary.granted.len(),
        unchanged = summary.unchanged.len(),
        failed = summary.failed.len(),
        "owner bootstrap complete"
    );
    summary
}

/// Grant a new tenant's owner the wildcard.
///
/// # Returns
///
/// `true` if this call granted the wildcard or made it durable
pub async fn on_tenant_join(
    store: &PermissionStore,
    tenant: TenantId,
    owner: PrincipalId,
) -> CommandResult<bool> {
    Ok(store.ensure_owner_wildcard(tenant, owner).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_rbac::Actor;
    use guild_store::{MemorySnapshotBackend, StoreConfig};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ensure_owners() {
        let backend = Arc::new(MemorySnapshotBackend::new());
        let store = PermissionStore::with_backend(backend.clone(), StoreConfig::default())
            .await
            .unwrap();
        store
            .grant_wildcard(TenantId(2), PrincipalId(20))
            .await
            .unwrap();

        let summary = ensure_owners(
            &store,
            [
                (TenantId(1), PrincipalId(10)),
                (TenantId(2), PrincipalId(20)),
            ],
        )
        .await;
        assert_eq!(summary.granted, vec![TenantId(1)]);
        assert_eq!(summary.unchanged, vec![TenantId(2)]);
        assert!(summary.failed.is_empty());
        assert_eq!(backend.writes(), 2);

        let owner = Actor::new(TenantId(1), PrincipalId(10));
        assert!(store.authorize(&owner, "perms", Some("add")).await);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_bootstrap() {
        let backend = Arc::new(MemorySnapshotBackend::new());
        let store = PermissionStore::with_backend(backend.clone(), StoreConfig::default())
            .await
            .unwrap();
        backend.set_fail_writes(true);

        let summary = ensure_owners(
            &store,
            [
                (TenantId(1), PrincipalId(10)),
                (TenantId(2), PrincipalId(20)),
            ],
        )
        .await;
        assert_eq!(summary.failed, vec![TenantId(1), TenantId(2)]);

        // the next run writes what the failed one kept in memory
        backend.set_fail_writes(false);
        let summary = ensure_owners(&store, [(TenantId(1), PrincipalId(10))]).await;
        assert_eq!(summary.granted, vec![TenantId(1)]);
        let reopened = PermissionStore::with_backend(backend.clone(), StoreConfig::default())
            .await
            .unwrap();
        for (tenant, owner) in [(1, 10), (2, 20)] {
            let owner = Actor::new(TenantId(tenant), PrincipalId(owner));
            assert!(reopened.authorize(&owner, "perms", None).await);
        }
    }

    #[tokio::test]
    async fn test_on_tenant_join() {
        let store = PermissionStore::with_backend(
            Arc::new(MemorySnapshotBackend::new()),
            StoreConfig::default(),
        )
        .await
        .unwrap();

        assert!(on_tenant_join(&store, TenantId(3), PrincipalId(30)).await.unwrap());
        assert!(!on_tenant_join(&store, TenantId(3), PrincipalId(30)).await.unwrap());
    }
}
