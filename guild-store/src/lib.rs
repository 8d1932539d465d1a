//! # Guild Store
//!
//! Locked, persisted access state for guild command permissions.
//!
//! ## Overview
//!
//! The guild-store crate handles:
//! - **Store**: [`PermissionStore`], the shared handle every command goes through
//! - **Snapshot**: the JSON wire format and its capture/restore
//! - **Backends**: atomic file writes, plus an in-memory backend for tests
//! - **Audit**: one [`AuditEvent`] per persisted change
//! - **Config**: [`StoreConfig::from_env`]
//!
//! The model itself (tables, resolution, governance) lives in `guild-rbac`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use guild_rbac::{Actor, PrincipalId, TenantId};
//! use guild_store::{PermissionStore, StoreConfig};
//!
//! async fn example() -> guild_store::StoreResult<()> {
//!     let store = PermissionStore::open(StoreConfig::from_env()).await?;
//!
//!     let tenant = TenantId(1);
//!     store.ensure_owner_wildcard(tenant, PrincipalId(10)).await?;
//!     store.grant(tenant, PrincipalId(500), "role", Some("create")).await?;
//!
//!     let helper = Actor::new(tenant, PrincipalId(11)).with_roles([PrincipalId(500)]);
//!     assert!(store.authorize(&helper, "role", Some("create")).await);
//!
//!     store.flush().await
//! }
//! ```
//!
//! ## Environment
//!
//! - `GUILD_PERMISSIONS_FILE`: snapshot path (default `permissions.json`)
//! - `GUILD_PERSIST_FAILURE`: `keep` or `rollback`
//! - `GUILD_ADMIN_VIA_ROLES`: let held roles act as role managers/admins

pub mod audit;
pub mod backend;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod store;

// Re-export main types
pub use audit::{AuditEvent, AuditKind, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use backend::{FileSnapshotBackend, MemorySnapshotBackend, SnapshotBackend};
pub use config::{PersistFailurePolicy, StoreConfig, DEFAULT_SNAPSHOT_FILE};
pub use error::{StoreError, StoreResult};
pub use snapshot::Snapshot;
pub use store::PermissionStore;
