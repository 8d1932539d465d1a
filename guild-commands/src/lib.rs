//! # Guild Commands
//!
//! Command handlers that sit between the chat platform and the permission
//! store.
//!
//! ## Overview
//!
//! The guild-commands crate handles:
//! - **perms**: grant and revoke commands, subcommands and master access
//! - **checkperms / showperms**: permission reports
//! - **role**: per-role governance for create, edit, delete, assign and unassign
//! - **Bootstrap**: the tenant owner always holds the wildcard
//!
//! Platform calls stay outside: membership lookups go through
//! [`GuildDirectory`], administrator privilege changes through
//! [`PrivilegeEscalator`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use guild_commands::{
//!     CommandCatalog, NoopEscalator, PermissionCommands, PermsCommand, StaticDirectory,
//! };
//! use guild_rbac::{Actor, PrincipalId, TenantId};
//! use guild_store::{PermissionStore, StoreConfig};
//! use std::sync::Arc;
//!
//! async fn example() -> guild_commands::CommandResult<()> {
//!     let store = Arc::new(PermissionStore::open(StoreConfig::from_env()).await?);
//!     guild_commands::on_tenant_join(&store, TenantId(1), PrincipalId(10)).await?;
//!
//!     let perms = PermissionCommands::new(
//!         store,
//!         CommandCatalog::builtin(),
//!         Arc::new(StaticDirectory::new()),
//!         Arc::new(NoopEscalator),
//!     );
//!
//!     let owner = Actor::new(TenantId(1), PrincipalId(10));
//!     let reply = perms
//!         .execute(&owner, PermsCommand::new("add", "<@&500>", "role").with_subcommand("create"))
//!         .await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod catalog;
pub mod directory;
pub mod error;
pub mod perms;
pub mod roles;

// Re-export main types
pub use bootstrap::{ensure_owners, on_tenant_join, BootstrapSummary};
pub use catalog::{CommandCatalog, CommandTarget, BUILTIN_COMMANDS, PLATFORM_PERMISSION_FLAGS};
pub use directory::{
    GuildDirectory, NoopEscalator, PrivilegeEscalator, ResolvedTarget, StaticDirectory, TargetKind,
};
pub use error::{CommandError, CommandResult};
pub use perms::{PermissionCommands, PermsAction, PermsCommand, PermsReply};
pub use roles::{parse_role_list, BatchCheck, DelegateUpdate, RoleCommands};
