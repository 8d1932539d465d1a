//! The `perms`, `checkperms` and `showperms` commands
//!
//! `perms <add|remove> <target> <command> [subcommand]` edits the generic
//! permission table. Checks run in this order, and nothing is written until
//! all of them pass:
//!
//! 1. the invoker holds `perms`
//! 2. `command` is in the [`CommandCatalog`] (or is `*`)
//! 3. `target` parses (role mention, user mention, or bare id)
//! 4. the action is `add` or `remove`
//!
//! `*` means master access: the wildcard grant plus the platform's
//! administrator privilege, applied after the grant is persisted.

use guild_rbac::{parse_principal, Actor, PermissionReport, PrincipalKind, TenantId};
use guild_store::{PermissionStore, Snapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::{CommandCatalog, CommandTarget};
use crate::directory::{GuildDirectory, PrivilegeEscalator, ResolvedTarget};
use crate::error::{CommandError, CommandResult};

/// Command name guarding permission edits.
pub const PERMS_COMMAND: &str = "perms";
/// Command name guarding the self report.
pub const CHECKPERMS_COMMAND: &str = "checkperms";
/// Command name guarding the full dump.
pub const SHOWPERMS_COMMAND: &str = "showperms";

/// `perms` action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PermsAction {
    /// Grant.
    Add,
    /// Revoke.
    Remove,
}

impl PermsAction {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermsAction::Add => "add",
            PermsAction::Remove => "remove",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "add" => Some(PermsAction::Add),
            "remove" => Some(PermsAction::Remove),
            _ => None,
        }
    }
}

/// Raw `perms` invocation, as typed by the invoker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermsCommand {
    /// `add` or `remove`.
    pub action: String,
    /// Role mention, user mention or bare id.
    pub target: String,
    /// Command name, platform permission flag, or `*`.
    pub command: String,
    /// Optional subcommand; ignored for `*`.
    #[serde(default)]
    pub subcommand: Option<String>,
}

impl PermsCommand {
    /// Create an invocation without a subcommand.
    pub fn new(
        action: impl Into<String>,
        target: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            command: command.into(),
            subcommand: None,
        }
    }

    /// Set the subcommand.
    pub fn with_subcommand(mut self, subcommand: impl Into<String>) -> Self {
        self.subcommand = Some(subcommand.into());
        self
    }
}

/// Outcome of a successful `perms` invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PermsReply {
    /// Wildcard granted and administrator privilege applied.
    MasterAccessGranted { target: ResolvedTarget },
    /// Wildcard revoked and administrator privilege removed.
    MasterAccessRevoked { target: ResolvedTarget },
    /// The target held no wildcard.
    MasterAccessNotFound { target: ResolvedTarget },
    /// Command grant added.
    Granted {
        target: ResolvedTarget,
        command: String,
        subcommand: Option<String>,
    },
    /// Command grant removed.
    Revoked {
        target: ResolvedTarget,
        command: String,
        subcommand: Option<String>,
    },
    /// Nothing matched the revoke.
    NotFound {
        target: ResolvedTarget,
        command: String,
        subcommand: Option<String>,
    },
}

impl fmt::Display for PermsReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermsReply::MasterAccessGranted { target } => {
                write!(f, "Master access granted to {target}.")
            }
            PermsReply::MasterAccessRevoked { target } => {
                write!(f, "Master access revoked from {target}.")
            }
            PermsReply::MasterAccessNotFound { target } => {
                write!(f, "{target} does not hold master access.")
            }
            PermsReply::Granted {
                target,
                command,
                subcommand,
            } => write!(f, "{target} can now use {}.", describe(command, subcommand)),
            PermsReply::Revoked {
                target,
                command,
                subcommand,
            } => write!(f, "Removed {} from {target}.", describe(command, subcommand)),
            PermsReply::NotFound {
                target,
                command,
                subcommand,
            } => write!(
                f,
                "{target} has no permission for {}.",
                describe(command, subcommand)
            ),
        }
    }
}

fn describe(command: &str, subcommand: &Option<String>) -> String {
    match subcommand {
        Some(sub) => format!("`{command} {sub}`"),
        None => format!("`{command}`"),
    }
}

/// Handlers for the permission commands.
pub struct PermissionCommands {
    store: Arc<PermissionStore>,
    catalog: CommandCatalog,
    directory: Arc<dyn GuildDirectory>,
    escalator: Arc<dyn PrivilegeEscalator>,
}

impl fmt::Debug for PermissionCommands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionCommands")
            .field("catalog", &self.catalog)
            .finish()
    }
}

impl PermissionCommands {
    /// Create the handlers.
    pub fn new(
        store: Arc<PermissionStore>,
        catalog: CommandCatalog,
        directory: Arc<dyn GuildDirectory>,
        escalator: Arc<dyn PrivilegeEscalator>,
    ) -> Self {
        Self {
            store,
            catalog,
            directory,
            escalator,
        }
    }

    /// Get the command catalog.
    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    /// Run `perms`.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the invoker lacks `perms`
    /// - `UnknownCommand`, `InvalidTarget`, `UnknownAction` for bad input
    /// - `Store` if the change could not be persisted
    /// - `Privilege` if the platform refused the administrator change; the
    ///   wildcard bookkeeping has already been persisted at that point
    pub async fn execute(&self, actor: &Actor, request: PermsCommand) -> CommandResult<PermsReply> {
        require(&self.store, actor, PERMS_COMMAND, None).await?;

        let command = self.catalog.validate(&request.command)?;
        let target = self.resolve_target(actor.tenant, &request.target).await?;
        let action = PermsAction::parse(&request.action)
            .ok_or_else(|| CommandError::UnknownAction(request.action.clone()))?;

        info!(
            tenant = %actor.tenant,
            invoker = %actor.user,
            action = action.as_str(),
            target = %target,
            command = command.name(),
            subcommand = request.subcommand.as_deref().unwrap_or(""),
            "perms invoked"
        );

        let subcommand = request
            .subcommand
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match (action, command) {
            (PermsAction::Add, CommandTarget::Wildcard) => {
                self.store.grant_wildcard(actor.tenant, target.id).await?;
                self.escalator
                    .apply_administrator_privilege(actor.tenant, target)
                    .await?;
                Ok(PermsReply::MasterAccessGranted { target })
            }
            (PermsAction::Remove, CommandTarget::Wildcard) => {
                let outcome = self.store.revoke_wildcard(actor.tenant, target.id).await?;
                if !outcome.is_removed() {
                    return Ok(PermsReply::MasterAccessNotFound { target });
                }
                self.escalator
                    .revoke_administrator_privilege(actor.tenant, target)
                    .await?;
                Ok(PermsReply::MasterAccessRevoked { target })
            }
            (PermsAction::Add, command) => {
                let command = command.name().to_string();
                self.store
                    .grant(actor.tenant, target.id, &command, subcommand)
                    .await?;
                Ok(PermsReply::Granted {
                    target,
                    command,
                    subcommand: subcommand.map(str::to_string),
                })
            }
            (PermsAction::Remove, command) => {
                let command = command.name().to_string();
                let outcome = self
                    .store
                    .revoke(actor.tenant, target.id, &command, subcommand)
                    .await?;
                let subcommand = subcommand.map(str::to_string);
                Ok(if outcome.is_removed() {
                    PermsReply::Revoked {
                        target,
                        command,
                        subcommand,
                    }
                } else {
                    PermsReply::NotFound {
                        target,
                        command,
                        subcommand,
                    }
                })
            }
        }
    }

    /// Parse a target token, settling bare ids against the directory.
    ///
    /// A bare id that is a member of the tenant is a user; otherwise it is
    /// taken to be a role.
    pub async fn resolve_target(
        &self,
        tenant: TenantId,
        token: &str,
    ) -> CommandResult<ResolvedTarget> {
        let parsed = parse_principal(token)?;
        let target = match parsed.kind {
            PrincipalKind::User => ResolvedTarget::user(parsed.id),
            PrincipalKind::Role => ResolvedTarget::role(parsed.id),
            PrincipalKind::Unspecified => {
                if self.directory.is_member(tenant, parsed.id).await {
                    ResolvedTarget::user(parsed.id)
                } else {
                    ResolvedTarget::role(parsed.id)
                }
            }
        };
        Ok(target)
    }

    /// Run `checkperms`: what the invoker holds.
    pub async fn check(&self, actor: &Actor) -> CommandResult<PermissionReport> {
        require(&self.store, actor, CHECKPERMS_COMMAND, None).await?;
        Ok(self.store.report(actor).await)
    }

    /// Run `showperms`: the full snapshot, for operators.
    pub async fn show(&self, actor: &Actor) -> CommandResult<Snapshot> {
        require(&self.store, actor, SHOWPERMS_COMMAND, None).await?;
        Ok(self.store.snapshot().await)
    }
}

/// Fail with `Forbidden` unless `actor` may run `command`.
pub(crate) async fn require(
    store: &PermissionStore,
    actor: &Actor,
    command: &str,
    subcommand: Option<&str>,
) -> CommandResult<()> {
    if store.authorize(actor, command, subcommand).await {
        return Ok(());
    }
    debug!(
        tenant = %actor.tenant,
        user = %actor.user,
        command = command,
        "command refused"
    );
    Err(CommandError::forbidden(command, subcommand))
}
