//! Command catalog
//!
//! The names `perms` accepts: registered bot commands, platform permission
//! flags, and the `*` wildcard. Anything else is rejected before it can
//! reach the permission table.

use guild_rbac::{normalize_command, WILDCARD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{CommandError, CommandResult};

/// Commands the bot registers out of the box.
pub const BUILTIN_COMMANDS: &[&str] = &[
    "checkperms",
    "perms",
    "role",
    "setlogchannel",
    "showperms",
    "testlog",
];

/// Permission flags the platform recognizes on roles.
pub const PLATFORM_PERMISSION_FLAGS: &[&str] = &[
    "add_reactions",
    "administrator",
    "attach_files",
    "ban_members",
    "change_nickname",
    "connect",
    "create_instant_invite",
    "create_private_threads",
    "create_public_threads",
    "deafen_members",
    "embed_links",
    "external_emojis",
    "external_stickers",
    "kick_members",
    "manage_channels",
    "manage_emojis",
    "manage_emojis_and_stickers",
    "manage_events",
    "manage_guild",
    "manage_messages",
    "manage_nicknames",
    "manage_permissions",
    "manage_roles",
    "manage_threads",
    "manage_webhooks",
    "mention_everyone",
    "moderate_members",
    "move_members",
    "mute_members",
    "priority_speaker",
    "read_message_history",
    "read_messages",
    "request_to_speak",
    "send_messages",
    "send_messages_in_threads",
    "send_tts_messages",
    "speak",
    "stream",
    "use_application_commands",
    "use_embedded_activities",
    "use_external_emojis",
    "use_external_stickers",
    "use_voice_activation",
    "view_audit_log",
    "view_channel",
    "view_guild_insights",
];

/// Upper bound on completion suggestions.
pub const MAX_SUGGESTIONS: usize = 25;

/// A validated `perms` command argument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum CommandTarget {
    /// `*`: master access.
    Wildcard,
    /// A registered bot command.
    Command(String),
    /// A platform permission flag, stored like a command.
    PlatformPermission(String),
}

impl CommandTarget {
    /// The name stored in the permission table.
    pub fn name(&self) -> &str {
        match self {
            CommandTarget::Wildcard => WILDCARD,
            CommandTarget::Command(name) | CommandTarget::PlatformPermission(name) => name,
        }
    }
}

/// Registered command names plus platform permission flags.
#[derive(Debug, Clone, Default)]
pub struct CommandCatalog {
    commands: BTreeSet<String>,
    platform_permissions: BTreeSet<String>,
}

impl CommandCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with [`BUILTIN_COMMANDS`] and [`PLATFORM_PERMISSION_FLAGS`].
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register_all(BUILTIN_COMMANDS.iter().copied());
        catalog
            .platform_permissions
            .extend(PLATFORM_PERMISSION_FLAGS.iter().map(|f| f.to_string()));
        catalog
    }

    /// Register a command name.
    pub fn register(&mut self, name: &str) {
        let name = normalize_command(name);
        if !name.is_empty() {
            self.commands.insert(name);
        }
    }

    /// Register several command names.
    pub fn register_all<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            self.register(name);
        }
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }

    /// Check if a command is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains(&normalize_command(name))
    }

    /// Validate a `perms` command argument.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::UnknownCommand` for anything unrecognized.
    pub fn validate(&self, command: &str) -> CommandResult<CommandTarget> {
        let name = normalize_command(command);
        if name == WILDCARD {
            return Ok(CommandTarget::Wildcard);
        }
        if self.commands.contains(&name) {
            return Ok(CommandTarget::Command(name));
        }
        if self.platform_permissions.contains(&name) {
            return Ok(CommandTarget::PlatformPermission(name));
        }
        Err(CommandError::UnknownCommand(command.trim().to_string()))
    }

    /// Completion suggestions for a partial `perms` command argument.
    ///
    /// Commands first, then platform permissions, then `*`; case-insensitive
    /// substring match, capped at [`MAX_SUGGESTIONS`].
    pub fn suggest(&self, partial: &str) -> Vec<String> {
        let needle = partial.trim().to_lowercase();
        self.commands
            .iter()
            .chain(self.platform_permissions.iter())
            .filter(|name| name.contains(&needle))
            .cloned()
            .chain(std::iter::once(WILDCARD.to_string()))
            .take(MAX_SUGGESTIONS)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let catalog = CommandCatalog::builtin();

        assert_eq!(catalog.validate("*").unwrap(), CommandTarget::Wildcard);
        assert_eq!(
            catalog.validate(" Perms ").unwrap(),
            CommandTarget::Command("perms".to_string())
        );
        assert_eq!(
            catalog.validate("manage_roles").unwrap(),
            CommandTarget::PlatformPermission("manage_roles".to_string())
        );
        assert!(matches!(
            catalog.validate("launch"),
            Err(CommandError::UnknownCommand(name)) if name == "launch"
        ));
    }

    #[test]
    fn test_register() {
        let mut catalog = CommandCatalog::new();
        assert!(catalog.validate("perms").is_err());

        catalog.register("Deploy");
        catalog.register("  ");
        assert!(catalog.contains("deploy"));
        assert_eq!(catalog.commands().collect::<Vec<_>>(), vec!["deploy"]);
    }

    #[test]
    fn test_target_name() {
        assert_eq!(CommandTarget::Wildcard.name(), "*");
        assert_eq!(CommandTarget::Command("role".into()).name(), "role");
    }

    #[test]
    fn test_suggest() {
        let catalog = CommandCatalog::builtin();

        let perms = catalog.suggest("PERMS");
        assert_eq!(perms, vec!["checkperms", "perms", "showperms", "*"]);

        let all = catalog.suggest("");
        assert_eq!(all.len(), MAX_SUGGESTIONS);
        assert_eq!(all[0], "checkperms");
    }
}
