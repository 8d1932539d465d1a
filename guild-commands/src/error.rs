//! Error types for command handlers

use guild_rbac::IdentifierError;
use guild_store::StoreError;
use thiserror::Error;

/// Command handler error types.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The invoker lacks the permission the command requires
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Neither a registered command, a platform permission, nor `*`
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A user or role token could not be parsed
    #[error("Invalid target: {0}")]
    InvalidTarget(#[from] IdentifierError),

    /// `perms` action other than add/remove
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The store rejected or failed the change
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The platform refused the administrator privilege change
    #[error("Privilege change failed: {0}")]
    Privilege(String),
}

/// Result type for command handlers.
pub type CommandResult<T> = Result<T, CommandError>;

impl CommandError {
    /// Build a `Forbidden` error naming the missing permission.
    pub fn forbidden(command: &str, subcommand: Option<&str>) -> Self {
        match subcommand {
            Some(sub) => CommandError::Forbidden(format!("{command} {sub}")),
            None => CommandError::Forbidden(command.to_string()),
        }
    }

    /// Check if this is a fault on our side rather than bad input.
    pub fn is_server_error(&self) -> bool {
        matches!(self, CommandError::Store(_) | CommandError::Privilege(_))
    }

    /// Get error code for replies and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            CommandError::Forbidden(_) => "FORBIDDEN",
            CommandError::UnknownCommand(_) => "UNKNOWN_COMMAND",
            CommandError::InvalidTarget(_) => "INVALID_TARGET",
            CommandError::UnknownAction(_) => "UNKNOWN_ACTION",
            CommandError::Store(e) => e.error_code(),
            CommandError::Privilege(_) => "PRIVILEGE_ERROR",
        }
    }
}
