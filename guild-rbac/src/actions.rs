//! # Role actions
//!
//! Actions that can be performed against one specific role instance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Actions against a role instance.
///
/// Actions fall into two groups:
/// - **Structural**: `Create`, `Edit`, `Delete` change the role itself
/// - **Membership**: `Assign`, `Unassign` change who holds the role
///
/// Role managers are limited to membership actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleAction {
    /// Create the role.
    Create,

    /// Rename, recolor or re-delegate the role.
    Edit,

    /// Delete the role.
    Delete,

    /// Give the role to a member.
    Assign,

    /// Take the role away from a member.
    Unassign,
}

impl RoleAction {
    /// Get the string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleAction::Create => "create",
            RoleAction::Edit => "edit",
            RoleAction::Delete => "delete",
            RoleAction::Assign => "assign",
            RoleAction::Unassign => "unassign",
        }
    }

    /// Parse action from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive, supports aliases)
    ///
    /// # Returns
    ///
    /// `Some(RoleAction)` if valid, `None` otherwise
    ///
    /// # Example
    ///
    /// ```
    /// use guild_rbac::RoleAction;
    ///
    /// assert_eq!(RoleAction::parse("assign"), Some(RoleAction::Assign));
    /// assert_eq!(RoleAction::parse("Give"), Some(RoleAction::Assign)); // Alias
    /// assert_eq!(RoleAction::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "create" | "new" => Some(RoleAction::Create),
            "edit" | "update" | "modify" => Some(RoleAction::Edit),
            "delete" | "remove" => Some(RoleAction::Delete),
            "assign" | "give" => Some(RoleAction::Assign),
            "unassign" | "take" => Some(RoleAction::Unassign),
            _ => None,
        }
    }

    /// Check if this action changes role membership rather than the role.
    ///
    /// # Returns
    ///
    /// `true` for `Assign` and `Unassign`
    pub fn is_membership(&self) -> bool {
        matches!(self, RoleAction::Assign | RoleAction::Unassign)
    }
}

impl fmt::Display for RoleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
