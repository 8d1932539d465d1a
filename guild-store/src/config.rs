//! Store configuration.
//!
//! Loaded from environment variables with defaults suitable for running the
//! bot from its working directory.

use guild_rbac::GovernancePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default snapshot file name.
pub const DEFAULT_SNAPSHOT_FILE: &str = "permissions.json";

/// What to do with an in-memory edit whose persist failed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PersistFailurePolicy {
    /// Keep the edit in memory; the caller may retry with `flush`.
    #[default]
    Keep,
    /// Restore the state from before the mutation.
    Rollback,
}

impl PersistFailurePolicy {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Some(Self::Keep),
            "rollback" => Some(Self::Rollback),
            _ => None,
        }
    }
}

/// Configuration for [`crate::PermissionStore`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Location of the JSON snapshot.
    pub snapshot_path: PathBuf,

    /// Behaviour when a persist fails.
    #[serde(default)]
    pub on_persist_failure: PersistFailurePolicy,

    /// Role governance tunables.
    #[serde(default)]
    pub governance: GovernancePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_FILE),
            on_persist_failure: PersistFailurePolicy::default(),
            governance: GovernancePolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Create a configuration for a snapshot file, other fields defaulted.
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GUILD_PERMISSIONS_FILE`: snapshot path (default: permissions.json)
    /// - `GUILD_PERSIST_FAILURE`: `keep` or `rollback` (default: keep)
    /// - `GUILD_ADMIN_VIA_ROLES`: probe held roles for delegation (default: false)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            snapshot_path: std::env::var("GUILD_PERMISSIONS_FILE")
                .map(PathBuf::from)
                .unwrap_or(default.snapshot_path),
            on_persist_failure: std::env::var("GUILD_PERSIST_FAILURE")
                .ok()
                .and_then(|s| PersistFailurePolicy::parse(&s))
                .unwrap_or(default.on_persist_failure),
            governance: GovernancePolicy {
                probe_held_roles: std::env::var("GUILD_ADMIN_VIA_ROLES")
                    .map(|s| s == "true" || s == "1")
                    .unwrap_or(default.governance.probe_held_roles),
            },
        }
    }

    /// Set the persist-failure policy.
    pub fn with_persist_failure(mut self, policy: PersistFailurePolicy) -> Self {
        self.on_persist_failure = policy;
        self
    }

    /// Set the governance policy.
    pub fn with_governance(mut self, governance: GovernancePolicy) -> Self {
        self.governance = governance;
        self
    }
}
