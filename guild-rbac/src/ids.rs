//! # Identifiers
//!
//! Numeric identifiers for tenants and principals.
//!
//! Tenants (guilds/workspaces) and principals (users and roles) are opaque
//! 64-bit integers. Users and roles share the [`PrincipalId`] type: the
//! caller hands the resolver both the acting user's id and the ids of every
//! role the user holds, and each is checked as an independent principal key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::identifier::IdentifierError;

/// Identifier of an isolated permission namespace (a guild or workspace).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TenantId(pub u64);

/// Identifier of a user or a role.
///
/// The two id spaces are assumed disjoint by the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct PrincipalId(pub u64);

/// Roles are principals; the alias documents intent at call sites.
pub type RoleId = PrincipalId;

impl TenantId {
    /// Get the raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl PrincipalId {
    /// Get the raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TenantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<u64> for PrincipalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a run of ASCII digits. Signs and anything else are rejected.
pub(crate) fn parse_digits(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_numeric(s: &str) -> Result<u64, IdentifierError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(IdentifierError::Empty);
    }
    parse_digits(trimmed).ok_or_else(|| IdentifierError::Malformed(trimmed.to_string()))
}

impl FromStr for TenantId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_numeric(s).map(Self)
    }
}

/// Parses a bare numeric id only. Use [`crate::parse_principal`] for mention
/// syntax.
impl FromStr for PrincipalId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_numeric(s).map(Self)
    }
}
