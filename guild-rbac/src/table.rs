//! # Permission table
//!
//! The generic grant table: `tenant → principal → command → {subcommand}`.
//!
//! ```text
//! Tenant 1
//!   ├─ Principal 10 ─→ "*"    → {"*"}           full wildcard
//!   ├─ Principal 11 ─→ "role" → {"create", "42"}
//!   └─ Principal 12 ─→ "perms" → {""}           the command, no subcommand
//! ```
//!
//! A grant made without a subcommand stores [`WHOLE_COMMAND`]. It keeps the
//! command present but matches only requests that name no subcommand.
//!
//! Empty leaves are never kept. Every structural mutation finishes with
//! [`PermissionTable::compact`], which removes empty subcommand sets, then
//! empty principals, then empty tenants.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::identifier::{normalize_command, normalize_subcommand};
use crate::ids::{PrincipalId, TenantId};

/// Command key of the full wildcard sentinel (`*` → `{"*"}`).
pub const WILDCARD: &str = "*";

/// Subcommand token recorded by a grant that names no subcommand.
///
/// Normalization never produces an empty token, so user input cannot
/// collide with it.
pub const WHOLE_COMMAND: &str = "";

/// Grants held by one principal: command → subcommand tokens.
pub type CommandGrants = BTreeMap<String, BTreeSet<String>>;

/// Grants held by every principal of one tenant.
pub type TenantGrants = BTreeMap<PrincipalId, CommandGrants>;

/// Outcome of a removal that may target an absent entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[must_use]
pub enum RevokeOutcome {
    /// The entry existed and was removed.
    Removed,
    /// Nothing matched; the table is unchanged.
    NotFound,
}

impl RevokeOutcome {
    /// Check whether anything was removed.
    pub fn is_removed(&self) -> bool {
        matches!(self, RevokeOutcome::Removed)
    }
}

/// Check whether a principal's grants contain the full-wildcard sentinel.
pub fn has_full_wildcard(grants: &CommandGrants) -> bool {
    grants
        .get(WILDCARD)
        .is_some_and(|subcommands| subcommands.contains(WILDCARD))
}

/// Check whether a principal's grants cover `command` (already normalized)
/// and, if given, `subcommand` (already normalized).
///
/// Any grant on the command covers a request without a subcommand. A
/// requested subcommand must be stored literally.
pub fn grants_cover(grants: &CommandGrants, command: &str, subcommand: Option<&str>) -> bool {
    match grants.get(command) {
        None => false,
        Some(subcommands) => subcommand.map_or(true, |sub| subcommands.contains(sub)),
    }
}

/// The tenant-scoped permission table.
///
/// # Example
///
/// ```
/// use guild_rbac::{PermissionTable, PrincipalId, RevokeOutcome, TenantId};
///
/// let mut table = PermissionTable::new();
/// let (tenant, user) = (TenantId(1), PrincipalId(10));
///
/// table.grant(tenant, user, "role", Some("create"));
/// assert!(table.query(tenant, user)["role"].contains("create"));
///
/// assert_eq!(table.revoke(tenant, user, "role", Some("create")), RevokeOutcome::Removed);
/// assert!(table.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTable {
    tenants: BTreeMap<TenantId, TenantGrants>,
}

impl PermissionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `command` (optionally narrowed to `subcommand`) to a principal.
    ///
    /// Idempotent. Without a subcommand the grant is stored as
    /// [`WHOLE_COMMAND`] and allows only the bare command.
    ///
    /// # Returns
    ///
    /// `true` if the table changed
    pub fn grant(
        &mut self,
        tenant: TenantId,
        principal: PrincipalId,
        command: &str,
        subcommand: Option<&str>,
    ) -> bool {
        let command = normalize_command(command);
        let token = subcommand
            .and_then(normalize_subcommand)
            .unwrap_or_else(|| WHOLE_COMMAND.to_string());

        self.tenants
            .entry(tenant)
            .or_default()
            .entry(principal)
            .or_default()
            .entry(command)
            .or_default()
            .insert(token)
    }

    /// Give a principal the full wildcard, replacing any previous `*` entry.
    ///
    /// # Returns
    ///
    /// `true` if the table changed
    pub fn grant_wildcard(&mut self, tenant: TenantId, principal: PrincipalId) -> bool {
        let grants = self
            .tenants
            .entry(tenant)
            .or_default()
            .entry(principal)
            .or_default();
        let sentinel = BTreeSet::from([WILDCARD.to_string()]);
        grants.insert(WILDCARD.to_string(), sentinel.clone()) != Some(sentinel)
    }

    /// Revoke a grant.
    ///
    /// With a subcommand only that token is removed, and the command goes
    /// away once its set is empty. Without one the whole command is removed.
    /// Empty principals and tenants are pruned afterwards.
    pub fn revoke(
        &mut self,
        tenant: TenantId,
        principal: PrincipalId,
        command: &str,
        subcommand: Option<&str>,
    ) -> RevokeOutcome {
        let command = normalize_command(command);
        let Some(grants) = self
            .tenants
            .get_mut(&tenant)
            .and_then(|principals| principals.get_mut(&principal))
        else {
            return RevokeOutcome::NotFound;
        };

        let removed = match subcommand.and_then(normalize_subcommand) {
            Some(token) => grants
                .get_mut(&command)
                .is_some_and(|subcommands| subcommands.remove(&token)),
            None => grants.remove(&command).is_some(),
        };

        if !removed {
            return RevokeOutcome::NotFound;
        }
        self.compact();
        RevokeOutcome::Removed
    }

    /// Remove the `*` command entry of a principal, whatever it holds.
    pub fn revoke_wildcard(&mut self, tenant: TenantId, principal: PrincipalId) -> RevokeOutcome {
        let removed = self
            .tenants
            .get_mut(&tenant)
            .and_then(|principals| principals.get_mut(&principal))
            .is_some_and(|grants| grants.remove(WILDCARD).is_some());

        if !removed {
            return RevokeOutcome::NotFound;
        }
        self.compact();
        RevokeOutcome::Removed
    }

    /// Copy of a principal's grants; empty if it holds none.
    pub fn query(&self, tenant: TenantId, principal: PrincipalId) -> CommandGrants {
        self.grants(tenant, principal).cloned().unwrap_or_default()
    }

    /// Borrow a principal's grants.
    pub fn grants(&self, tenant: TenantId, principal: PrincipalId) -> Option<&CommandGrants> {
        self.tenants
            .get(&tenant)
            .and_then(|principals| principals.get(&principal))
    }

    /// Check whether a principal holds the full wildcard in a tenant.
    pub fn has_wildcard(&self, tenant: TenantId, principal: PrincipalId) -> bool {
        self.grants(tenant, principal).is_some_and(has_full_wildcard)
    }

    /// Merge raw grants, as read from a snapshot, for one command.
    ///
    /// Tokens are normalized and a blank token restores [`WHOLE_COMMAND`]. An
    /// empty token list adds nothing, so a pruned entry never turns into a
    /// whole-command grant.
    pub fn extend_grants<I, S>(
        &mut self,
        tenant: TenantId,
        principal: PrincipalId,
        command: &str,
        subcommands: I,
    ) where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: BTreeSet<String> = subcommands
            .into_iter()
            .map(|s| normalize_subcommand(s.as_ref()).unwrap_or_default())
            .collect();
        if tokens.is_empty() {
            return;
        }
        self.tenants
            .entry(tenant)
            .or_default()
            .entry(principal)
            .or_default()
            .entry(normalize_command(command))
            .or_default()
            .extend(tokens);
    }

    /// Remove empty leaves at every level.
    ///
    /// # Returns
    ///
    /// The number of map entries removed
    pub fn compact(&mut self) -> usize {
        let mut pruned = 0;
        self.tenants.retain(|_, principals| {
            principals.retain(|_, grants| {
                let before = grants.len();
                grants.retain(|_, subcommands| !subcommands.is_empty());
                pruned += before - grants.len();
                let keep = !grants.is_empty();
                pruned += usize::from(!keep);
                keep
            });
            let keep = !principals.is_empty();
            pruned += usize::from(!keep);
            keep
        });
        pruned
    }

    /// Iterate over tenants and their grants.
    pub fn iter(&self) -> impl Iterator<Item = (TenantId, &TenantGrants)> {
        self.tenants.iter().map(|(tenant, grants)| (*tenant, grants))
    }

    /// Grants of every principal in one tenant.
    pub fn tenant(&self, tenant: TenantId) -> Option<&TenantGrants> {
        self.tenants.get(&tenant)
    }

    /// Check if the table holds no grants at all.
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Number of tenants with at least one grant.
    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: TenantId = TenantId(1);
    const P: PrincipalId = PrincipalId(10);

    #[test]
    fn test_grant_is_idempotent() {
        let mut table = PermissionTable::new();
        assert!(table.grant(T, P, "cmd", Some("sub")));
        let once = table.clone();
        assert!(!table.grant(T, P, "cmd", Some("sub")));
        assert_eq!(table, once);
        assert_eq!(table.query(T, P)["cmd"].len(), 1);
    }

    #[test]
    fn test_grant_normalizes_keys() {
        let mut table = PermissionTable::new();
        table.grant(T, P, "Role", Some("<@&42>"));
        table.grant(T, P, "ROLE", Some("Create"));

        let grants = table.query(T, P);
        assert_eq!(grants.len(), 1);
        assert!(grants["role"].contains("42"));
        assert!(grants["role"].contains("create"));
    }

    #[test]
    fn test_grant_without_subcommand_allows_bare_command_only() {
        let mut table = PermissionTable::new();
        table.grant(T, P, "role", None);
        table.grant(T, P, "setlog", Some("   "));

        let grants = table.query(T, P);
        assert!(grants_cover(&grants, "role", None));
        assert!(!grants_cover(&grants, "role", Some("create")));
        assert!(!grants_cover(&grants, "role", Some("500")));
        assert!(grants["setlog"].contains(WHOLE_COMMAND));
    }

    #[test]
    fn test_star_subcommand_matches_only_itself() {
        let mut table = PermissionTable::new();
        table.grant(T, P, "role", Some("*"));

        let grants = table.query(T, P);
        assert!(grants_cover(&grants, "role", Some("*")));
        assert!(!grants_cover(&grants, "role", Some("create")));
        assert!(!table.has_wildcard(T, P));
    }

    #[test]
    fn test_wildcard_sentinel() {
        let mut table = PermissionTable::new();
        table.grant(T, P, "*", Some("only-this"));
        assert!(!table.has_wildcard(T, P));

        assert!(table.grant_wildcard(T, P));
        assert!(table.has_wildcard(T, P));
        assert_eq!(table.query(T, P)[WILDCARD].len(), 1);
        assert!(!table.grant_wildcard(T, P));
    }

    #[test]
    fn test_revoke_subcommand_prunes_cascade() {
        let mut table = PermissionTable::new();
        table.grant(T, P, "role", Some("create"));
        table.grant(T, P, "role", Some("edit"));

        assert!(table.revoke(T, P, "role", Some("create")).is_removed());
        assert!(table.query(T, P)["role"].contains("edit"));

        assert!(table.revoke(T, P, "role", Some("EDIT")).is_removed());
        assert!(table.grants(T, P).is_none());
        assert!(table.tenant(T).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_revoke_whole_command_keeps_other_principals() {
        let mut table = PermissionTable::new();
        let other = PrincipalId(11);
        table.grant(T, P, "role", Some("create"));
        table.grant(T, other, "perms", None);

        assert_eq!(table.revoke(T, P, "role", None), RevokeOutcome::Removed);
        assert!(table.grants(T, P).is_none());
        assert!(table.tenant(T).is_some());
        assert_eq!(table.tenant_count(), 1);
    }

    #[test]
    fn test_revoke_not_found_leaves_table_unchanged() {
        let mut table = PermissionTable::new();
        table.grant(T, P, "role", Some("create"));
        let before = table.clone();

        assert_eq!(table.revoke(T, P, "role", Some("delete")), RevokeOutcome::NotFound);
        assert_eq!(table.revoke(T, P, "perms", None), RevokeOutcome::NotFound);
        assert_eq!(table.revoke(T, PrincipalId(99), "role", None), RevokeOutcome::NotFound);
        assert_eq!(table.revoke(TenantId(2), P, "role", None), RevokeOutcome::NotFound);
        assert_eq!(table.revoke_wildcard(T, P), RevokeOutcome::NotFound);
        assert_eq!(table, before);
    }

    #[test]
    fn test_revoke_wildcard_only_touches_star() {
        let mut table = PermissionTable::new();
        table.grant_wildcard(T, P);
        table.grant(T, P, "perms", None);

        assert!(table.revoke_wildcard(T, P).is_removed());
        assert!(!table.has_wildcard(T, P));
        assert!(table.query(T, P).contains_key("perms"));

        assert!(table.revoke(T, P, "perms", None).is_removed());
        assert!(table.is_empty());
    }

    #[test]
    fn test_extend_grants_skips_empty() {
        let mut table = PermissionTable::new();
        table.extend_grants(T, P, "role", Vec::<String>::new());
        assert!(table.is_empty());

        table.extend_grants(T, P, "Role", ["Create", "<@&5>"]);
        table.extend_grants(T, P, "perms", [""]);
        let grants = table.query(T, P);
        assert!(grants["role"].contains("create"));
        assert!(grants["role"].contains("5"));
        assert!(grants_cover(&grants, "perms", None));
        assert!(!grants_cover(&grants, "perms", Some("add")));
    }

    #[test]
    fn test_compact_counts_removed_entries() {
        let mut table = PermissionTable::new();
        table.grant(T, P, "role", Some("create"));
        table
            .tenants
            .get_mut(&T)
            .unwrap()
            .get_mut(&P)
            .unwrap()
            .get_mut("role")
            .unwrap()
            .clear();

        // command, principal and tenant
        assert_eq!(table.compact(), 3);
        assert!(table.is_empty());
        assert_eq!(table.compact(), 0);
    }
}
