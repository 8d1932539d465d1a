//! Snapshot format
//!
//! The persisted form of [`AccessState`]:
//!
//! ```text
//! {
//!   "permissions":   { "<tenant>": { "<principal>": { "<command>": ["<subcommand>", ...] } } },
//!   "role_managers": { "<role>": ["<principal>", ...] },
//!   "role_admins":   { "<role>": ["<principal>", ...] }
//! }
//! ```
//!
//! Ids are written as strings and parsed back to integers on load. Empty
//! arrays and maps are never written, and are ignored when read. A grant made
//! without a subcommand is written as the empty string `""`.

use guild_rbac::{AccessState, DelegationKind, DelegationTable, PrincipalId, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

type WirePermissions = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<String>>>>;
type WireDelegations = BTreeMap<String, Vec<String>>;

/// Serialized form of the access state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// tenant → principal → command → subcommands
    #[serde(default)]
    pub permissions: WirePermissions,

    /// role → manager principals
    #[serde(default)]
    pub role_managers: WireDelegations,

    /// role → admin principals
    #[serde(default)]
    pub role_admins: WireDelegations,
}

impl Snapshot {
    /// Capture the state, pruning empty leaves on the way out.
    pub fn capture(state: &AccessState) -> Self {
        let mut permissions = WirePermissions::new();
        for (tenant, principals) in state.permissions.iter() {
            let mut wire_principals = BTreeMap::new();
            for (principal, grants) in principals {
                let commands: BTreeMap<String, Vec<String>> = grants
                    .iter()
                    .filter(|(_, subcommands)| !subcommands.is_empty())
                    .map(|(command, subcommands)| {
                        (command.clone(), subcommands.iter().cloned().collect())
                    })
                    .collect();
                if !commands.is_empty() {
                    wire_principals.insert(principal.to_string(), commands);
                }
            }
            if !wire_principals.is_empty() {
                permissions.insert(tenant.to_string(), wire_principals);
            }
        }

        Self {
            permissions,
            role_managers: capture_delegations(
                state.delegations.table(DelegationKind::Manager),
            ),
            role_admins: capture_delegations(state.delegations.table(DelegationKind::Admin)),
        }
    }

    /// Rebuild the state.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CorruptSnapshot` if any id is not numeric.
    pub fn restore(&self) -> StoreResult<AccessState> {
        let mut state = AccessState::new();

        for (tenant, principals) in &self.permissions {
            let tenant: TenantId = parse_id(tenant, "permissions")?;
            for (principal, commands) in principals {
                let principal: PrincipalId = parse_id(principal, "permissions")?;
                for (command, subcommands) in commands {
                    state
                        .permissions
                        .extend_grants(tenant, principal, command, subcommands);
                }
            }
        }
        state.permissions.compact();

        restore_delegations(
            &mut state,
            DelegationKind::Manager,
            &self.role_managers,
            "role_managers",
        )?;
        restore_delegations(
            &mut state,
            DelegationKind::Admin,
            &self.role_admins,
            "role_admins",
        )?;

        Ok(state)
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON. Blank input is an empty snapshot.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Check if the snapshot holds nothing.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.role_managers.is_empty() && self.role_admins.is_empty()
    }
}

fn capture_delegations(table: &DelegationTable) -> WireDelegations {
    table
        .iter()
        .filter(|(_, delegates)| !delegates.is_empty())
        .map(|(role, delegates)| {
            (
                role.to_string(),
                delegates.iter().map(ToString::to_string).collect(),
            )
        })
        .collect()
}

fn restore_delegations(
    state: &mut AccessState,
    kind: DelegationKind,
    wire: &WireDelegations,
    field: &'static str,
) -> StoreResult<()> {
    for (role, delegates) in wire {
        let role: PrincipalId = parse_id(role, field)?;
        for delegate in delegates {
            let delegate: PrincipalId = parse_id(delegate, field)?;
            state.delegations.add(kind, role, delegate);
        }
    }
    Ok(())
}

fn parse_id<T: FromStr>(value: &str, field: &'static str) -> StoreResult<T> {
    value.parse().map_err(|_| StoreError::CorruptSnapshot {
        field,
        value: value.to_string(),
    })
}
