//! # Identifier parsing
//!
//! Principals arrive from the chat layer in several textual shapes: a bare
//! numeric id, a user mention (`<@123>` or `<@!123>`), or a role mention
//! (`<@&123>`). Everything that turns such a token into an id goes through
//! [`parse_principal`].
//!
//! Command and subcommand keys are normalized here as well so that grants
//! and lookups agree on one canonical form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{parse_digits, PrincipalId};

/// A principal token could not be turned into a numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The token was empty or whitespace.
    #[error("Identifier is empty")]
    Empty,

    /// The token was neither a mention nor a numeric id.
    #[error("Invalid identifier '{0}': use a mention or a numeric id")]
    Malformed(String),
}

/// What kind of principal a token named, as far as its syntax tells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// A user mention.
    User,
    /// A role mention.
    Role,
    /// A bare id; the caller must decide (see the command layer).
    Unspecified,
}

/// Result of parsing a principal token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParsedPrincipal {
    /// The numeric id.
    pub id: PrincipalId,
    /// The kind implied by the syntax.
    pub kind: PrincipalKind,
}

/// Parse a principal token.
///
/// # Arguments
///
/// * `token` - A role mention, user mention or bare numeric id
///
/// # Returns
///
/// The parsed id and the kind implied by its syntax.
///
/// # Example
///
/// ```
/// use guild_rbac::{parse_principal, PrincipalId, PrincipalKind};
///
/// let parsed = parse_principal("<@&42>").unwrap();
/// assert_eq!(parsed.id, PrincipalId(42));
/// assert_eq!(parsed.kind, PrincipalKind::Role);
///
/// assert!(parse_principal("not-an-id").is_err());
/// ```
pub fn parse_principal(token: &str) -> Result<ParsedPrincipal, IdentifierError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(IdentifierError::Empty);
    }

    let (digits, kind) = if let Some(id) = role_mention(token) {
        (id, PrincipalKind::Role)
    } else if let Some(inner) = token.strip_prefix("<@").and_then(|t| t.strip_suffix('>')) {
        (inner.strip_prefix('!').unwrap_or(inner), PrincipalKind::User)
    } else {
        (token, PrincipalKind::Unspecified)
    };

    let id = parse_digits(digits).ok_or_else(|| IdentifierError::Malformed(token.to_string()))?;

    Ok(ParsedPrincipal {
        id: PrincipalId(id),
        kind,
    })
}

fn role_mention(token: &str) -> Option<&str> {
    token.strip_prefix("<@&").and_then(|t| t.strip_suffix('>'))
}

/// Canonical form of a command key: trimmed and lowercased.
pub fn normalize_command(command: &str) -> String {
    command.trim().to_lowercase()
}

/// Canonical form of a subcommand token.
///
/// A well-formed role mention becomes the role's numeric id; anything else is
/// trimmed and lowercased. A malformed mention is kept literally so that it
/// can only match an identical stored token.
///
/// Returns `None` for empty input, which callers treat as "no subcommand".
pub fn normalize_subcommand(subcommand: &str) -> Option<String> {
    let token = subcommand.trim();
    if token.is_empty() {
        return None;
    }
    if let Some(id) = role_mention(token).and_then(parse_digits) {
        return Some(id.to_string());
    }
    Some(token.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_mention() {
        let parsed = parse_principal("<@&123>").unwrap();
        assert_eq!(parsed.id, PrincipalId(123));
        assert_eq!(parsed.kind, PrincipalKind::Role);
    }

    #[test]
    fn test_parse_user_mentions() {
        assert_eq!(parse_principal("<@55>").unwrap().kind, PrincipalKind::User);
        let nick = parse_principal("<@!55>").unwrap();
        assert_eq!(nick.id, PrincipalId(55));
        assert_eq!(nick.kind, PrincipalKind::User);
    }

    #[test]
    fn test_parse_bare_id() {
        let parsed = parse_principal(" 987 ").unwrap();
        assert_eq!(parsed.id, PrincipalId(987));
        assert_eq!(parsed.kind, PrincipalKind::Unspecified);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_principal("   "), Err(IdentifierError::Empty));
        assert_eq!(
            parse_principal("<@&abc>"),
            Err(IdentifierError::Malformed("<@&abc>".to_string()))
        );
        assert!(parse_principal("<@>").is_err());
        assert!(parse_principal("@everyone").is_err());
        assert!(parse_principal("+5").is_err());
        assert!(parse_principal("<@&+5>").is_err());
        assert!(parse_principal("<@!-5>").is_err());
    }

    #[test]
    fn test_normalize_subcommand() {
        assert_eq!(normalize_subcommand("<@&123>"), Some("123".to_string()));
        assert_eq!(normalize_subcommand("  Create "), Some("create".to_string()));
        assert_eq!(normalize_subcommand(""), None);
        assert_eq!(normalize_subcommand("<@&x1>"), Some("<@&x1>".to_string()));
        assert_eq!(normalize_subcommand("<@&+5>"), Some("<@&+5>".to_string()));
    }

    #[test]
    fn test_normalize_command() {
        assert_eq!(normalize_command(" SetLogChannel"), "setlogchannel");
        assert_eq!(normalize_command("*"), "*");
    }
}
