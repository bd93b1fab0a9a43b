//! # Grant Scopes
//!
//! Scopes carried by direct and team resource assignments. A grant scope is
//! a coarse access level on one resource instance, ordered from narrowest to
//! broadest: `Read < Participate < Execute < Update < Manage`.

use serde::{Deserialize, Serialize};

use crate::actions::Action;

/// Access level granted by a resource assignment.
///
/// A broader scope covers every action a narrower one covers.
///
/// # Example
///
/// ```
/// use fieldops_rbac::{Action, GrantScope};
///
/// assert!(GrantScope::Update.covers(Action::Update));
/// assert!(GrantScope::Update.covers(Action::Read));
/// assert!(!GrantScope::Update.covers(Action::Delete));
/// assert!(GrantScope::Manage.covers(Action::Delete));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    /// View the resource.
    Read = 1,
    /// Contribute to the resource as a participant.
    Participate = 2,
    /// Run the resource's tasks or commands.
    Execute = 3,
    /// Modify the resource.
    Update = 4,
    /// Full control, including deletion.
    Manage = 5,
}

impl GrantScope {
    /// The narrowest grant scope that covers `action`.
    pub fn required_for(action: Action) -> Self {
        match action {
            Action::Read | Action::List | Action::Export => GrantScope::Read,
            Action::Participate => GrantScope::Participate,
            Action::Execute => GrantScope::Execute,
            Action::Update | Action::Import | Action::Assign => GrantScope::Update,
            Action::Create | Action::Delete | Action::Approve | Action::Manage => {
                GrantScope::Manage
            }
        }
    }

    /// Whether this scope covers `action`.
    pub fn covers(&self, action: Action) -> bool {
        *self >= Self::required_for(action)
    }

    /// Get string representation of the scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantScope::Read => "read",
            GrantScope::Participate => "participate",
            GrantScope::Execute => "execute",
            GrantScope::Update => "update",
            GrantScope::Manage => "manage",
        }
    }

    /// Parse scope from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read" => Some(GrantScope::Read),
            "participate" => Some(GrantScope::Participate),
            "execute" => Some(GrantScope::Execute),
            "update" => Some(GrantScope::Update),
            "manage" => Some(GrantScope::Manage),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_ordering() {
        assert!(GrantScope::Manage > GrantScope::Update);
        assert!(GrantScope::Update > GrantScope::Execute);
        assert!(GrantScope::Execute > GrantScope::Participate);
        assert!(GrantScope::Participate > GrantScope::Read);
    }

    #[test]
    fn test_update_coverage() {
        let scope = GrantScope::Update;
        assert!(scope.covers(Action::Update));
        assert!(scope.covers(Action::Read));
        assert!(scope.covers(Action::Execute));
        assert!(scope.covers(Action::Participate));
        assert!(!scope.covers(Action::Delete));
        assert!(!scope.covers(Action::Manage));
    }

    #[test]
    fn test_read_coverage() {
        let scope = GrantScope::Read;
        assert!(scope.covers(Action::Read));
        assert!(scope.covers(Action::List));
        assert!(!scope.covers(Action::Participate));
        assert!(!scope.covers(Action::Update));
    }

    #[test]
    fn test_manage_covers_everything() {
        for action in Action::all() {
            assert!(GrantScope::Manage.covers(action));
        }
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(GrantScope::parse("UPDATE"), Some(GrantScope::Update));
        assert_eq!(GrantScope::parse("participate"), Some(GrantScope::Participate));
        assert_eq!(GrantScope::parse("delete"), None);
    }

    #[test]
    fn test_scope_serializes_snake_case() {
        let json = serde_json::to_string(&GrantScope::Participate).unwrap();
        assert_eq!(json, "\"participate\"");
        let parsed: GrantScope = serde_json::from_str("\"manage\"").unwrap();
        assert_eq!(parsed, GrantScope::Manage);
    }
}
