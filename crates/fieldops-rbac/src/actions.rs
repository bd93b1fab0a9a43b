//! # Actions
//!
//! The verbs a subject can request against a field-operations resource.
//! Role permissions pair one of these with a [`ResourceType`], and direct
//! or team grants are checked against them through
//! [`GrantScope::covers`].
//!
//! [`ResourceType`]: crate::resources::ResourceType
//! [`GrantScope::covers`]: crate::grants::GrantScope::covers

use serde::{Deserialize, Serialize};

/// Operation requested on a resource.
///
/// Field work adds three verbs to the usual CRUD set: `Assign` dispatches
/// devices, tasks or people; `Execute` runs a task, policy or device
/// command; `Participate` joins a project or task as a contributor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// View a single record.
    Read,
    /// Create a record.
    Create,
    /// Edit a record.
    Update,
    /// Remove a record permanently.
    Delete,
    /// Browse or search records.
    List,
    /// Download data out of the platform.
    Export,
    /// Bulk-load data into the platform.
    Import,
    /// Dispatch devices, tasks or people.
    Assign,
    /// Administer the resource. Implies every other action.
    Manage,
    /// Sign off a submission or change.
    Approve,
    /// Run a task, policy or device command.
    Execute,
    /// Contribute to a project or task.
    Participate,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 12] = [
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::List,
        Action::Export,
        Action::Import,
        Action::Assign,
        Action::Manage,
        Action::Approve,
        Action::Execute,
        Action::Participate,
    ];

    /// Wire name used in permission strings such as `"device:assign"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::List => "list",
            Action::Export => "export",
            Action::Import => "import",
            Action::Assign => "assign",
            Action::Manage => "manage",
            Action::Approve => "approve",
            Action::Execute => "execute",
            Action::Participate => "participate",
        }
    }

    /// Parse a wire name, case-insensitively. A handful of verbs used by
    /// the mobile and back-office clients are accepted as aliases.
    ///
    /// ```
    /// use fieldops_rbac::actions::Action;
    ///
    /// assert_eq!(Action::parse("Assign"), Some(Action::Assign));
    /// assert_eq!(Action::parse("dispatch"), Some(Action::Assign));
    /// assert_eq!(Action::parse("join"), Some(Action::Participate));
    /// assert_eq!(Action::parse("teleport"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        if let Some(action) = Self::ALL.into_iter().find(|a| a.as_str() == lowered) {
            return Some(action);
        }
        let alias = match lowered.as_str() {
            "view" => Action::Read,
            "edit" => Action::Update,
            "remove" => Action::Delete,
            "search" => Action::List,
            "download" => Action::Export,
            "upload" => Action::Import,
            "dispatch" => Action::Assign,
            "admin" => Action::Manage,
            "run" => Action::Execute,
            "join" => Action::Participate,
            _ => return None,
        };
        Some(alias)
    }

    /// Every action as a vector.
    pub fn all() -> Vec<Self> {
        Self::ALL.to_vec()
    }

    /// Whether holding `self` also grants `other`.
    ///
    /// `Manage` grants everything. Any write grants `Read`, and running
    /// work grants taking part in it.
    ///
    /// ```
    /// use fieldops_rbac::actions::Action;
    ///
    /// assert!(Action::Manage.implies(Action::Approve));
    /// assert!(Action::Create.implies(Action::Read));
    /// assert!(Action::Execute.implies(Action::Participate));
    /// assert!(!Action::Participate.implies(Action::Execute));
    /// ```
    pub fn implies(&self, other: Action) -> bool {
        if *self == other {
            return true;
        }
        match self {
            Action::Manage => true,
            Action::Create | Action::Update | Action::Delete => other == Action::Read,
            Action::Execute => other == Action::Participate,
            _ => false,
        }
    }

    /// Whether the action can change platform state.
    pub fn mutates(&self) -> bool {
        !matches!(self, Action::Read | Action::List | Action::Export)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip_through_parse() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.as_str()), Some(action));
            assert_eq!(Action::parse(&action.as_str().to_uppercase()), Some(action));
        }
    }

    #[test]
    fn test_client_aliases() {
        assert_eq!(Action::parse(" view "), Some(Action::Read));
        assert_eq!(Action::parse("dispatch"), Some(Action::Assign));
        assert_eq!(Action::parse("run"), Some(Action::Execute));
        assert_eq!(Action::parse("patch"), None);
    }

    #[test]
    fn test_manage_implies_everything() {
        assert!(Action::ALL.iter().all(|a| Action::Manage.implies(*a)));
    }

    #[test]
    fn test_field_work_implications() {
        assert!(Action::Execute.implies(Action::Participate));
        assert!(Action::Delete.implies(Action::Read));
        assert!(!Action::Assign.implies(Action::Read));
        assert!(!Action::Read.implies(Action::List));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Action::Participate).unwrap();
        assert_eq!(json, "\"participate\"");
    }

    #[test]
    fn test_mutates() {
        assert!(Action::Assign.mutates());
        assert!(!Action::Export.mutates());
    }
}
