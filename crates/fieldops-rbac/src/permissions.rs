//! # Permissions
//!
//! A [`Permission`] names one action on one resource class, written
//! `resource:action`. Roles carry a [`PermissionSet`]: a sorted collection
//! of entries, each either a concrete permission, a resource wildcard
//! (`device:*`) or the global wildcard (`*`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::actions::Action;
use crate::resources::ResourceType;

/// Entry granting every action on every resource.
///
/// Only roles at the top of the hierarchy may carry it; the role registry
/// enforces that.
pub const WILDCARD: &str = "*";

/// Entry that is neither `*`, `resource:*` nor a known `resource:action`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognised permission entry: {0}")]
pub struct UnknownPermission(pub String);

/// One action on one resource class.
///
/// ```
/// use fieldops_rbac::{Action, Permission, ResourceType};
///
/// let perm = Permission::new(ResourceType::Task, Action::Assign);
/// assert_eq!(perm.to_string(), "task:assign");
/// assert_eq!(Permission::parse("task.assign"), Some(perm));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Permission {
    /// Resource class
    pub resource: ResourceType,
    /// Requested action
    pub action: Action,
}

impl Permission {
    /// Create a permission.
    pub fn new(resource: ResourceType, action: Action) -> Self {
        Self { resource, action }
    }

    /// Parse `resource:action`. A dot is accepted as separator too, since
    /// role fixtures exported from the admin console use `resource.action`.
    pub fn parse(s: &str) -> Option<Self> {
        let (resource, action) = s.split_once(':').or_else(|| s.split_once('.'))?;
        Some(Self::new(
            ResourceType::parse(resource)?,
            Action::parse(action)?,
        ))
    }

    /// Whether holding `self` grants `other`.
    pub fn grants(&self, other: &Permission) -> bool {
        self.resource == other.resource && self.action.implies(other.action)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

/// One entry of a [`PermissionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PermissionEntry {
    /// `*`
    All,
    /// `resource:*`
    Resource(ResourceType),
    /// `resource:action`
    Exact(Permission),
}

impl PermissionEntry {
    /// Parse an entry; `None` for anything unrecognised.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s == WILDCARD {
            return Some(PermissionEntry::All);
        }
        if let Some(resource) = s.strip_suffix(":*").or_else(|| s.strip_suffix(".*")) {
            return ResourceType::parse(resource).map(PermissionEntry::Resource);
        }
        Permission::parse(s).map(PermissionEntry::Exact)
    }

    /// Whether this entry grants `permission`.
    pub fn grants(&self, permission: &Permission) -> bool {
        match self {
            PermissionEntry::All => true,
            PermissionEntry::Resource(resource) => *resource == permission.resource,
            PermissionEntry::Exact(held) => held.grants(permission),
        }
    }
}

impl fmt::Display for PermissionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionEntry::All => f.write_str(WILDCARD),
            PermissionEntry::Resource(resource) => write!(f, "{}:{}", resource, WILDCARD),
            PermissionEntry::Exact(permission) => permission.fmt(f),
        }
    }
}

/// Base permission set of a role.
///
/// Entries are kept sorted so that lookups, and every explain trace built
/// from them, are deterministic. Serialized as a list of entry strings;
/// deserializing fails on any entry that does not parse.
///
/// ```
/// use fieldops_rbac::{Action, Permission, PermissionSet, ResourceType};
///
/// let set = PermissionSet::from_strings(&["project:update", "device:*"]);
/// assert!(set.has(&Permission::new(ResourceType::Project, Action::Read)));
/// assert!(set.has(&Permission::new(ResourceType::Device, Action::Delete)));
/// assert!(!set.has(&Permission::new(ResourceType::Project, Action::Delete)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PermissionSet {
    entries: BTreeSet<PermissionEntry>,
}

impl PermissionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only the global wildcard.
    pub fn all_access() -> Self {
        let mut set = Self::new();
        set.entries.insert(PermissionEntry::All);
        set
    }

    /// Build from entry strings. Unrecognised entries are dropped with a
    /// warning; use [`PermissionSet::try_from_strings`] to reject them.
    pub fn from_strings(entries: &[&str]) -> Self {
        entries
            .iter()
            .filter_map(|s| {
                let entry = PermissionEntry::parse(s);
                if entry.is_none() {
                    warn!(entry = %s, "Dropping unrecognised permission entry");
                }
                entry
            })
            .collect()
    }

    /// Build from entry strings, failing on the first one that does not
    /// parse.
    ///
    /// ```
    /// use fieldops_rbac::{PermissionSet, UnknownPermission};
    ///
    /// assert!(PermissionSet::try_from_strings(&["task:assign"]).is_ok());
    /// assert_eq!(
    ///     PermissionSet::try_from_strings(&["task:assign", "task:fly"]),
    ///     Err(UnknownPermission("task:fly".to_string()))
    /// );
    /// ```
    pub fn try_from_strings<S: AsRef<str>>(entries: &[S]) -> Result<Self, UnknownPermission> {
        entries
            .iter()
            .map(|s| {
                let s = s.as_ref();
                PermissionEntry::parse(s).ok_or_else(|| UnknownPermission(s.trim().to_string()))
            })
            .collect()
    }

    /// Add a concrete permission.
    pub fn add(&mut self, permission: Permission) {
        self.entries.insert(PermissionEntry::Exact(permission));
    }

    /// Grant every action on one resource class.
    pub fn add_resource_wildcard(&mut self, resource: ResourceType) {
        self.entries.insert(PermissionEntry::Resource(resource));
    }

    /// Whether the set carries the global wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.entries.contains(&PermissionEntry::All)
    }

    /// Whether any entry grants `permission`.
    pub fn has(&self, permission: &Permission) -> bool {
        self.matching_entry(permission).is_some()
    }

    /// The first entry, in sorted order, that grants `permission`.
    ///
    /// Wildcards sort ahead of concrete entries, so `*` wins over
    /// `project:*`, which wins over `project:manage`.
    pub fn matching_entry(&self, permission: &Permission) -> Option<PermissionEntry> {
        self.entries.iter().copied().find(|e| e.grants(permission))
    }

    /// Iterate over the entries in sorted order.
    pub fn entries(&self) -> impl Iterator<Item = &PermissionEntry> {
        self.entries.iter()
    }

    /// Merge another set into this one.
    pub fn merge(&mut self, other: &PermissionSet) {
        self.entries.extend(other.entries.iter().copied());
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<PermissionEntry> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        iter.into_iter().map(PermissionEntry::Exact).collect()
    }
}

impl TryFrom<Vec<String>> for PermissionSet {
    type Error = UnknownPermission;

    fn try_from(entries: Vec<String>) -> Result<Self, Self::Error> {
        Self::try_from_strings(entries.as_slice())
    }
}

impl From<PermissionSet> for Vec<String> {
    fn from(set: PermissionSet) -> Self {
        set.entries.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(resource: ResourceType, action: Action) -> Permission {
        Permission::new(resource, action)
    }

    #[test]
    fn test_parse_accepts_both_separators() {
        let expected = perm(ResourceType::Policy, Action::Execute);
        assert_eq!(Permission::parse("policy:execute"), Some(expected));
        assert_eq!(Permission::parse("policies.run"), Some(expected));
        assert_eq!(Permission::parse("policy"), None);
        assert_eq!(Permission::parse("spaceship:read"), None);
    }

    #[test]
    fn test_entry_parsing() {
        assert_eq!(PermissionEntry::parse("*"), Some(PermissionEntry::All));
        assert_eq!(
            PermissionEntry::parse("device:*"),
            Some(PermissionEntry::Resource(ResourceType::Device))
        );
        assert_eq!(PermissionEntry::parse("device:*:extra"), None);
        assert_eq!(PermissionEntry::parse("device:*").unwrap().to_string(), "device:*");
    }

    #[test]
    fn test_supervisor_style_set() {
        let set = PermissionSet::from_strings(&["project:update", "task:assign", "form:read"]);
        assert!(set.has(&perm(ResourceType::Project, Action::Update)));
        assert!(set.has(&perm(ResourceType::Project, Action::Read)));
        assert!(set.has(&perm(ResourceType::Task, Action::Assign)));
        assert!(!set.has(&perm(ResourceType::Task, Action::Read)));
        assert!(!set.has(&perm(ResourceType::Project, Action::Delete)));
        assert!(!set.has(&perm(ResourceType::Device, Action::Read)));
    }

    #[test]
    fn test_manage_entry_implies_other_actions() {
        let set = PermissionSet::from_strings(&["task:manage"]);
        assert_eq!(
            set.matching_entry(&perm(ResourceType::Task, Action::Approve)),
            Some(PermissionEntry::Exact(perm(ResourceType::Task, Action::Manage)))
        );
    }

    #[test]
    fn test_wildcards_win_matching_order() {
        let set = PermissionSet::from_strings(&["device:read", "device:*"]);
        assert_eq!(
            set.matching_entry(&perm(ResourceType::Device, Action::Read)),
            Some(PermissionEntry::Resource(ResourceType::Device))
        );

        let mut all = PermissionSet::all_access();
        all.merge(&set);
        assert!(all.is_wildcard());
        assert_eq!(
            all.matching_entry(&perm(ResourceType::AuditLog, Action::Delete)),
            Some(PermissionEntry::All)
        );
    }

    #[test]
    fn test_unrecognised_entries_dropped() {
        let set = PermissionSet::from_strings(&["project:read", "bogus", "task:fly"]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_strict_constructor_names_rejected_entry() {
        let set = PermissionSet::try_from_strings(&["project:read", " device:* "]).unwrap();
        assert_eq!(set.len(), 2);

        let err =
            PermissionSet::try_from_strings(&["project:read", "bogus", "task:fly"]).unwrap_err();
        assert_eq!(err, UnknownPermission("bogus".to_string()));
        assert_eq!(err.to_string(), "Unrecognised permission entry: bogus");
    }

    #[test]
    fn test_deserializing_unknown_entry_fails() {
        let result: Result<PermissionSet, _> =
            serde_json::from_value(serde_json::json!(["task:read", "task:fly"]));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("task:fly"));
    }

    #[test]
    fn test_serializes_as_sorted_strings() {
        let set = PermissionSet::from_strings(&["task:read", "*", "device:*"]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!(["*", "device:*", "task:read"]));

        let back: PermissionSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_collect_from_permissions() {
        let set: PermissionSet = [perm(ResourceType::Report, Action::Export)]
            .into_iter()
            .collect();
        let entries: Vec<String> = set.entries().map(ToString::to_string).collect();
        assert_eq!(entries, vec!["report:export"]);
    }
}
