//! Role registry
//!
//! Maps role names to their hierarchy level, reach and base permission set.
//! The registry is read-only once the [`Authorizer`](crate::engine::Authorizer)
//! is built.

use fieldops_org::RoleReach;
use fieldops_rbac::PermissionSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AuthzError, AuthzResult};

/// Hierarchy level of the stock `SYSTEM_ADMIN` role.
pub const DEFAULT_TOP_LEVEL: u32 = 100;

/// A registered role.
///
/// # Example
///
/// ```
/// use fieldops_authz::registry::RoleDefinition;
/// use fieldops_org::RoleReach;
/// use fieldops_rbac::PermissionSet;
///
/// let role = RoleDefinition::new(
///     "DISPATCHER",
///     30,
///     RoleReach::Region,
///     PermissionSet::from_strings(&["task:assign", "device:read"]),
/// );
/// assert_eq!(role.name, "DISPATCHER");
/// assert!(!role.is_national());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role name, stored upper-case
    pub name: String,

    /// Hierarchy level (higher is more privileged)
    pub level: u32,

    /// Intended reach of holders
    pub reach: RoleReach,

    /// Base permission set
    pub permissions: PermissionSet,
}

impl RoleDefinition {
    /// Create a role definition.
    pub fn new(
        name: impl Into<String>,
        level: u32,
        reach: RoleReach,
        permissions: PermissionSet,
    ) -> Self {
        Self {
            name: normalize(&name.into()),
            level,
            reach,
            permissions,
        }
    }

    /// Create a role definition from permission entry strings, rejecting
    /// any entry that does not parse.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRole` naming the first unrecognised entry.
    pub fn from_entries(
        name: impl Into<String>,
        level: u32,
        reach: RoleReach,
        entries: &[&str],
    ) -> AuthzResult<Self> {
        let name = name.into();
        let permissions =
            PermissionSet::try_from_strings(entries).map_err(|e| AuthzError::InvalidRole {
                role: normalize(&name),
                message: e.to_string(),
            })?;
        Ok(Self::new(name, level, reach, permissions))
    }

    /// Whether the role carries the global wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.permissions.is_wildcard()
    }

    /// Whether holders bypass locality checks (national reach or wildcard).
    pub fn is_national(&self) -> bool {
        self.reach.is_national() || self.is_wildcard()
    }
}

/// Registry of role definitions.
///
/// # Example
///
/// ```
/// use fieldops_authz::registry::RoleRegistry;
/// use fieldops_rbac::{Action, Permission, ResourceType};
///
/// let registry = RoleRegistry::field_operations();
/// let perms = registry.permissions_for("field_supervisor").unwrap();
/// assert!(perms.has(&Permission::new(ResourceType::Project, Action::Update)));
/// assert!(registry.level_of("SYSTEM_ADMIN").unwrap() > registry.level_of("VIEWER").unwrap());
/// assert!(registry.permissions_for("GHOST").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: HashMap<String, RoleDefinition>,
    top_level: u32,
}

impl RoleRegistry {
    /// Create an empty registry whose hierarchy tops out at `top_level`.
    pub fn new(top_level: u32) -> Self {
        Self {
            roles: HashMap::new(),
            top_level,
        }
    }

    /// Registry with the platform's stock roles.
    ///
    /// | Role               | Level | Reach        |
    /// |--------------------|-------|--------------|
    /// | `SYSTEM_ADMIN`     | 100   | national (*) |
    /// | `NATIONAL_ADMIN`   | 80    | national     |
    /// | `REGIONAL_MANAGER` | 60    | region       |
    /// | `FIELD_SUPERVISOR` | 40    | team         |
    /// | `FIELD_AGENT`      | 20    | team         |
    /// | `VIEWER`           | 10    | organization |
    pub fn field_operations() -> Self {
        let mut registry = Self::new(DEFAULT_TOP_LEVEL);
        for role in stock_roles() {
            // Stock definitions always satisfy the registry invariants.
            registry.roles.insert(role.name.clone(), role);
        }
        registry
    }

    /// Register (or replace) a role.
    ///
    /// Rejects levels above the top of the hierarchy, and the global
    /// wildcard on any role below it.
    pub fn register(&mut self, role: RoleDefinition) -> AuthzResult<()> {
        if role.name.is_empty() {
            return Err(AuthzError::InvalidRole {
                role: role.name,
                message: "role name must not be empty".to_string(),
            });
        }
        if role.level > self.top_level {
            return Err(AuthzError::InvalidRole {
                message: format!(
                    "level {} is above the top of the hierarchy ({})",
                    role.level, self.top_level
                ),
                role: role.name,
            });
        }
        if role.is_wildcard() && role.level != self.top_level {
            return Err(AuthzError::InvalidRole {
                message: format!(
                    "wildcard permission is reserved for level {}",
                    self.top_level
                ),
                role: role.name,
            });
        }
        self.roles.insert(role.name.clone(), role);
        Ok(())
    }

    /// Look up a role definition.
    pub fn definition(&self, role: &str) -> AuthzResult<&RoleDefinition> {
        self.roles
            .get(&normalize(role))
            .ok_or_else(|| AuthzError::UnknownRole(role.to_string()))
    }

    /// Base permission set of a role.
    pub fn permissions_for(&self, role: &str) -> AuthzResult<&PermissionSet> {
        self.definition(role).map(|def| &def.permissions)
    }

    /// Hierarchy level of a role.
    pub fn level_of(&self, role: &str) -> AuthzResult<u32> {
        self.definition(role).map(|def| def.level)
    }

    /// Whether a role is registered.
    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains_key(&normalize(role))
    }

    /// Top hierarchy level.
    pub fn top_level(&self) -> u32 {
        self.top_level
    }

    /// Registered role names, highest level first.
    pub fn names(&self) -> Vec<&str> {
        let mut roles: Vec<&RoleDefinition> = self.roles.values().collect();
        roles.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.name.cmp(&b.name)));
        roles.into_iter().map(|r| r.name.as_str()).collect()
    }

    /// Number of registered roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

fn normalize(role: &str) -> String {
    role.trim().to_uppercase()
}

const NATIONAL_ADMIN_PERMISSIONS: &[&str] = &[
    "project:*",
    "device:*",
    "policy:*",
    "form:*",
    "submission:*",
    "task:*",
    "report:*",
    "team:manage",
    "region:read",
    "user:manage",
    "role:read",
    "audit_log:read",
    "settings:update",
];

const REGIONAL_MANAGER_PERMISSIONS: &[&str] = &[
    "project:manage",
    "device:manage",
    "task:*",
    "form:update",
    "submission:approve",
    "report:*",
    "team:update",
    "user:read",
    "policy:read",
    "audit_log:read",
];

const FIELD_SUPERVISOR_PERMISSIONS: &[&str] = &[
    "project:update",
    "project:list",
    "device:update",
    "device:assign",
    "task:manage",
    "form:read",
    "submission:approve",
    "report:read",
    "team:read",
    "user:read",
];

const FIELD_AGENT_PERMISSIONS: &[&str] = &[
    "project:read",
    "project:participate",
    "task:execute",
    "form:read",
    "submission:create",
    "device:read",
];

const VIEWER_PERMISSIONS: &[&str] = &[
    "project:read",
    "project:list",
    "device:read",
    "task:read",
    "report:read",
];

fn stock_roles() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new(
            "SYSTEM_ADMIN",
            DEFAULT_TOP_LEVEL,
            RoleReach::National,
            PermissionSet::all_access(),
        ),
        RoleDefinition::new(
            "NATIONAL_ADMIN",
            80,
            RoleReach::National,
            PermissionSet::from_strings(NATIONAL_ADMIN_PERMISSIONS),
        ),
        RoleDefinition::new(
            "REGIONAL_MANAGER",
            60,
            RoleReach::Region,
            PermissionSet::from_strings(REGIONAL_MANAGER_PERMISSIONS),
        ),
        RoleDefinition::new(
            "FIELD_SUPERVISOR",
            40,
            RoleReach::Team,
            PermissionSet::from_strings(FIELD_SUPERVISOR_PERMISSIONS),
        ),
        RoleDefinition::new(
            "FIELD_AGENT",
            20,
            RoleReach::Team,
            PermissionSet::from_strings(FIELD_AGENT_PERMISSIONS),
        ),
        RoleDefinition::new(
            "VIEWER",
            10,
            RoleReach::Organization,
            PermissionSet::from_strings(VIEWER_PERMISSIONS),
        ),
    ]
}
