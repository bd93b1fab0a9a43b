//! Role and resource assignment models
//!
//! Role assignments bind a subject to a role within an organizational scope.
//! Resource assignments bind a subject or a team directly to one resource
//! instance with a [`GrantScope`].

use chrono::{DateTime, Utc};
use fieldops_org::RoleScope;
use fieldops_rbac::{Action, GrantScope};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role assignment row as read from the assignment store.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use uuid::Uuid;
/// use fieldops_authz::StoredRoleAssignment;
/// use fieldops_org::RoleScope;
///
/// let scope = RoleScope::Region(Uuid::now_v7());
/// let row = StoredRoleAssignment::new(Uuid::now_v7(), "REGIONAL_MANAGER", scope);
/// assert!(row.is_effective(Utc::now()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRoleAssignment {
    /// Assignment row ID
    pub id: Uuid,

    /// Subject holding the role
    pub subject_id: Uuid,

    /// Role name
    pub role: String,

    /// Scope the role applies in
    pub scope: RoleScope,

    /// Whether the assignment is active
    pub is_active: bool,

    /// When the assignment lapses
    pub expires_at: Option<DateTime<Utc>>,

    /// When the assignment was granted
    pub granted_at: DateTime<Utc>,
}

impl StoredRoleAssignment {
    /// Creates an active, non-expiring assignment.
    pub fn new(subject_id: Uuid, role: impl Into<String>, scope: RoleScope) -> Self {
        Self {
            id: Uuid::now_v7(),
            subject_id,
            role: role.into(),
            scope,
            is_active: true,
            expires_at: None,
            granted_at: Utc::now(),
        }
    }

    /// Set an expiry.
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the row may contribute to a decision at `now`.
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |exp| exp > now)
    }
}

/// Read-time projection of a subject's legacy primary role.
///
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticRoleAssignment {
    /// Subject holding the role
    pub subject_id: Uuid,

    /// Role name (from the primary-role attribute)
    pub role: String,

    /// Scope derived from the role's reach and the subject's home units
    pub scope: RoleScope,
}

/// An effective role assignment, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RoleAssignment {
    /// Stored, intentionally managed row.
    Stored(StoredRoleAssignment),
    /// Projection of the primary-role attribute.
    Synthetic(SyntheticRoleAssignment),
}

impl RoleAssignment {
    /// Subject holding the role.
    pub fn subject_id(&self) -> Uuid {
        match self {
            RoleAssignment::Stored(row) => row.subject_id,
            RoleAssignment::Synthetic(syn) => syn.subject_id,
        }
    }

    /// Role name.
    pub fn role(&self) -> &str {
        match self {
            RoleAssignment::Stored(row) => &row.role,
            RoleAssignment::Synthetic(syn) => &syn.role,
        }
    }

    /// Scope the role applies in.
    pub fn scope(&self) -> &RoleScope {
        match self {
            RoleAssignment::Stored(row) => &row.scope,
            RoleAssignment::Synthetic(syn) => &syn.scope,
        }
    }

    /// Whether this is a synthetic projection.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, RoleAssignment::Synthetic(_))
    }

    /// Rule label used in decisions and traces, e.g. `role:FIELD_AGENT@team:<id>`.
    pub fn label(&self) -> String {
        format!("role:{}@{}", self.role().to_uppercase(), self.scope())
    }
}

/// Who a resource assignment is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Grantee {
    /// A single subject.
    Subject(Uuid),
    /// Every current member of a team.
    Team(Uuid),
}

/// Direct grant of access to one resource instance.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use uuid::Uuid;
/// use fieldops_authz::ResourceAssignment;
/// use fieldops_rbac::{Action, GrantScope};
///
/// let grant = ResourceAssignment::for_subject(Uuid::now_v7(), Uuid::now_v7(), GrantScope::Update);
/// assert!(grant.grants(Action::Read, Utc::now()));
/// assert!(!grant.grants(Action::Delete, Utc::now()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAssignment {
    /// Assignment row ID
    pub id: Uuid,

    /// Resource instance
    pub resource_id: Uuid,

    /// Subject or team receiving access
    pub grantee: Grantee,

    /// Granted access level
    pub scope: GrantScope,

    /// Whether the assignment is active
    pub is_active: bool,

    /// When the assignment lapses
    pub expires_at: Option<DateTime<Utc>>,

    /// When the assignment was granted
    pub granted_at: DateTime<Utc>,
}

impl ResourceAssignment {
    /// Grant a subject access to a resource.
    pub fn for_subject(resource_id: Uuid, subject_id: Uuid, scope: GrantScope) -> Self {
        Self::new(resource_id, Grantee::Subject(subject_id), scope)
    }

    /// Grant a team access to a resource.
    pub fn for_team(resource_id: Uuid, team_id: Uuid, scope: GrantScope) -> Self {
        Self::new(resource_id, Grantee::Team(team_id), scope)
    }

    fn new(resource_id: Uuid, grantee: Grantee, scope: GrantScope) -> Self {
        Self {
            id: Uuid::now_v7(),
            resource_id,
            grantee,
            scope,
            is_active: true,
            expires_at: None,
            granted_at: Utc::now(),
        }
    }

    /// Set an expiry.
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the row may contribute to a decision at `now`.
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |exp| exp > now)
    }

    /// Whether the row grants `action` at `now`.
    pub fn grants(&self, action: Action, now: DateTime<Utc>) -> bool {
        self.is_effective(now) && self.scope.covers(action)
    }
}
