//! Scopes
//!
//! Two related notions of scope live here:
//! - [`GeoScope`]: the geographic reach of a resource (local, regional, national)
//! - [`RoleScope`]: the organizational unit a role assignment is bound to

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::roles::RoleReach;
use crate::subject::Subject;

/// Geographic scope of a resource.
///
/// - **Local**: owned by a single team
/// - **Regional**: shared across a region
/// - **National**: platform-wide
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GeoScope {
    /// Team-owned resource.
    Local,
    /// Region-owned resource.
    Regional,
    /// Platform-wide resource.
    National,
}

impl GeoScope {
    /// Get string representation of the scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoScope::Local => "local",
            GeoScope::Regional => "regional",
            GeoScope::National => "national",
        }
    }

    /// Parse scope from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" | "team" => Some(GeoScope::Local),
            "regional" | "region" => Some(GeoScope::Regional),
            "national" => Some(GeoScope::National),
            _ => None,
        }
    }
}

impl fmt::Display for GeoScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organizational unit a role assignment is bound to.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use fieldops_org::RoleScope;
///
/// let team_id = Uuid::now_v7();
/// let scope = RoleScope::Team(team_id);
/// assert_eq!(scope.key(), format!("team:{}", team_id));
/// assert_eq!(RoleScope::Global.key(), "global");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RoleScope {
    /// Bound to one team.
    Team(Uuid),
    /// Bound to one region.
    Region(Uuid),
    /// Bound to one organization.
    Organization(Uuid),
    /// Not bound to any unit.
    Global,
}

impl RoleScope {
    /// Derive the scope a role of the given reach takes for a subject,
    /// anchored at the subject's home units.
    ///
    /// # Examples
    ///
    /// ```
    /// use uuid::Uuid;
    /// use fieldops_org::{RoleReach, RoleScope, Subject};
    ///
    /// let subject = Subject::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
    /// assert_eq!(
    ///     RoleScope::for_reach(RoleReach::Region, &subject),
    ///     RoleScope::Region(subject.home_region_id)
    /// );
    /// assert_eq!(RoleScope::for_reach(RoleReach::National, &subject), RoleScope::Global);
    /// ```
    pub fn for_reach(reach: RoleReach, subject: &Subject) -> Self {
        match reach {
            RoleReach::Team => RoleScope::Team(subject.home_team_id),
            RoleReach::Region => RoleScope::Region(subject.home_region_id),
            RoleReach::Organization => RoleScope::Organization(subject.home_organization_id),
            RoleReach::National => RoleScope::Global,
        }
    }

    /// Stable string key, used for deduplication and cache keys.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RoleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleScope::Team(id) => write!(f, "team:{}", id),
            RoleScope::Region(id) => write!(f, "region:{}", id),
            RoleScope::Organization(id) => write!(f, "org:{}", id),
            RoleScope::Global => f.write_str("global"),
        }
    }
}
