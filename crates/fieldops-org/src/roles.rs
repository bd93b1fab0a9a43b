//! Role reach
//!
//! A role's reach is how far across the organizational hierarchy its
//! holders are meant to operate. It decides the scope of synthetic
//! assignments and whether a role bypasses locality checks.

use serde::{Deserialize, Serialize};

/// How far a role reaches across the organizational hierarchy.
///
/// Reaches are ordered: Team < Region < Organization < National.
///
/// # Examples
///
/// ```
/// use fieldops_org::RoleReach;
///
/// assert!(RoleReach::National > RoleReach::Region);
/// assert!(RoleReach::National.is_national());
/// assert!(!RoleReach::Organization.is_national());
/// ```
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum RoleReach {
    /// Home team only (field agents, supervisors).
    #[default]
    Team,
    /// Every team in the home region.
    Region,
    /// The whole tenant.
    Organization,
    /// Every tenant; skips locality checks.
    National,
}

impl RoleReach {
    /// Whether holders of this reach bypass locality checks.
    pub fn is_national(&self) -> bool {
        *self == RoleReach::National
    }

    /// Parse a reach name. The geographic-scope words `local`, `regional`
    /// and `global` are accepted too.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "team" | "local" => Some(Self::Team),
            "region" | "regional" => Some(Self::Region),
            "organization" | "org" => Some(Self::Organization),
            "national" | "global" => Some(Self::National),
            _ => None,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::Region => "region",
            Self::Organization => "organization",
            Self::National => "national",
        }
    }
}
