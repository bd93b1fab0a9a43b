//! Subject domain model
//!
//! A subject is the authenticated actor asking for access, as seen by the
//! authorization core: an id, the units it belongs to, and the legacy
//! primary-role attribute supplied by the identity layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The actor requesting access.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use fieldops_org::Subject;
///
/// let subject = Subject::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7())
///     .with_primary_role("FIELD_AGENT");
/// assert_eq!(subject.primary_role.as_deref(), Some("FIELD_AGENT"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject (user) ID
    pub id: Uuid,

    /// Team the subject belongs to by default
    pub home_team_id: Uuid,

    /// Region of the home team
    pub home_region_id: Uuid,

    /// Tenant organization
    pub home_organization_id: Uuid,

    /// Legacy primary role attribute
    ///
    /// Projected into a synthetic role assignment at read time; never
    /// written back as an assignment row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_role: Option<String>,
}

impl Subject {
    /// Creates a subject with no primary role.
    pub fn new(
        id: Uuid,
        home_team_id: Uuid,
        home_region_id: Uuid,
        home_organization_id: Uuid,
    ) -> Self {
        Self {
            id,
            home_team_id,
            home_region_id,
            home_organization_id,
            primary_role: None,
        }
    }

    /// Set the legacy primary role attribute.
    pub fn with_primary_role(mut self, role: impl Into<String>) -> Self {
        self.primary_role = Some(role.into());
        self
    }
}
