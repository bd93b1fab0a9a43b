//! Resource context
//!
//! The entity layer describes the resource being accessed at request time:
//! its identity, type, geographic scope and owning units. The authorization
//! core never loads resources itself.

use fieldops_rbac::ResourceType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scope::GeoScope;

/// Request-time description of the resource being accessed.
///
/// Owner ids are optional because the entity layer only knows the ones
/// that apply; a local resource must carry its team and a regional one its
/// region, which the boundary evaluator checks.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use fieldops_org::{GeoScope, ResourceContext};
/// use fieldops_rbac::ResourceType;
///
/// let team_id = Uuid::now_v7();
/// let project = ResourceContext::local(Uuid::now_v7(), ResourceType::Project, team_id);
/// assert_eq!(project.scope, GeoScope::Local);
/// assert_eq!(project.team_id, Some(team_id));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceContext {
    /// Resource instance ID
    pub resource_id: Uuid,

    /// Resource class
    pub resource_type: ResourceType,

    /// Geographic scope
    pub scope: GeoScope,

    /// Owning team
    pub team_id: Option<Uuid>,

    /// Owning region
    pub region_id: Option<Uuid>,

    /// Owning organization
    pub organization_id: Option<Uuid>,
}

impl ResourceContext {
    /// Create a context with no owners set.
    pub fn new(resource_id: Uuid, resource_type: ResourceType, scope: GeoScope) -> Self {
        Self {
            resource_id,
            resource_type,
            scope,
            team_id: None,
            region_id: None,
            organization_id: None,
        }
    }

    /// A team-owned resource.
    pub fn local(resource_id: Uuid, resource_type: ResourceType, team_id: Uuid) -> Self {
        Self::new(resource_id, resource_type, GeoScope::Local).with_team(team_id)
    }

    /// A region-owned resource.
    pub fn regional(resource_id: Uuid, resource_type: ResourceType, region_id: Uuid) -> Self {
        Self::new(resource_id, resource_type, GeoScope::Regional).with_region(region_id)
    }

    /// A platform-wide resource.
    pub fn national(resource_id: Uuid, resource_type: ResourceType) -> Self {
        Self::new(resource_id, resource_type, GeoScope::National)
    }

    /// Set the owning team.
    pub fn with_team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Set the owning region.
    pub fn with_region(mut self, region_id: Uuid) -> Self {
        self.region_id = Some(region_id);
        self
    }

    /// Set the owning organization.
    pub fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }
}
