//! Boundary evaluator
//!
//! Decides whether a subject, acting through one role assignment, may reach
//! a resource given the resource's geographic scope. Evaluation is pure: the
//! caller supplies the reach and a validated [`BoundaryContext`].
//!
//! Rules are an ordered table; the first rule whose predicate holds decides
//! the outcome.
//!
//! | Order | Rule id                       | Verdict                         |
//! |-------|-------------------------------|---------------------------------|
//! | 1     | `national_role`               | satisfied, cross-boundary       |
//! | 2     | `local_team_match`            | satisfied                       |
//! | 3     | `regional_match`              | satisfied                       |
//! | 4     | `national_requires_privilege` | violation                       |
//! | 5     | `outside_boundary`            | violation                       |

use fieldops_org::{GeoScope, ResourceContext, RoleScope, Subject};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AuthzError, AuthzResult};

/// Tag attached to decisions that relied on the national-role rule.
pub const CROSS_BOUNDARY_ACCESS: &str = "cross_boundary_access";

/// Where a resource lives, with the owner id its scope requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Locality {
    /// Owned by one team.
    Local {
        /// Owning team.
        team_id: Uuid,
    },
    /// Owned by one region.
    Regional {
        /// Owning region.
        region_id: Uuid,
    },
    /// Platform-wide.
    National,
}

/// Validated view of a [`ResourceContext`].
///
/// # Example
///
/// ```
/// use fieldops_authz::boundary::BoundaryContext;
/// use fieldops_org::{GeoScope, ResourceContext};
/// use fieldops_rbac::ResourceType;
/// use uuid::Uuid;
///
/// let missing_team = ResourceContext::new(Uuid::now_v7(), ResourceType::Project, GeoScope::Local);
/// assert!(BoundaryContext::from_resource(&missing_team).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundaryContext {
    /// Resource instance
    pub resource_id: Uuid,

    /// Scope and owner
    pub locality: Locality,
}

impl BoundaryContext {
    /// Validate a resource context.
    ///
    /// # Errors
    ///
    /// `BoundaryEvaluation` when the owner id the scope needs is missing or nil.
    pub fn from_resource(resource: &ResourceContext) -> AuthzResult<Self> {
        let locality = match resource.scope {
            GeoScope::Local => Locality::Local {
                team_id: required_owner(
                    resource,
                    resource.team_id,
                    "local resource has no owning team",
                )?,
            },
            GeoScope::Regional => Locality::Regional {
                region_id: required_owner(
                    resource,
                    resource.region_id,
                    "regional resource has no owning region",
                )?,
            },
            GeoScope::National => Locality::National,
        };

        Ok(Self {
            resource_id: resource.resource_id,
            locality,
        })
    }

    /// Geographic scope of the resource.
    pub fn scope(&self) -> GeoScope {
        match self.locality {
            Locality::Local { .. } => GeoScope::Local,
            Locality::Regional { .. } => GeoScope::Regional,
            Locality::National => GeoScope::National,
        }
    }
}

fn required_owner(
    resource: &ResourceContext,
    owner: Option<Uuid>,
    missing: &str,
) -> AuthzResult<Uuid> {
    match owner {
        Some(id) if !id.is_nil() => Ok(id),
        _ => Err(AuthzError::BoundaryEvaluation {
            resource_id: resource.resource_id,
            message: missing.to_string(),
        }),
    }
}

/// How far a subject reaches through one role assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reach {
    /// Team the assignment reaches
    pub team_id: Uuid,

    /// Region the assignment reaches
    pub region_id: Uuid,

    /// Whether the role bypasses locality checks
    pub national: bool,
}

impl Reach {
    /// Reach of `subject` through an assignment bound to `scope`.
    ///
    /// A team-scoped assignment reaches its team and a region-scoped one its
    /// region; everything else falls back to the subject's home units.
    /// Locality is team, region or national, so an organization-scoped
    /// assignment reaches no further than the subject's home team and region.
    ///
    /// # Example
    ///
    /// ```
    /// use fieldops_authz::boundary::Reach;
    /// use fieldops_org::{RoleScope, Subject};
    /// use uuid::Uuid;
    ///
    /// let subject = Subject::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
    /// let other_team = Uuid::now_v7();
    /// let reach = Reach::for_assignment(&subject, &RoleScope::Team(other_team), false);
    /// assert_eq!(reach.team_id, other_team);
    /// assert_eq!(reach.region_id, subject.home_region_id);
    /// ```
    pub fn for_assignment(subject: &Subject, scope: &RoleScope, national: bool) -> Self {
        let mut reach = Self {
            team_id: subject.home_team_id,
            region_id: subject.home_region_id,
            national,
        };
        match *scope {
            RoleScope::Team(team_id) => reach.team_id = team_id,
            RoleScope::Region(region_id) => reach.region_id = region_id,
            RoleScope::Organization(_) | RoleScope::Global => {}
        }
        reach
    }
}

/// What a rule concludes when its predicate holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Within the boundary.
    Satisfied,
    /// Within the boundary only through national privilege.
    SatisfiedCrossBoundary,
    /// Outside the boundary.
    Violation,
}

/// One row of the boundary rule table.
#[derive(Clone, Copy)]
pub struct BoundaryRule {
    /// Stable rule id, used in decisions and audit records
    pub id: &'static str,

    /// Whether the rule applies
    pub predicate: fn(&Reach, &BoundaryContext) -> bool,

    /// Outcome when it applies
    pub verdict: Verdict,
}

impl std::fmt::Debug for BoundaryRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryRule")
            .field("id", &self.id)
            .field("verdict", &self.verdict)
            .finish_non_exhaustive()
    }
}

fn national_role(reach: &Reach, _ctx: &BoundaryContext) -> bool {
    reach.national
}

fn local_team_match(reach: &Reach, ctx: &BoundaryContext) -> bool {
    matches!(ctx.locality, Locality::Local { team_id } if team_id == reach.team_id)
}

fn regional_match(reach: &Reach, ctx: &BoundaryContext) -> bool {
    matches!(ctx.locality, Locality::Regional { region_id } if region_id == reach.region_id)
}

fn national_resource(_reach: &Reach, ctx: &BoundaryContext) -> bool {
    ctx.locality == Locality::National
}

fn always(_reach: &Reach, _ctx: &BoundaryContext) -> bool {
    true
}

const RULES: &[BoundaryRule] = &[
    BoundaryRule {
        id: "national_role",
        predicate: national_role,
        verdict: Verdict::SatisfiedCrossBoundary,
    },
    BoundaryRule {
        id: "local_team_match",
        predicate: local_team_match,
        verdict: Verdict::Satisfied,
    },
    BoundaryRule {
        id: "regional_match",
        predicate: regional_match,
        verdict: Verdict::Satisfied,
    },
    BoundaryRule {
        id: "national_requires_privilege",
        predicate: national_resource,
        verdict: Verdict::Violation,
    },
    BoundaryRule {
        id: "outside_boundary",
        predicate: always,
        verdict: Verdict::Violation,
    },
];

/// The rule table, in evaluation order.
pub fn rules() -> &'static [BoundaryRule] {
    RULES
}

/// Result of a boundary check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundaryOutcome {
    /// Whether the boundary is satisfied
    pub satisfied: bool,

    /// Id of the deciding rule
    pub rule_id: &'static str,

    /// Whether access crosses the subject's own boundary
    pub cross_boundary: bool,
}

/// Evaluate the rule table for one reach and resource.
///
/// # Example
///
/// ```
/// use fieldops_authz::boundary::{is_in_boundary, BoundaryContext, Reach};
/// use fieldops_org::{ResourceContext, RoleScope, Subject};
/// use fieldops_rbac::ResourceType;
/// use uuid::Uuid;
///
/// let subject = Subject::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
/// let reach = Reach::for_assignment(&subject, &RoleScope::Region(subject.home_region_id), false);
/// let policy = ResourceContext::national(Uuid::now_v7(), ResourceType::Policy);
///
/// let outcome = is_in_boundary(&reach, &BoundaryContext::from_resource(&policy).unwrap());
/// assert!(!outcome.satisfied);
/// assert_eq!(outcome.rule_id, "national_requires_privilege");
/// ```
pub fn is_in_boundary(reach: &Reach, ctx: &BoundaryContext) -> BoundaryOutcome {
    for rule in RULES {
        if (rule.predicate)(reach, ctx) {
            return BoundaryOutcome {
                satisfied: rule.verdict != Verdict::Violation,
                rule_id: rule.id,
                cross_boundary: rule.verdict == Verdict::SatisfiedCrossBoundary,
            };
        }
    }
    // The last rule always matches.
    BoundaryOutcome {
        satisfied: false,
        rule_id: "outside_boundary",
        cross_boundary: false,
    }
}
