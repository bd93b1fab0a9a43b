//! # Field Operations Tenancy Model
//!
//! Who is asking, where they sit, and where the resource they ask about
//! sits. Everything here is plain data supplied by the identity and entity
//! layers at request time; the authorization engine never writes it.
//!
//! - [`Subject`]: home team, region, organization and primary role
//! - [`TeamMembership`]: secondments to other teams
//! - [`RoleReach`]: how far a role operates, team up to national
//! - [`RoleScope`] / [`GeoScope`]: assignment scope and resource scope
//! - [`ResourceContext`]: the resource being accessed and its owners
//!
//! ```text
//! Organization
//!   └─ Region
//!        └─ Team ─── TeamMembership ─── Subject (home team/region/org)
//!
//! Resource (ResourceContext)
//!   ├─ scope: local | regional | national
//!   └─ owners: team / region / organization
//! ```
//!
//! ```rust
//! use fieldops_org::{ResourceContext, RoleReach, RoleScope, Subject};
//! use fieldops_rbac::ResourceType;
//! use uuid::Uuid;
//!
//! let subject = Subject::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7())
//!     .with_primary_role("FIELD_SUPERVISOR");
//!
//! let scope = RoleScope::for_reach(RoleReach::Team, &subject);
//! assert_eq!(scope, RoleScope::Team(subject.home_team_id));
//!
//! let team = subject.home_team_id;
//! let project = ResourceContext::local(Uuid::now_v7(), ResourceType::Project, team);
//! ```

pub mod membership;
pub mod resource;
pub mod roles;
pub mod scope;
pub mod subject;

pub use membership::TeamMembership;
pub use resource::ResourceContext;
pub use roles::RoleReach;
pub use scope::{GeoScope, RoleScope};
pub use subject::Subject;
