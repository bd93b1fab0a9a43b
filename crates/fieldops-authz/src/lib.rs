//! # Field Operations Authorization Core
//!
//! This crate decides whether a subject may perform an action on a resource,
//! reconciling role permissions, geographic boundaries, direct and team
//! resource assignments into one cacheable, audited [`Decision`].
//!
//! ## Overview
//!
//! The fieldops-authz crate handles:
//! - **Role registry**: Role name → level, reach and permission set
//! - **Assignment resolution**: Stored role assignments merged with the
//!   legacy primary-role projection
//! - **Boundary evaluation**: Ordered rules for local, regional and national resources
//! - **Decisions**: Role, direct and team grants evaluated in a fixed order
//! - **Caching**: Fenced, short-TTL decision cache with explicit invalidation
//! - **Auditing**: One record per decision, with a fallback when the sink fails
//!
//! ## Architecture
//!
//! ```text
//! authorize(subject, action, resource)
//!   ├─ PermissionCache ── hit ──────────────────────────────┐
//!   └─ miss                                                 │
//!        ├─ AssignmentResolver (RoleAssignmentStore)        │
//!        ├─ RoleRegistry + Boundary rules ── allow?         │
//!        ├─ direct ResourceAssignments ───── allow?         │
//!        ├─ team ResourceAssignments (MembershipStore)      │
//!        └─ deny                                            │
//!   AuditLogger ◄───────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fieldops_authz::store::{MemoryDirectory, Stores};
//! use fieldops_authz::{AuthorizerBuilder, ReasonCode, RoleRegistry};
//! use fieldops_org::{ResourceContext, Subject};
//! use fieldops_rbac::{Action, ResourceType};
//! use uuid::Uuid;
//!
//! async fn example() {
//!     let directory = Arc::new(MemoryDirectory::new());
//!     let subject = Subject::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7())
//!         .with_primary_role("FIELD_SUPERVISOR");
//!     directory.upsert_subject(subject.clone()).await;
//!
//!     let authorizer =
//!         AuthorizerBuilder::new(RoleRegistry::field_operations(), Stores::shared(directory))
//!             .build()
//!             .unwrap();
//!
//!     let project =
//!         ResourceContext::local(Uuid::now_v7(), ResourceType::Project, subject.home_team_id);
//!     let decision = authorizer.authorize(subject.id, Action::Update, &project).await;
//!     assert!(decision.allowed);
//!     assert_eq!(decision.reason, ReasonCode::RolePermission);
//! }
//! ```
//!
//! ## Invalidation
//!
//! The administrative layer owns every write. After changing assignments,
//! memberships or roles it must call the matching hook
//! ([`Authorizer::role_assignments_changed`],
//! [`Authorizer::resource_assignments_changed`],
//! [`Authorizer::memberships_changed`], [`Authorizer::roles_changed`]) before
//! the change is considered committed.

pub mod assignment;
pub mod audit;
pub mod boundary;
pub mod cache;
pub mod clock;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod store;

pub use assignment::{
    Grantee, ResourceAssignment, RoleAssignment, StoredRoleAssignment, SyntheticRoleAssignment,
};
pub use audit::{AuditLogger, AuditRecord, AuditSink};
pub use boundary::{is_in_boundary, BoundaryContext, BoundaryOutcome, Reach};
pub use cache::{CacheKey, CacheStats, MemoryPermissionCache, PermissionCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthzConfig;
pub use decision::{Decision, ReasonCode, TraceStage, TraceStep};
pub use engine::{Authorizer, AuthorizerBuilder};
pub use error::{AuthzError, AuthzResult};
pub use registry::{RoleDefinition, RoleRegistry};
pub use resolver::{AssignmentResolver, EffectiveRoles};
