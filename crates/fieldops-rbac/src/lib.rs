//! # Field Operations RBAC Vocabulary
//!
//! Shared types naming what can be protected and what can be asked of it.
//! The authorization engine (`fieldops-authz`) builds role definitions and
//! resource grants from these.
//!
//! - [`ResourceType`]: resource classes (projects, devices, tasks, policies, ...)
//! - [`Action`]: requested operations, including the field verbs
//!   `assign`, `execute` and `participate`
//! - [`Permission`] / [`PermissionSet`]: a role's base permissions
//! - [`GrantScope`]: access level carried by a per-instance assignment
//!
//! ## Permission strings
//!
//! ```text
//! task:assign      dispatch any task
//! device:*         every action on devices
//! *                everything (top-level roles only)
//! ```
//!
//! `manage` implies every action; `create`, `update` and `delete` imply
//! `read`; `execute` implies `participate`.
//!
//! ```rust
//! use fieldops_rbac::{Action, GrantScope, Permission, PermissionSet, ResourceType};
//!
//! let supervisor = PermissionSet::from_strings(&["project:update", "task:assign"]);
//! assert!(supervisor.has(&Permission::new(ResourceType::Project, Action::Read)));
//! assert!(!supervisor.has(&Permission::new(ResourceType::Device, Action::Read)));
//!
//! assert!(GrantScope::Execute.covers(Action::Participate));
//! assert!(!GrantScope::Execute.covers(Action::Update));
//! ```

pub mod actions;
pub mod grants;
pub mod permissions;
pub mod resources;

pub use actions::Action;
pub use grants::GrantScope;
pub use permissions::{Permission, PermissionEntry, PermissionSet, UnknownPermission, WILDCARD};
pub use resources::ResourceType;
