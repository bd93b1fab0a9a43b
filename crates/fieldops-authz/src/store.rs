//! Storage seams
//!
//! The authorization core only reads identity, assignment and membership
//! data; the administrative layer owns writes. Each concern is a separate
//! async trait so hosts can back them with different systems.
//!
//! [`MemoryDirectory`] implements all four traits in-process. Its mutation
//! helpers stand in for the administrative layer in embedded deployments
//! and tests; callers must pair every mutation with the matching
//! invalidation hook on the [`Authorizer`](crate::engine::Authorizer).

use async_trait::async_trait;
use fieldops_org::{Subject, TeamMembership};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::assignment::{ResourceAssignment, StoredRoleAssignment};

/// Storage error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Backend returned data that could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Identity lookups.
#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    /// Fetch a subject by id.
    async fn subject(&self, subject_id: Uuid) -> StoreResult<Option<Subject>>;
}

/// Stored role assignment rows.
#[async_trait]
pub trait RoleAssignmentStore: Send + Sync {
    /// All rows for a subject, including inactive and expired ones.
    async fn role_assignments(&self, subject_id: Uuid) -> StoreResult<Vec<StoredRoleAssignment>>;
}

/// Direct and team resource assignments.
#[async_trait]
pub trait ResourceAssignmentStore: Send + Sync {
    /// All rows for a resource instance, including inactive and expired ones.
    async fn resource_assignments(&self, resource_id: Uuid) -> StoreResult<Vec<ResourceAssignment>>;
}

/// Team memberships.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// All memberships of a subject, including ended ones.
    async fn memberships(&self, subject_id: Uuid) -> StoreResult<Vec<TeamMembership>>;
}

/// The storage handles an authorizer reads from.
#[derive(Clone)]
pub struct Stores {
    /// Identity lookups.
    pub subjects: Arc<dyn SubjectDirectory>,
    /// Role assignment rows.
    pub role_assignments: Arc<dyn RoleAssignmentStore>,
    /// Resource assignment rows.
    pub resource_assignments: Arc<dyn ResourceAssignmentStore>,
    /// Team memberships.
    pub memberships: Arc<dyn MembershipStore>,
}

impl Stores {
    /// Use one backend for every concern.
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: SubjectDirectory
            + RoleAssignmentStore
            + ResourceAssignmentStore
            + MembershipStore
            + 'static,
    {
        Self {
            subjects: backend.clone(),
            role_assignments: backend.clone(),
            resource_assignments: backend.clone(),
            memberships: backend,
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// In-memory implementation of every storage seam.
///
/// # Example
///
/// ```rust,no_run
/// use fieldops_authz::store::{MemoryDirectory, SubjectDirectory};
/// use fieldops_org::Subject;
/// use uuid::Uuid;
///
/// async fn example() {
///     let directory = MemoryDirectory::new();
///     let subject = Subject::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
///     directory.upsert_subject(subject.clone()).await;
///     assert_eq!(directory.subject(subject.id).await.unwrap(), Some(subject));
/// }
/// ```
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    subjects: RwLock<HashMap<Uuid, Subject>>,
    role_assignments: RwLock<HashMap<Uuid, Vec<StoredRoleAssignment>>>,
    resource_assignments: RwLock<HashMap<Uuid, Vec<ResourceAssignment>>>,
    memberships: RwLock<HashMap<Uuid, Vec<TeamMembership>>>,
    unavailable: AtomicBool,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a backend outage: every read fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory directory offline".to_string()));
        }
        Ok(())
    }

    /// Insert or replace a subject.
    pub async fn upsert_subject(&self, subject: Subject) {
        self.subjects.write().await.insert(subject.id, subject);
    }

    /// Add a role assignment row.
    pub async fn add_role_assignment(&self, assignment: StoredRoleAssignment) {
        self.role_assignments
            .write()
            .await
            .entry(assignment.subject_id)
            .or_default()
            .push(assignment);
    }

    /// Deactivate a role assignment row.
    ///
    /// # Returns
    ///
    /// The subject whose assignments changed, if the row exists.
    pub async fn revoke_role_assignment(&self, assignment_id: Uuid) -> Option<Uuid> {
        let mut rows = self.role_assignments.write().await;
        rows.values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|row| row.id == assignment_id)
            .map(|row| {
                row.is_active = false;
                row.subject_id
            })
    }

    /// Add a resource assignment row.
    pub async fn add_resource_assignment(&self, assignment: ResourceAssignment) {
        self.resource_assignments
            .write()
            .await
            .entry(assignment.resource_id)
            .or_default()
            .push(assignment);
    }

    /// Deactivate a resource assignment row.
    ///
    /// # Returns
    ///
    /// The resource whose assignments changed, if the row exists.
    pub async fn revoke_resource_assignment(&self, assignment_id: Uuid) -> Option<Uuid> {
        let mut rows = self.resource_assignments.write().await;
        rows.values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|row| row.id == assignment_id)
            .map(|row| {
                row.is_active = false;
                row.resource_id
            })
    }

    /// Add a team membership.
    pub async fn add_membership(&self, membership: TeamMembership) {
        self.memberships
            .write()
            .await
            .entry(membership.subject_id)
            .or_default()
            .push(membership);
    }

    /// Deactivate a team membership.
    ///
    /// # Returns
    ///
    /// The subject whose memberships changed, if the membership exists.
    pub async fn end_membership(&self, membership_id: Uuid) -> Option<Uuid> {
        let mut rows = self.memberships.write().await;
        rows.values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|row| row.id == membership_id)
            .map(|row| {
                row.is_active = false;
                row.subject_id
            })
    }
}

#[async_trait]
impl SubjectDirectory for MemoryDirectory {
    async fn subject(&self, subject_id: Uuid) -> StoreResult<Option<Subject>> {
        self.check_available()?;
        Ok(self.subjects.read().await.get(&subject_id).cloned())
    }
}

#[async_trait]
impl RoleAssignmentStore for MemoryDirectory {
    async fn role_assignments(&self, subject_id: Uuid) -> StoreResult<Vec<StoredRoleAssignment>> {
        self.check_available()?;
        Ok(self
            .role_assignments
            .read()
            .await
            .get(&subject_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ResourceAssignmentStore for MemoryDirectory {
    async fn resource_assignments(
        &self,
        resource_id: Uuid,
    ) -> StoreResult<Vec<ResourceAssignment>> {
        self.check_available()?;
        Ok(self
            .resource_assignments
            .read()
            .await
            .get(&resource_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl MembershipStore for MemoryDirectory {
    async fn memberships(&self, subject_id: Uuid) -> StoreResult<Vec<TeamMembership>> {
        self.check_available()?;
        Ok(self
            .memberships
            .read()
            .await
            .get(&subject_id)
            .cloned()
            .unwrap_or_default())
    }
}
