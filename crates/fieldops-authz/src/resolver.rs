//! Assignment resolver
//!
//! Builds a subject's effective role assignments: stored rows that are
//! active and unexpired, plus a synthetic assignment projected from the
//! legacy primary-role attribute. A stored row always wins over the
//! synthetic projection for the same scope.

use chrono::{DateTime, Utc};
use fieldops_org::{RoleScope, Subject};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::assignment::{RoleAssignment, StoredRoleAssignment, SyntheticRoleAssignment};
use crate::error::{AuthzError, AuthzResult};
use crate::registry::RoleRegistry;
use crate::store::{RoleAssignmentStore, SubjectDirectory};

/// A subject together with its effective role assignments.
#[derive(Debug, Clone)]
pub struct EffectiveRoles {
    /// The resolved subject.
    pub subject: Subject,
    /// Effective assignments, highest hierarchy level first.
    pub assignments: Vec<RoleAssignment>,
}

/// Loads and merges role assignments.
pub struct AssignmentResolver {
    registry: Arc<RoleRegistry>,
    subjects: Arc<dyn SubjectDirectory>,
    assignments: Arc<dyn RoleAssignmentStore>,
}

impl std::fmt::Debug for AssignmentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentResolver")
            .field("roles", &self.registry.len())
            .finish()
    }
}

impl AssignmentResolver {
    /// Create a resolver over the given registry and stores.
    pub fn new(
        registry: Arc<RoleRegistry>,
        subjects: Arc<dyn SubjectDirectory>,
        assignments: Arc<dyn RoleAssignmentStore>,
    ) -> Self {
        Self {
            registry,
            subjects,
            assignments,
        }
    }

    /// Resolve a subject's effective roles at `now`.
    ///
    /// # Errors
    ///
    /// - `AssignmentResolution` if the subject is unknown or a store read fails
    /// - `UnknownRole` if any effective assignment names an unregistered role
    pub async fn resolve(
        &self,
        subject_id: Uuid,
        now: DateTime<Utc>,
    ) -> AuthzResult<EffectiveRoles> {
        let subject = self
            .subjects
            .subject(subject_id)
            .await
            .map_err(|e| AuthzError::AssignmentResolution {
                subject_id,
                message: e.to_string(),
            })?
            .ok_or_else(|| AuthzError::AssignmentResolution {
                subject_id,
                message: "subject not found".to_string(),
            })?;

        let stored = self
            .assignments
            .role_assignments(subject_id)
            .await
            .map_err(|e| AuthzError::AssignmentResolution {
                subject_id,
                message: e.to_string(),
            })?;

        let assignments = merge_assignments(&self.registry, &subject, stored, now)?;
        debug!(
            subject_id = %subject_id,
            effective = assignments.len(),
            "Resolved role assignments"
        );

        Ok(EffectiveRoles {
            subject,
            assignments,
        })
    }
}

/// Merge stored rows with the synthetic primary-role projection.
///
/// Ordering is by descending hierarchy level, then stored before synthetic,
/// then role name, then scope key, so identical inputs always produce the
/// same list.
pub fn merge_assignments(
    registry: &RoleRegistry,
    subject: &Subject,
    stored: Vec<StoredRoleAssignment>,
    now: DateTime<Utc>,
) -> AuthzResult<Vec<RoleAssignment>> {
    let stored: Vec<StoredRoleAssignment> = stored
        .into_iter()
        .filter(|row| row.subject_id == subject.id && row.is_effective(now))
        .collect();

    let mut ranked: Vec<(u32, RoleAssignment)> = Vec::with_capacity(stored.len() + 1);

    if let Some(ref primary) = subject.primary_role {
        let definition = registry.definition(primary)?;
        let scope = RoleScope::for_reach(definition.reach, subject);
        if stored.iter().any(|row| row.scope == scope) {
            debug!(
                subject_id = %subject.id,
                scope = %scope,
                "Stored assignment overrides primary role"
            );
        } else {
            ranked.push((
                definition.level,
                RoleAssignment::Synthetic(SyntheticRoleAssignment {
                    subject_id: subject.id,
                    role: definition.name.clone(),
                    scope,
                }),
            ));
        }
    }

    for row in stored {
        let level = registry.level_of(&row.role)?;
        ranked.push((level, RoleAssignment::Stored(row)));
    }

    ranked.sort_by_cached_key(|(level, assignment)| {
        (
            Reverse(*level),
            assignment.is_synthetic(),
            assignment.role().to_uppercase(),
            assignment.scope().key(),
        )
    });
    ranked.dedup_by(|(_, b), (_, a)| {
        a.role().eq_ignore_ascii_case(b.role()) && a.scope() == b.scope()
    });

    Ok(ranked.into_iter().map(|(_, assignment)| assignment).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDirectory;
    use chrono::Duration;

    fn subject() -> Subject {
        Subject::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7())
    }

    #[test]
    fn test_synthetic_from_primary_role() {
        let registry = RoleRegistry::field_operations();
        let subject = subject().with_primary_role("field_supervisor");

        let merged = merge_assignments(&registry, &subject, Vec::new(), Utc::now()).unwrap();
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_synthetic());
        assert_eq!(merged[0].role(), "FIELD_SUPERVISOR");
        assert_eq!(merged[0].scope(), &RoleScope::Team(subject.home_team_id));
    }

    #[test]
    fn test_stored_wins_over_synthetic_for_same_scope() {
        let registry = RoleRegistry::field_operations();
        let subject = subject().with_primary_role("FIELD_AGENT");
        let row = StoredRoleAssignment::new(
            subject.id,
            "FIELD_SUPERVISOR",
            RoleScope::Team(subject.home_team_id),
        );

        let merged = merge_assignments(&registry, &subject, vec![row], Utc::now()).unwrap();
        assert_eq!(merged.len(), 1);
        assert!(!merged[0].is_synthetic());
        assert_eq!(merged[0].role(), "FIELD_SUPERVISOR");
    }

    #[test]
    fn test_synthetic_survives_when_stored_row_expired() {
        let registry = RoleRegistry::field_operations();
        let subject = subject().with_primary_role("FIELD_AGENT");
        let now = Utc::now();
        let row = StoredRoleAssignment::new(
            subject.id,
            "FIELD_SUPERVISOR",
            RoleScope::Team(subject.home_team_id),
        )
        .expiring_at(now - Duration::hours(1));

        let merged = merge_assignments(&registry, &subject, vec![row], now).unwrap();
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_synthetic());
        assert_eq!(merged[0].role(), "FIELD_AGENT");
    }

    #[test]
    fn test_ordered_by_descending_level() {
        let registry = RoleRegistry::field_operations();
        let subject = subject().with_primary_role("VIEWER");
        let rows = vec![
            StoredRoleAssignment::new(subject.id, "FIELD_AGENT", RoleScope::Team(Uuid::now_v7())),
            StoredRoleAssignment::new(
                subject.id,
                "REGIONAL_MANAGER",
                RoleScope::Region(subject.home_region_id),
            ),
        ];

        let merged = merge_assignments(&registry, &subject, rows, Utc::now()).unwrap();
        let roles: Vec<&str> = merged.iter().map(|a| a.role()).collect();
        assert_eq!(roles, vec!["REGIONAL_MANAGER", "FIELD_AGENT", "VIEWER"]);
    }

    #[test]
    fn test_duplicate_rows_collapse() {
        let registry = RoleRegistry::field_operations();
        let subject = subject();
        let scope = RoleScope::Region(subject.home_region_id);
        let rows = vec![
            StoredRoleAssignment::new(subject.id, "REGIONAL_MANAGER", scope),
            StoredRoleAssignment::new(subject.id, "regional_manager", scope),
        ];

        let merged = merge_assignments(&registry, &subject, rows, Utc::now()).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_unknown_stored_role_fails() {
        let registry = RoleRegistry::field_operations();
        let subject = subject();
        let rows = vec![StoredRoleAssignment::new(subject.id, "GHOST", RoleScope::Global)];

        let result = merge_assignments(&registry, &subject, rows, Utc::now());
        assert!(matches!(result, Err(AuthzError::UnknownRole(_))));
    }

    #[test]
    fn test_unknown_primary_role_fails() {
        let registry = RoleRegistry::field_operations();
        let subject = subject().with_primary_role("LEGACY_ROLE");
        let result = merge_assignments(&registry, &subject, Vec::new(), Utc::now());
        assert!(matches!(result, Err(AuthzError::UnknownRole(_))));
    }

    #[test]
    fn test_inactive_unknown_role_is_ignored() {
        let registry = RoleRegistry::field_operations();
        let subject = subject();
        let mut row = StoredRoleAssignment::new(subject.id, "GHOST", RoleScope::Global);
        row.is_active = false;

        let merged = merge_assignments(&registry, &subject, vec![row], Utc::now()).unwrap();
        assert!(merged.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_unknown_subject_fails_closed() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = AssignmentResolver::new(
            Arc::new(RoleRegistry::field_operations()),
            directory.clone(),
            directory,
        );

        let result = resolver.resolve(Uuid::now_v7(), Utc::now()).await;
        assert!(matches!(result, Err(AuthzError::AssignmentResolution { .. })));
    }

    #[tokio::test]
    async fn test_resolve_store_outage_fails_closed() {
        let directory = Arc::new(MemoryDirectory::new());
        let subject = subject().with_primary_role("VIEWER");
        directory.upsert_subject(subject.clone()).await;
        directory.set_unavailable(true);

        let resolver = AssignmentResolver::new(
            Arc::new(RoleRegistry::field_operations()),
            directory.clone(),
            directory,
        );
        let result = resolver.resolve(subject.id, Utc::now()).await;
        assert!(matches!(result, Err(AuthzError::AssignmentResolution { .. })));
    }

    #[tokio::test]
    async fn test_resolve_merges_store_rows() {
        let directory = Arc::new(MemoryDirectory::new());
        let subject = subject().with_primary_role("FIELD_AGENT");
        directory.upsert_subject(subject.clone()).await;
        directory
            .add_role_assignment(StoredRoleAssignment::new(
                subject.id,
                "REGIONAL_MANAGER",
                RoleScope::Region(subject.home_region_id),
            ))
            .await;

        let resolver = AssignmentResolver::new(
            Arc::new(RoleRegistry::field_operations()),
            directory.clone(),
            directory,
        );
        let effective = resolver.resolve(subject.id, Utc::now()).await.unwrap();
        assert_eq!(effective.subject.id, subject.id);
        assert_eq!(effective.assignments.len(), 2);
        assert_eq!(effective.assignments[0].role(), "REGIONAL_MANAGER");
        assert!(effective.assignments[1].is_synthetic());
    }
}
