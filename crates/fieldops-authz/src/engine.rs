//! Decision engine
//!
//! The [`Authorizer`] answers "may this subject perform this action on this
//! resource?" It consults, in order:
//!
//! 1. The subject's effective role assignments, each checked against the
//!    role's permission set and the boundary rules
//! 2. Direct resource assignments to the subject
//! 3. Team resource assignments to any team the subject currently belongs to
//!
//! The first grant found allows. Otherwise the request is denied, with
//! `boundary_violation` when a role permission matched but the boundary
//! blocked it. Any error during evaluation denies with
//! `authorization_error`; `authorize` itself never fails.
//!
//! Decisions are cached (see [`PermissionCache`]) and every decision,
//! cached or not, is audited before it is returned.

use chrono::{DateTime, Utc};
use fieldops_org::{ResourceContext, Subject};
use fieldops_rbac::{Action, Permission, ResourceType};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::assignment::{Grantee, ResourceAssignment};
use crate::audit::{AuditLogger, AuditRecord, AuditSink, TracingAuditSink};
use crate::boundary::{is_in_boundary, BoundaryContext, Reach};
use crate::cache::{CacheFence, CacheKey, CacheStats, MemoryPermissionCache, PermissionCache};
use crate::clock::{Clock, SystemClock};
use crate::config::AuthzConfig;
use crate::decision::{Decision, ReasonCode, Trace, TraceStage};
use crate::error::{AuthzError, AuthzResult};
use crate::registry::RoleRegistry;
use crate::resolver::AssignmentResolver;
use crate::store::{MembershipStore, ResourceAssignmentStore, Stores};

/// Builder for [`Authorizer`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use fieldops_authz::{AuthorizerBuilder, AuthzConfig, RoleRegistry};
/// use fieldops_authz::audit::MemoryAuditSink;
/// use fieldops_authz::store::{MemoryDirectory, Stores};
///
/// let directory = Arc::new(MemoryDirectory::new());
/// let stores = Stores::shared(directory);
/// let authorizer = AuthorizerBuilder::new(RoleRegistry::field_operations(), stores)
///     .config(AuthzConfig::from_env())
///     .audit_sink(Arc::new(MemoryAuditSink::new()))
///     .build()
///     .expect("valid configuration");
/// ```
pub struct AuthorizerBuilder {
    registry: RoleRegistry,
    stores: Stores,
    config: AuthzConfig,
    clock: Option<Arc<dyn Clock>>,
    cache: Option<Arc<dyn PermissionCache>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    fallback: Option<Arc<dyn AuditSink>>,
}

impl AuthorizerBuilder {
    /// Start a builder with default configuration.
    pub fn new(registry: RoleRegistry, stores: Stores) -> Self {
        Self {
            registry,
            stores,
            config: AuthzConfig::default(),
            clock: None,
            cache: None,
            audit_sink: None,
            fallback: None,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: AuthzConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the time source (defaults to the system clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a custom decision cache instead of the in-process one.
    pub fn cache(mut self, cache: Arc<dyn PermissionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the audit sink (defaults to [`TracingAuditSink`]).
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    /// Set the sink used when the audit sink fails (defaults to [`TracingAuditSink`]).
    pub fn audit_fallback(mut self, fallback: Arc<dyn AuditSink>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Build the authorizer.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration is invalid.
    pub fn build(self) -> AuthzResult<Authorizer> {
        self.config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = if self.config.cache_enabled {
            Some(self.cache.unwrap_or_else(|| {
                Arc::new(MemoryPermissionCache::with_clock(
                    self.config.cache_max_entries,
                    clock.clone(),
                ))
            }))
        } else {
            None
        };

        let sink = self.audit_sink.unwrap_or_else(|| Arc::new(TracingAuditSink));
        let fallback = self.fallback.unwrap_or_else(|| Arc::new(TracingAuditSink));
        let audit =
            AuditLogger::with_fallback(sink, fallback).with_timeout(self.config.audit_timeout());

        let registry = Arc::new(self.registry);
        let resolver = AssignmentResolver::new(
            registry.clone(),
            self.stores.subjects,
            self.stores.role_assignments,
        );

        Ok(Authorizer {
            config: self.config,
            registry,
            resolver,
            resources: self.stores.resource_assignments,
            memberships: self.stores.memberships,
            cache,
            audit,
            clock,
        })
    }
}

/// The authorization decision engine.
pub struct Authorizer {
    config: AuthzConfig,
    registry: Arc<RoleRegistry>,
    resolver: AssignmentResolver,
    resources: Arc<dyn ResourceAssignmentStore>,
    memberships: Arc<dyn MembershipStore>,
    cache: Option<Arc<dyn PermissionCache>>,
    audit: AuditLogger,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("config", &self.config)
            .field("roles", &self.registry.len())
            .field("cache_enabled", &self.cache.is_some())
            .finish()
    }
}

impl Authorizer {
    /// Decide whether `subject_id` may perform `action` on `resource`.
    ///
    /// Never fails: evaluation errors deny with `authorization_error`.
    #[instrument(
        skip_all,
        fields(
            subject_id = %subject_id,
            action = %action,
            resource_id = %resource.resource_id,
            resource_type = %resource.resource_type
        )
    )]
    pub async fn authorize(
        &self,
        subject_id: Uuid,
        action: Action,
        resource: &ResourceContext,
    ) -> Decision {
        let key = CacheKey::new(subject_id, action, resource);

        if let Some(cache) = &self.cache {
            match cache.get(&key).await {
                Ok(Some(decision)) => {
                    debug!(allowed = decision.allowed, reason = %decision.reason, "Cache hit");
                    let record =
                        AuditRecord::new(subject_id, action, resource, &decision, self.clock.now())
                            .with_cache_hit(true);
                    self.audit.record(&record).await;
                    return decision;
                }
                Ok(None) => debug!("Cache miss"),
                Err(e) => warn!(error = %e, "Permission cache lookup failed; evaluating"),
            }
        }

        let fence = self.take_fence().await;
        let now = self.clock.now();
        let mut trace = Trace::new(false);
        let result = self.evaluate(subject_id, action, resource, now, &mut trace).await;

        let (decision, failure) = match result {
            Ok(decision) => (decision, None),
            Err(e) => (self.fail_closed(&e, now), Some(e)),
        };

        if failure.is_none() {
            if let (Some(cache), Some(fence)) = (&self.cache, fence) {
                match cache
                    .put(key, decision.clone(), self.config.cache_ttl(), fence)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => debug!("Decision not cached; invalidated during evaluation"),
                    Err(e) => warn!(error = %e, "Failed to cache decision"),
                }
            }
        }

        let mut record = AuditRecord::new(subject_id, action, resource, &decision, now);
        if let Some(e) = failure {
            record = record.with_error(e.to_string());
        }
        self.audit.record(&record).await;

        decision
    }

    /// Like [`authorize`](Self::authorize), but bypasses the cache and
    /// returns the full rule trace. Still audited.
    #[instrument(
        skip_all,
        fields(
            subject_id = %subject_id,
            action = %action,
            resource_id = %resource.resource_id
        )
    )]
    pub async fn explain(
        &self,
        subject_id: Uuid,
        action: Action,
        resource: &ResourceContext,
    ) -> Decision {
        let now = self.clock.now();
        let mut trace = Trace::new(true);
        let result = self.evaluate(subject_id, action, resource, now, &mut trace).await;

        let (decision, failure) = match result {
            Ok(decision) => (decision, None),
            Err(e) => (self.fail_closed(&e, now), Some(e)),
        };
        trace.record(TraceStage::Outcome, decision.allowed, || match &failure {
            Some(e) => format!("{} ({})", decision.reason, e),
            None => decision.reason.to_string(),
        });

        let mut record =
            AuditRecord::new(subject_id, action, resource, &decision, now).with_explain(true);
        if let Some(e) = failure {
            record = record.with_error(e.to_string());
        }
        self.audit.record(&record).await;

        decision.with_trace(trace.into_steps())
    }

    async fn take_fence(&self) -> Option<CacheFence> {
        let cache = self.cache.as_ref()?;
        match cache.fence().await {
            Ok(fence) => Some(fence),
            Err(e) => {
                warn!(error = %e, "Failed to take cache fence; decision will not be cached");
                None
            }
        }
    }

    fn fail_closed(&self, err: &AuthzError, now: DateTime<Utc>) -> Decision {
        error!(error_code = err.error_code(), error = %err, "Authorization failed closed");
        Decision::deny(ReasonCode::AuthorizationError, None, now)
    }

    async fn evaluate(
        &self,
        subject_id: Uuid,
        action: Action,
        resource: &ResourceContext,
        now: DateTime<Utc>,
        trace: &mut Trace,
    ) -> AuthzResult<Decision> {
        let ctx = BoundaryContext::from_resource(resource)?;
        let effective = self.resolver.resolve(subject_id, now).await?;
        trace.record(TraceStage::Resolve, true, || {
            let labels: Vec<String> = effective.assignments.iter().map(|a| a.label()).collect();
            format!("effective assignments: [{}]", labels.join(", "))
        });

        let permission = Permission::new(resource.resource_type, action);
        let mut blocked: Option<String> = None;

        for assignment in &effective.assignments {
            let definition = self.registry.definition(assignment.role())?;
            let label = assignment.label();

            let Some(entry) = definition.permissions.matching_entry(&permission) else {
                trace.record(TraceStage::RolePermission, false, || {
                    format!("{} does not grant {}", label, permission)
                });
                continue;
            };
            trace.record(TraceStage::RolePermission, true, || {
                format!("{} grants {} via {}", label, permission, entry)
            });

            let reach = Reach::for_assignment(
                &effective.subject,
                assignment.scope(),
                definition.is_national(),
            );
            let outcome = is_in_boundary(&reach, &ctx);
            trace.record(TraceStage::Boundary, outcome.satisfied, || {
                format!("{}: {}", label, outcome.rule_id)
            });

            let rule = format!("{}/{}", label, outcome.rule_id);
            if outcome.satisfied {
                debug!(matched_rule = %rule, "Role permission matched");
                return Ok(Decision::allow(ReasonCode::RolePermission, rule, now)
                    .with_cross_boundary(outcome.cross_boundary));
            }
            if blocked.is_none() {
                blocked = Some(rule);
            }
        }

        let mut grants = self
            .resources
            .resource_assignments(resource.resource_id)
            .await
            .map_err(|e| AuthzError::AssignmentResolution {
                subject_id,
                message: e.to_string(),
            })?;
        grants.retain(|grant| {
            grant.resource_id == resource.resource_id && grant.is_effective(now)
        });
        grants.sort_by_key(|grant| grant.id);

        if let Some(decision) = direct_grant(&grants, subject_id, action, now, trace) {
            return Ok(decision);
        }

        let team_grants: Vec<&ResourceAssignment> = grants
            .iter()
            .filter(|grant| matches!(grant.grantee, Grantee::Team(_)))
            .collect();
        if !team_grants.is_empty() {
            let teams = self.current_teams(&effective.subject, now).await?;
            for grant in team_grants {
                let Grantee::Team(team_id) = grant.grantee else {
                    continue;
                };
                let member = teams.contains(&team_id);
                let covers = grant.scope.covers(action);
                trace.record(TraceStage::TeamAssignment, member && covers, || {
                    format!(
                        "team_assignment:{}:{}:{} (member: {}, covers {}: {})",
                        grant.id, team_id, grant.scope, member, action, covers
                    )
                });
                if member && covers {
                    let rule = format!("team_assignment:{}:{}:{}", grant.id, team_id, grant.scope);
                    debug!(matched_rule = %rule, "Team assignment matched");
                    return Ok(Decision::allow(ReasonCode::TeamAssignment, rule, now));
                }
            }
        }

        Ok(match blocked {
            Some(rule) => {
                debug!(matched_rule = %rule, "Denied by boundary");
                Decision::deny(ReasonCode::BoundaryViolation, Some(rule), now)
            }
            None => {
                debug!("No matching grant");
                Decision::deny(ReasonCode::NoMatchingGrant, None, now)
            }
        })
    }

    /// Home team plus every current membership.
    async fn current_teams(
        &self,
        subject: &Subject,
        now: DateTime<Utc>,
    ) -> AuthzResult<BTreeSet<Uuid>> {
        let memberships = self
            .memberships
            .memberships(subject.id)
            .await
            .map_err(|e| AuthzError::AssignmentResolution {
                subject_id: subject.id,
                message: e.to_string(),
            })?;

        let mut teams: BTreeSet<Uuid> = memberships
            .into_iter()
            .filter(|m| m.subject_id == subject.id && m.is_current(now))
            .map(|m| m.team_id)
            .collect();
        teams.insert(subject.home_team_id);
        Ok(teams)
    }

    /// A subject's role assignments changed.
    pub async fn role_assignments_changed(&self, subject_id: Uuid) -> AuthzResult<()> {
        if let Some(cache) = &self.cache {
            cache.invalidate_subject(subject_id).await?;
        }
        Ok(())
    }

    /// A resource's direct or team assignments changed.
    pub async fn resource_assignments_changed(&self, resource_id: Uuid) -> AuthzResult<()> {
        if let Some(cache) = &self.cache {
            cache.invalidate_resource(resource_id).await?;
        }
        Ok(())
    }

    /// A subject's team memberships changed.
    pub async fn memberships_changed(&self, subject_id: Uuid) -> AuthzResult<()> {
        self.role_assignments_changed(subject_id).await
    }

    /// A subject's home units or primary role changed.
    pub async fn subject_changed(&self, subject_id: Uuid) -> AuthzResult<()> {
        self.role_assignments_changed(subject_id).await
    }

    /// Ownership or scope of resources of one class changed in bulk.
    pub async fn resource_class_changed(&self, resource_class: ResourceType) -> AuthzResult<()> {
        if let Some(cache) = &self.cache {
            cache.invalidate_resource_class(resource_class).await?;
        }
        Ok(())
    }

    /// Role definitions changed; drops every cached decision.
    pub async fn roles_changed(&self) -> AuthzResult<()> {
        if let Some(cache) = &self.cache {
            cache.clear().await?;
        }
        Ok(())
    }

    /// Cache statistics, if caching is enabled.
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    /// Number of audit records the primary sink rejected.
    pub fn audit_failures(&self) -> u64 {
        self.audit.failures()
    }

    /// The role registry.
    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }
}

fn direct_grant(
    grants: &[ResourceAssignment],
    subject_id: Uuid,
    action: Action,
    now: DateTime<Utc>,
    trace: &mut Trace,
) -> Option<Decision> {
    for grant in grants
        .iter()
        .filter(|grant| grant.grantee == Grantee::Subject(subject_id))
    {
        let covers = grant.scope.covers(action);
        trace.record(TraceStage::DirectAssignment, covers, || {
            format!(
                "direct_assignment:{}:{} covers {}: {}",
                grant.id, grant.scope, action, covers
            )
        });
        if covers {
            let rule = format!("direct_assignment:{}:{}", grant.id, grant.scope);
            debug!(matched_rule = %rule, "Direct assignment matched");
            return Some(Decision::allow(ReasonCode::DirectAssignment, rule, now));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::StoredRoleAssignment;
    use crate::audit::MemoryAuditSink;
    use crate::clock::ManualClock;
    use crate::store::MemoryDirectory;
    use fieldops_org::{GeoScope, RoleScope, TeamMembership};
    use fieldops_rbac::GrantScope;

    struct Fixture {
        directory: Arc<MemoryDirectory>,
        audit: Arc<MemoryAuditSink>,
        clock: Arc<ManualClock>,
        authorizer: Authorizer,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(MemoryDirectory::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let stores = Stores::shared(directory.clone());
        let authorizer = AuthorizerBuilder::new(RoleRegistry::field_operations(), stores)
            .clock(clock.clone())
            .audit_sink(audit.clone())
            .build()
            .unwrap();
        Fixture {
            directory,
            audit,
            clock,
            authorizer,
        }
    }

    async fn subject(directory: &MemoryDirectory, role: Option<&str>) -> Subject {
        let mut subject =
            Subject::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        if let Some(role) = role {
            subject = subject.with_primary_role(role);
        }
        directory.upsert_subject(subject.clone()).await;
        subject
    }

    #[tokio::test]
    async fn test_role_permission_in_own_team() {
        let fx = fixture();
        let agent = subject(&fx.directory, Some("FIELD_AGENT")).await;
        let task = ResourceContext::local(Uuid::now_v7(), ResourceType::Task, agent.home_team_id);

        let decision = fx.authorizer.authorize(agent.id, Action::Execute, &task).await;
        assert!(decision.allowed);
        assert_eq!(decision.reason, ReasonCode::RolePermission);
        assert_eq!(
            decision.matched_rule.as_deref(),
            Some(format!("role:FIELD_AGENT@team:{}/local_team_match", agent.home_team_id).as_str())
        );
        assert!(!decision.cross_boundary_access);
    }

    #[tokio::test]
    async fn test_foreign_team_is_boundary_violation() {
        let fx = fixture();
        let agent = subject(&fx.directory, Some("FIELD_AGENT")).await;
        let task = ResourceContext::local(Uuid::now_v7(), ResourceType::Task, Uuid::now_v7());

        let decision = fx.authorizer.authorize(agent.id, Action::Execute, &task).await;
        assert!(!decision.allowed);
        assert_eq!(decision.reason, ReasonCode::BoundaryViolation);
        assert!(decision.matched_rule.unwrap().ends_with("/outside_boundary"));
    }

    #[tokio::test]
    async fn test_no_permission_is_no_matching_grant() {
        let fx = fixture();
        let viewer = subject(&fx.directory, Some("VIEWER")).await;
        let device = ResourceContext::national(Uuid::now_v7(), ResourceType::Device);

        let decision = fx.authorizer.authorize(viewer.id, Action::Delete, &device).await;
        assert!(!decision.allowed);
        assert_eq!(decision.reason, ReasonCode::NoMatchingGrant);
        assert!(decision.matched_rule.is_none());
    }

    #[tokio::test]
    async fn test_later_assignment_can_allow_after_boundary_block() {
        let fx = fixture();
        let supervisor = subject(&fx.directory, Some("FIELD_SUPERVISOR")).await;
        let other_team = Uuid::now_v7();
        fx.directory
            .add_role_assignment(StoredRoleAssignment::new(
                supervisor.id,
                "FIELD_AGENT",
                RoleScope::Team(other_team),
            ))
            .await;
        let project = ResourceContext::local(Uuid::now_v7(), ResourceType::Project, other_team);

        let decision = fx.authorizer.authorize(supervisor.id, Action::Read, &project).await;
        assert!(decision.allowed);
        assert_eq!(
            decision.matched_rule.as_deref(),
            Some(format!("role:FIELD_AGENT@team:{}/local_team_match", other_team).as_str())
        );
    }

    #[tokio::test]
    async fn test_team_assignment_through_membership() {
        let fx = fixture();
        let member = subject(&fx.directory, None).await;
        let team_id = Uuid::now_v7();
        let form = ResourceContext::local(Uuid::now_v7(), ResourceType::Form, Uuid::now_v7());

        let grant =
            ResourceAssignment::for_team(form.resource_id, team_id, GrantScope::Participate);
        fx.directory.add_resource_assignment(grant).await;

        let decision = fx.authorizer.authorize(member.id, Action::Participate, &form).await;
        assert_eq!(decision.reason, ReasonCode::NoMatchingGrant);

        fx.directory.add_membership(TeamMembership::new(team_id, member.id)).await;
        fx.authorizer.memberships_changed(member.id).await.unwrap();

        let decision = fx.authorizer.authorize(member.id, Action::Participate, &form).await;
        assert!(decision.allowed);
        assert_eq!(decision.reason, ReasonCode::TeamAssignment);
        assert!(decision.matched_rule.unwrap().contains(&team_id.to_string()));
    }

    #[tokio::test]
    async fn test_home_team_receives_team_assignments() {
        let fx = fixture();
        let member = subject(&fx.directory, None).await;
        let report = ResourceContext::national(Uuid::now_v7(), ResourceType::Report);
        fx.directory
            .add_resource_assignment(ResourceAssignment::for_team(
                report.resource_id,
                member.home_team_id,
                GrantScope::Read,
            ))
            .await;

        let decision = fx.authorizer.authorize(member.id, Action::Export, &report).await;
        assert_eq!(decision.reason, ReasonCode::TeamAssignment);
    }

    #[tokio::test]
    async fn test_ended_membership_grants_nothing() {
        let fx = fixture();
        let member = subject(&fx.directory, None).await;
        let team_id = Uuid::now_v7();
        let form = ResourceContext::local(Uuid::now_v7(), ResourceType::Form, team_id);
        fx.directory
            .add_resource_assignment(ResourceAssignment::for_team(
                form.resource_id,
                team_id,
                GrantScope::Manage,
            ))
            .await;
        let ends_at = fx.clock.now() + chrono::Duration::minutes(5);
        fx.directory
            .add_membership(TeamMembership::new(team_id, member.id).ending_at(ends_at))
            .await;

        assert!(fx.authorizer.explain(member.id, Action::Update, &form).await.allowed);
        fx.clock.advance(chrono::Duration::minutes(5));
        assert!(!fx.authorizer.explain(member.id, Action::Update, &form).await.allowed);
    }

    #[tokio::test]
    async fn test_malformed_context_fails_closed() {
        let fx = fixture();
        let admin = subject(&fx.directory, Some("SYSTEM_ADMIN")).await;
        let broken = ResourceContext::new(Uuid::now_v7(), ResourceType::Project, GeoScope::Local);

        let decision = fx.authorizer.authorize(admin.id, Action::Read, &broken).await;
        assert!(!decision.allowed);
        assert_eq!(decision.reason, ReasonCode::AuthorizationError);

        let records = fx.audit.records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].error.as_deref().unwrap().contains("no owning team"));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let fx = fixture();
        let agent = subject(&fx.directory, Some("FIELD_AGENT")).await;
        let task = ResourceContext::local(Uuid::now_v7(), ResourceType::Task, agent.home_team_id);

        fx.directory.set_unavailable(true);
        let decision = fx.authorizer.authorize(agent.id, Action::Execute, &task).await;
        assert_eq!(decision.reason, ReasonCode::AuthorizationError);

        fx.directory.set_unavailable(false);
        let decision = fx.authorizer.authorize(agent.id, Action::Execute, &task).await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_cache_hit_is_audited() {
        let fx = fixture();
        let agent = subject(&fx.directory, Some("FIELD_AGENT")).await;
        let task = ResourceContext::local(Uuid::now_v7(), ResourceType::Task, agent.home_team_id);

        let first = fx.authorizer.authorize(agent.id, Action::Execute, &task).await;
        let second = fx.authorizer.authorize(agent.id, Action::Execute, &task).await;
        assert!(first.allowed);
        assert_eq!(first, second);

        let records = fx.audit.records().await;
        assert_eq!(records.len(), 2);
        assert!(!records[0].cache_hit);
        assert!(records[1].cache_hit);
        assert_eq!(fx.authorizer.cache_stats().await.unwrap().hits, 1);
    }

    #[tokio::test]
    async fn test_explain_trace() {
        let fx = fixture();
        let agent = subject(&fx.directory, Some("FIELD_AGENT")).await;
        let project = ResourceContext::local(Uuid::now_v7(), ResourceType::Project, Uuid::now_v7());

        let decision = fx.authorizer.explain(agent.id, Action::Read, &project).await;
        assert_eq!(decision.reason, ReasonCode::BoundaryViolation);

        let stages: Vec<TraceStage> = decision.trace.iter().map(|s| s.stage).collect();
        assert_eq!(stages.first(), Some(&TraceStage::Resolve));
        assert!(stages.contains(&TraceStage::Boundary));
        assert_eq!(stages.last(), Some(&TraceStage::Outcome));

        let records = fx.audit.records().await;
        assert!(records[0].explain);
        assert_eq!(fx.authorizer.cache_stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_caching_disabled() {
        let directory = Arc::new(MemoryDirectory::new());
        let stores = Stores::shared(directory.clone());
        let authorizer = AuthorizerBuilder::new(RoleRegistry::field_operations(), stores)
            .config(AuthzConfig {
                cache_enabled: false,
                ..AuthzConfig::default()
            })
            .audit_sink(Arc::new(MemoryAuditSink::new()))
            .build()
            .unwrap();
        let viewer = subject(&directory, Some("VIEWER")).await;
        let report = ResourceContext::national(Uuid::now_v7(), ResourceType::Report);

        authorizer.authorize(viewer.id, Action::Read, &report).await;
        assert!(authorizer.cache_stats().await.is_none());
        assert!(authorizer.role_assignments_changed(viewer.id).await.is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = AuthorizerBuilder::new(
            RoleRegistry::field_operations(),
            Stores::shared(Arc::new(MemoryDirectory::new())),
        )
        .config(AuthzConfig {
            cache_ttl_secs: 0,
            ..AuthzConfig::default()
        })
        .build();
        assert!(matches!(result, Err(AuthzError::Config(_))));
    }
}
