//! Decision audit trail
//!
//! Every decision is appended to an [`AuditSink`] before it is returned.
//! The [`AuditLogger`] never fails or stalls the decision: when the primary
//! sink rejects a record, or does not accept it within the deadline, the
//! record goes to a fallback sink and an alert is logged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldops_org::{GeoScope, ResourceContext};
use fieldops_rbac::{Action, ResourceType};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::decision::{Decision, ReasonCode};

/// Audit error types.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Sink could not accept the record
    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),

    /// Record could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Sink did not accept the record in time
    #[error("Audit sink timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// One audited decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditRecord {
    /// Unique record ID
    pub id: Uuid,

    /// Subject that asked
    pub subject_id: Uuid,

    /// Requested action
    pub action: Action,

    /// Resource instance
    pub resource_id: Uuid,

    /// Resource class
    pub resource_type: ResourceType,

    /// Geographic scope of the resource
    pub resource_scope: GeoScope,

    /// Outcome
    pub allowed: bool,

    /// Reason code
    pub reason: ReasonCode,

    /// Rule that decided the outcome
    pub matched_rule: Option<String>,

    /// Whether access relied on national privilege
    pub cross_boundary_access: bool,

    /// Decision tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether the decision was served from the cache
    pub cache_hit: bool,

    /// Whether the decision came from an explain request
    pub explain: bool,

    /// Error detail for operators; never shown to the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the record was written
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Build a record for a decision.
    pub fn new(
        subject_id: Uuid,
        action: Action,
        resource: &ResourceContext,
        decision: &Decision,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            subject_id,
            action,
            resource_id: resource.resource_id,
            resource_type: resource.resource_type,
            resource_scope: resource.scope,
            allowed: decision.allowed,
            reason: decision.reason,
            matched_rule: decision.matched_rule.clone(),
            cross_boundary_access: decision.cross_boundary_access,
            tags: decision.tags(),
            cache_hit: false,
            explain: false,
            error: None,
            recorded_at,
        }
    }

    /// Mark the decision as served from the cache.
    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }

    /// Mark the decision as coming from an explain request.
    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    /// Attach error detail.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Append-only destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one record.
    async fn append(&self, record: &AuditRecord) -> AuditResult<()>;
}

/// In-memory sink, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
    failing: AtomicBool,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every append fail while set.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Records appended so far, oldest first.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, record: &AuditRecord) -> AuditResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::Unavailable("memory sink rejecting writes".to_string()));
        }
        self.records.write().await.push(record.clone());
        Ok(())
    }
}

/// Sink that writes each record as JSON to the `fieldops_authz::audit`
/// tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn append(&self, record: &AuditRecord) -> AuditResult<()> {
        let json =
            serde_json::to_string(record).map_err(|e| AuditError::Serialization(e.to_string()))?;
        info!(
            target: "fieldops_authz::audit",
            record_id = %record.id,
            allowed = record.allowed,
            reason = %record.reason,
            record = %json,
            "Authorization decision"
        );
        Ok(())
    }
}

/// Default deadline for a sink to accept one record.
pub const DEFAULT_AUDIT_TIMEOUT: Duration = Duration::from_millis(250);

/// Writes audit records, falling back when the primary sink fails.
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
    fallback: Arc<dyn AuditSink>,
    timeout: Duration,
    failures: AtomicU64,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("timeout", &self.timeout)
            .field("failures", &self.failures())
            .finish()
    }
}

impl AuditLogger {
    /// Create a logger with the tracing sink as fallback.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self::with_fallback(sink, Arc::new(TracingAuditSink))
    }

    /// Create a logger with a custom fallback sink.
    pub fn with_fallback(sink: Arc<dyn AuditSink>, fallback: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            fallback,
            timeout: DEFAULT_AUDIT_TIMEOUT,
            failures: AtomicU64::new(0),
        }
    }

    /// Set how long each sink may take to accept a record.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append a record. Never fails, and returns within twice the timeout.
    pub async fn record(&self, record: &AuditRecord) {
        let Err(err) = append_within(self.sink.as_ref(), record, self.timeout).await else {
            return;
        };

        self.failures.fetch_add(1, Ordering::Relaxed);
        error!(
            alert = "audit_sink_failure",
            record_id = %record.id,
            subject_id = %record.subject_id,
            error = %err,
            "Audit sink rejected record; writing to fallback"
        );

        let fallback = append_within(self.fallback.as_ref(), record, self.timeout).await;
        if let Err(fallback_err) = fallback {
            error!(
                alert = "audit_sink_failure",
                record = ?record,
                error = %fallback_err,
                "Audit fallback failed"
            );
        }
    }

    /// Number of records the primary sink rejected or timed out on.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

async fn append_within(
    sink: &dyn AuditSink,
    record: &AuditRecord,
    timeout: Duration,
) -> AuditResult<()> {
    tokio::time::timeout(timeout, sink.append(record))
        .await
        .unwrap_or(Err(AuditError::Timeout(timeout)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AuditRecord {
        let resource =
            ResourceContext::local(Uuid::now_v7(), ResourceType::Project, Uuid::now_v7());
        let decision = Decision::allow(
            ReasonCode::RolePermission,
            "role:FIELD_SUPERVISOR@team/local_team_match",
            Utc::now(),
        );
        AuditRecord::new(Uuid::now_v7(), Action::Update, &resource, &decision, Utc::now())
    }

    #[tokio::test]
    async fn test_records_are_appended() {
        let sink = Arc::new(MemoryAuditSink::new());
        let logger = AuditLogger::new(sink.clone());

        let first = record();
        logger.record(&first).await;
        logger.record(&record()).await;

        let records = sink.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], first);
        assert_eq!(logger.failures(), 0);
    }

    #[tokio::test]
    async fn test_sink_failure_uses_fallback() {
        let sink = Arc::new(MemoryAuditSink::new());
        let fallback = Arc::new(MemoryAuditSink::new());
        sink.set_failing(true);
        let logger = AuditLogger::with_fallback(sink.clone(), fallback.clone());

        logger.record(&record()).await;

        assert_eq!(logger.failures(), 1);
        assert!(sink.records().await.is_empty());
        assert_eq!(fallback.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_double_failure_does_not_panic() {
        let sink = Arc::new(MemoryAuditSink::new());
        let fallback = Arc::new(MemoryAuditSink::new());
        sink.set_failing(true);
        fallback.set_failing(true);
        let logger = AuditLogger::with_fallback(sink, fallback);

        logger.record(&record()).await;
        assert_eq!(logger.failures(), 1);
    }

    /// Sink whose writes never complete.
    struct StalledSink;

    #[async_trait]
    impl AuditSink for StalledSink {
        async fn append(&self, _record: &AuditRecord) -> AuditResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_sink_times_out_to_fallback() {
        let fallback = Arc::new(MemoryAuditSink::new());
        let logger = AuditLogger::with_fallback(Arc::new(StalledSink), fallback.clone())
            .with_timeout(Duration::from_millis(100));

        let started = tokio::time::Instant::now();
        logger.record(&record()).await;

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(logger.failures(), 1);
        assert_eq!(fallback.records().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_fallback_still_returns() {
        let sink = Arc::new(MemoryAuditSink::new());
        sink.set_failing(true);
        let logger = AuditLogger::with_fallback(sink, Arc::new(StalledSink))
            .with_timeout(Duration::from_millis(100));

        let result = tokio::time::timeout(Duration::from_secs(1), logger.record(&record())).await;
        assert!(result.is_ok());
        assert_eq!(logger.failures(), 1);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_records() {
        assert!(TracingAuditSink.append(&record()).await.is_ok());
    }

    #[test]
    fn test_record_serialization() {
        let record = record().with_cache_hit(true).with_error("detail");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["reason"], "role_permission");
        assert_eq!(json["action"], "update");
        assert_eq!(json["resource_scope"], "local");
        assert_eq!(json["cache_hit"], true);
        assert_eq!(json["error"], "detail");
    }
}
