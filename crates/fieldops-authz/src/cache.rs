//! Permission cache
//!
//! Short-lived cache of decisions keyed by subject, resource class and a
//! scope key. Writers take a [`CacheFence`] before evaluating; a put whose
//! fence predates an invalidation touching the same subject, resource or
//! resource class is dropped, so a decision computed before a revocation is
//! never served after it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldops_org::ResourceContext;
use fieldops_rbac::{Action, ResourceType};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::decision::Decision;

/// Cache error types.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend could not be reached
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// TTL cannot be represented
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache key for one decision.
///
/// The scope key covers the resource's geographic scope, owners, instance
/// id and the action, so a decision made for one scope is never served for
/// another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    /// Subject the decision was made for
    pub subject_id: Uuid,

    /// Resource class
    pub resource_class: ResourceType,

    /// Resource instance
    pub resource_id: Uuid,

    /// Scope, owners and action
    pub scope_key: String,
}

impl CacheKey {
    /// Build the key for a request.
    ///
    /// # Example
    ///
    /// ```
    /// use fieldops_authz::cache::CacheKey;
    /// use fieldops_org::ResourceContext;
    /// use fieldops_rbac::{Action, ResourceType};
    /// use uuid::Uuid;
    ///
    /// let subject = Uuid::now_v7();
    /// let project = ResourceContext::local(Uuid::now_v7(), ResourceType::Project, Uuid::now_v7());
    /// let read = CacheKey::new(subject, Action::Read, &project);
    /// let update = CacheKey::new(subject, Action::Update, &project);
    /// assert_ne!(read, update);
    /// ```
    pub fn new(subject_id: Uuid, action: Action, resource: &ResourceContext) -> Self {
        let scope_key = format!(
            "{}|team={}|region={}|org={}|{}|{}",
            resource.scope,
            owner(resource.team_id),
            owner(resource.region_id),
            owner(resource.organization_id),
            resource.resource_id,
            action
        );
        Self {
            subject_id,
            resource_class: resource.resource_type,
            resource_id: resource.resource_id,
            scope_key,
        }
    }
}

fn owner(id: Option<Uuid>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Snapshot of the invalidation counter, taken before evaluating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CacheFence(pub u64);

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// Invalidation calls
    pub invalidations: u64,
    /// Puts dropped because an invalidation overtook them
    pub stale_writes_dropped: u64,
    /// Live entries
    pub entries: usize,
}

/// Decision cache seam.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Look up a cached decision.
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Decision>>;

    /// Take a fence to pass to a later [`put`](PermissionCache::put).
    async fn fence(&self) -> CacheResult<CacheFence>;

    /// Store a decision unless an invalidation happened after `fence`.
    ///
    /// # Returns
    ///
    /// Whether the decision was stored.
    async fn put(
        &self,
        key: CacheKey,
        decision: Decision,
        ttl: Duration,
        fence: CacheFence,
    ) -> CacheResult<bool>;

    /// Drop every decision for a subject.
    async fn invalidate_subject(&self, subject_id: Uuid) -> CacheResult<usize>;

    /// Drop every decision about a resource instance.
    async fn invalidate_resource(&self, resource_id: Uuid) -> CacheResult<usize>;

    /// Drop every decision about a resource class.
    async fn invalidate_resource_class(&self, resource_class: ResourceType) -> CacheResult<usize>;

    /// Drop everything.
    async fn clear(&self) -> CacheResult<()>;

    /// Get cache statistics.
    async fn stats(&self) -> CacheStats;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    decision: Decision,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Bumped on every invalidation
    epoch: u64,
    /// Epoch of the last invalidation that applies to every key
    floor: u64,
    subject_epochs: HashMap<Uuid, u64>,
    resource_epochs: HashMap<Uuid, u64>,
    class_epochs: HashMap<ResourceType, u64>,
}

impl CacheState {
    fn latest_invalidation(&self, key: &CacheKey) -> u64 {
        let subject = self.subject_epochs.get(&key.subject_id).copied().unwrap_or(0);
        let resource = self.resource_epochs.get(&key.resource_id).copied().unwrap_or(0);
        let class = self.class_epochs.get(&key.resource_class).copied().unwrap_or(0);
        self.floor.max(subject).max(resource).max(class)
    }

    fn bump(&mut self, epoch_limit: usize) -> u64 {
        self.epoch += 1;
        let tracked =
            self.subject_epochs.len() + self.resource_epochs.len() + self.class_epochs.len();
        if tracked >= epoch_limit {
            // Collapse per-key epochs into the floor; older fences all lose.
            self.subject_epochs.clear();
            self.resource_epochs.clear();
            self.class_epochs.clear();
            self.floor = self.epoch;
        }
        self.epoch
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

/// In-process [`PermissionCache`] with a capacity bound.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use chrono::Utc;
/// use fieldops_authz::cache::{CacheKey, MemoryPermissionCache, PermissionCache};
/// use fieldops_authz::{Decision, ReasonCode};
/// use fieldops_org::ResourceContext;
/// use fieldops_rbac::{Action, ResourceType};
/// use uuid::Uuid;
///
/// async fn example() {
///     let cache = MemoryPermissionCache::new(1_000);
///     let policy = ResourceContext::national(Uuid::now_v7(), ResourceType::Policy);
///     let key = CacheKey::new(Uuid::now_v7(), Action::Read, &policy);
///
///     let fence = cache.fence().await.unwrap();
///     let decision = Decision::deny(ReasonCode::NoMatchingGrant, None, Utc::now());
///     cache.put(key.clone(), decision, Duration::from_secs(60), fence).await.unwrap();
///     assert!(cache.get(&key).await.unwrap().is_some());
/// }
/// ```
pub struct MemoryPermissionCache {
    state: RwLock<CacheState>,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
    stale_writes_dropped: AtomicU64,
}

impl std::fmt::Debug for MemoryPermissionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPermissionCache")
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl MemoryPermissionCache {
    /// Create a cache holding at most `max_entries` decisions.
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    /// Create a cache that reads time from `clock`.
    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            max_entries: max_entries.max(1),
            clock,
            unavailable: AtomicBool::new(false),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            stale_writes_dropped: AtomicU64::new(0),
        }
    }

    /// Simulate a backend outage: reads and writes fail while set.
    ///
    /// Invalidations still apply so a recovered cache never serves stale data.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> CacheResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("memory cache offline".to_string()));
        }
        Ok(())
    }

    async fn invalidate_where<B, F>(&self, record: B, matches: F) -> usize
    where
        B: FnOnce(&mut CacheState, u64),
        F: Fn(&CacheKey) -> bool,
    {
        let mut state = self.state.write().await;
        let epoch = state.bump(self.max_entries);
        record(&mut state, epoch);
        let before = state.entries.len();
        state.entries.retain(|key, _| !matches(key));
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        before - state.entries.len()
    }
}

impl Default for MemoryPermissionCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl PermissionCache for MemoryPermissionCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Decision>> {
        self.check_available()?;
        let now = self.clock.now();
        let state = self.state.read().await;
        match state.entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.decision.clone()))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn fence(&self) -> CacheResult<CacheFence> {
        self.check_available()?;
        Ok(CacheFence(self.state.read().await.epoch))
    }

    async fn put(
        &self,
        key: CacheKey,
        decision: Decision,
        ttl: Duration,
        fence: CacheFence,
    ) -> CacheResult<bool> {
        self.check_available()?;
        let ttl =
            chrono::Duration::from_std(ttl).map_err(|e| CacheError::InvalidTtl(e.to_string()))?;
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            CacheError::InvalidTtl(format!("{}s overflows expiry", ttl.num_seconds()))
        })?;

        let mut state = self.state.write().await;
        if state.latest_invalidation(&key) > fence.0 {
            self.stale_writes_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(subject_id = %key.subject_id, "Dropped stale cache write");
            return Ok(false);
        }

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_entries {
            state.purge_expired(now);
            if state.entries.len() >= self.max_entries {
                let oldest = state
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    state.entries.remove(&oldest);
                }
            }
        }

        state.entries.insert(
            key,
            CacheEntry {
                decision,
                expires_at,
            },
        );
        Ok(true)
    }

    async fn invalidate_subject(&self, subject_id: Uuid) -> CacheResult<usize> {
        let removed = self
            .invalidate_where(
                |state, epoch| {
                    state.subject_epochs.insert(subject_id, epoch);
                },
                |key| key.subject_id == subject_id,
            )
            .await;
        debug!(subject_id = %subject_id, removed, "Invalidated subject decisions");
        Ok(removed)
    }

    async fn invalidate_resource(&self, resource_id: Uuid) -> CacheResult<usize> {
        let removed = self
            .invalidate_where(
                |state, epoch| {
                    state.resource_epochs.insert(resource_id, epoch);
                },
                |key| key.resource_id == resource_id,
            )
            .await;
        debug!(resource_id = %resource_id, removed, "Invalidated resource decisions");
        Ok(removed)
    }

    async fn invalidate_resource_class(&self, resource_class: ResourceType) -> CacheResult<usize> {
        let removed = self
            .invalidate_where(
                |state, epoch| {
                    state.class_epochs.insert(resource_class, epoch);
                },
                |key| key.resource_class == resource_class,
            )
            .await;
        debug!(resource_class = %resource_class, removed, "Invalidated resource class decisions");
        Ok(removed)
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut state = self.state.write().await;
        state.epoch += 1;
        state.floor = state.epoch;
        state.subject_epochs.clear();
        state.resource_epochs.clear();
        state.class_epochs.clear();
        state.entries.clear();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            stale_writes_dropped: self.stale_writes_dropped.load(Ordering::Relaxed),
            entries: self.state.read().await.entries.len(),
        }
    }
}
