//! Sharded registry of per-key limiters.
//!
//! Limiters are created on first use and dropped after an idle period by a
//! timer task spawned alongside each one. The timer re-arms from the key's
//! last activity, so every acquire or release pushes eviction back, and a key
//! with outstanding permits is never evicted.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{RateLimited, Rejected};
use crate::limiter::{KeyLimiter, Permit};
use crate::policy::{Policy, RateLimitKey};

/// Default idle period before a key's limiter is discarded.
pub const DEFAULT_IDLE_EVICTION: Duration = Duration::from_secs(600);

struct Inner {
    name: &'static str,
    policy: Arc<Policy>,
    idle: Duration,
    limiters: DashMap<RateLimitKey, Arc<KeyLimiter>>,
    cancel: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Snapshot of a registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    /// Registry name.
    pub name: &'static str,
    /// Keys with a live limiter.
    pub active_keys: usize,
    /// Permits running or queued across all keys.
    pub outstanding: usize,
}

/// Per-key limiters bound to one [`Policy`].
///
/// Cheap to clone; clones share the same limiters.
#[derive(Clone)]
pub struct RateLimitRegistry {
    inner: Arc<Inner>,
}

impl RateLimitRegistry {
    /// Registry with the default idle period.
    pub fn new(name: &'static str, policy: Policy) -> Self {
        Self::with_idle(name, policy, DEFAULT_IDLE_EVICTION, CancellationToken::new())
    }

    /// Registry with an explicit idle period. Eviction timers stop when
    /// `cancel` fires or the last clone is dropped; dropping the registry
    /// never cancels `cancel` itself.
    pub fn with_idle(
        name: &'static str,
        policy: Policy,
        idle: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                policy: Arc::new(policy),
                idle,
                limiters: DashMap::new(),
                cancel: cancel.child_token(),
            }),
        }
    }

    /// Policy every key follows.
    pub fn policy(&self) -> &Policy {
        &self.inner.policy
    }

    /// Consume one unit of `key`'s quota and reserve a queue position.
    ///
    /// Never waits. Fails when the quota is exhausted or the key already has
    /// `max_concurrent + max_queued` permits outstanding.
    pub fn acquire(&self, key: RateLimitKey) -> Result<Permit, Rejected> {
        if let Some(limiter) = self.inner.limiters.get(&key) {
            limiter.try_acquire()?;
            return Ok(Permit::new(key, Arc::clone(limiter.value())));
        }

        let entry = self.inner.limiters.entry(key).or_insert_with(|| {
            let limiter = Arc::new(KeyLimiter::new(Arc::clone(&self.inner.policy)));
            self.spawn_eviction(key, &limiter);
            trace!(registry = self.inner.name, %key, "limiter created");
            limiter
        });
        entry.try_acquire()?;
        Ok(Permit::new(key, Arc::clone(entry.value())))
    }

    /// Release a permit before it ran. Equivalent to dropping it.
    pub fn release(&self, permit: Permit) {
        drop(permit);
    }

    /// Acquire a permit for `key` and run `task` through the scheduler.
    pub async fn schedule<F, T>(&self, key: RateLimitKey, task: F) -> Result<T, RateLimited>
    where
        F: Future<Output = T>,
    {
        let permit = self.acquire(key).map_err(|reason| {
            debug!(registry = self.inner.name, %key, %reason, "task rejected");
            RateLimited { key, reason }
        })?;
        Ok(permit.run(task).await)
    }

    /// Units left in `key`'s current window; a full bucket for unseen keys.
    pub fn remaining(&self, key: RateLimitKey) -> u32 {
        self.inner
            .limiters
            .get(&key)
            .map_or(self.inner.policy.capacity, |l| l.remaining())
    }

    /// Keys with a live limiter.
    pub fn active_keys(&self) -> usize {
        self.inner.limiters.len()
    }

    /// Current key and permit counts.
    pub fn stats(&self) -> RegistryStats {
        let outstanding = self
            .inner
            .limiters
            .iter()
            .map(|entry| entry.value().outstanding())
            .sum();
        RegistryStats {
            name: self.inner.name,
            active_keys: self.inner.limiters.len(),
            outstanding,
        }
    }

    /// Drop every limiter. Outstanding permits keep working against the
    /// detached state; the next acquire for their key starts fresh.
    pub fn clear(&self) {
        self.inner.limiters.clear();
    }

    fn spawn_eviction(&self, key: RateLimitKey, limiter: &Arc<KeyLimiter>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let registry = Arc::downgrade(&self.inner);
        let limiter = Arc::downgrade(limiter);
        let cancel = self.inner.cancel.clone();
        let idle = self.inner.idle;
        let _ = handle.spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = evict_when_idle(registry, limiter, key, idle) => {}
            }
        });
    }
}

async fn evict_when_idle(
    registry: Weak<Inner>,
    limiter: Weak<KeyLimiter>,
    key: RateLimitKey,
    idle: Duration,
) {
    loop {
        let Some(deadline) = limiter.upgrade().map(|l| l.idle_deadline(idle)) else {
            return;
        };
        tokio::time::sleep_until(deadline).await;

        let (Some(inner), Some(current)) = (registry.upgrade(), limiter.upgrade()) else {
            return;
        };
        let now = Instant::now();
        let removed = inner.limiters.remove_if(&key, |_, live| {
            Arc::ptr_eq(live, &current) && current.is_evictable(idle, now)
        });
        if removed.is_some() {
            trace!(registry = inner.name, %key, "idle limiter evicted");
            return;
        }
        if !inner
            .limiters
            .get(&key)
            .is_some_and(|live| Arc::ptr_eq(live.value(), &current))
        {
            return;
        }
        if current.outstanding() > 0 && current.idle_deadline(idle) <= now {
            // Busy past the deadline; check again after another idle period.
            tokio::time::sleep(idle).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use learnverse_core::{ChatId, UserId};
    use parking_lot::Mutex;

    const USER: RateLimitKey = RateLimitKey::User(UserId(42));

    fn spacing_free(capacity: u32, max_concurrent: usize, max_queued: usize) -> Policy {
        Policy {
            capacity,
            refill_amount: capacity,
            refill_interval: Duration::from_secs(60),
            max_concurrent,
            min_spacing: Duration::ZERO,
            max_queued,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sixth_classifier_call_in_window_is_rate_limited() {
        let registry = RateLimitRegistry::new("classifier", Policy::classifier());
        for _ in 0..5 {
            registry.schedule(USER, async {}).await.unwrap();
        }
        let err = registry.schedule(USER, async {}).await.unwrap_err();
        assert_eq!(err.key, USER);
        assert_matches!(err.reason, Rejected::QuotaExhausted { .. });
    }

    #[tokio::test(start_paused = true)]
    async fn quota_returns_after_refill_interval() {
        let registry = RateLimitRegistry::new("test", spacing_free(1, 1, 1));
        registry.schedule(USER, async {}).await.unwrap();
        assert!(registry.schedule(USER, async {}).await.is_err());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(registry.schedule(USER, async {}).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let registry = RateLimitRegistry::new("test", spacing_free(1, 1, 0));
        let _held = registry.acquire(USER).unwrap();
        assert!(registry.acquire(RateLimitKey::User(UserId(7))).is_ok());
        assert!(registry.acquire(RateLimitKey::Conversation(ChatId(42))).is_ok());
        assert_eq!(registry.active_keys(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn outstanding_ceiling_rejects_immediately() {
        let registry = RateLimitRegistry::new("test", spacing_free(10, 1, 1));
        let _a = registry.acquire(USER).unwrap();
        let _b = registry.acquire(USER).unwrap();
        assert_matches!(registry.acquire(USER), Err(Rejected::Saturated));
        assert_eq!(registry.stats().outstanding, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn starts_are_spaced() {
        let registry = RateLimitRegistry::new("classifier", Policy::classifier());
        let first = registry.schedule(USER, async { Instant::now() }).await.unwrap();
        let second = registry.schedule(USER, async { Instant::now() }).await.unwrap();
        assert!(second - first >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_capped() {
        let registry = RateLimitRegistry::new("test", spacing_free(10, 2, 3));
        let running = Arc::new(Mutex::new((0usize, 0usize)));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let permit = registry.acquire(USER).unwrap();
            let running = Arc::clone(&running);
            handles.push(tokio::spawn(permit.run(async move {
                {
                    let mut r = running.lock();
                    r.0 += 1;
                    r.1 = r.1.max(r.0);
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
                running.lock().0 -= 1;
            })));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(running.lock().1, 2);
        assert_eq!(registry.stats().outstanding, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_key_is_evicted() {
        let registry = RateLimitRegistry::with_idle(
            "test",
            spacing_free(5, 1, 1),
            Duration::from_secs(600),
            CancellationToken::new(),
        );
        registry.schedule(USER, async {}).await.unwrap();
        assert_eq!(registry.active_keys(), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        registry.schedule(USER, async {}).await.unwrap();
        tokio::time::sleep(Duration::from_secs(400)).await;
        settle().await;
        assert_eq!(registry.active_keys(), 1, "activity resets the idle timer");

        tokio::time::sleep(Duration::from_secs(201)).await;
        settle().await;
        assert_eq!(registry.active_keys(), 0);
        assert_eq!(registry.remaining(USER), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn key_with_outstanding_permit_is_kept() {
        let registry = RateLimitRegistry::with_idle(
            "test",
            spacing_free(5, 1, 1),
            Duration::from_secs(10),
            CancellationToken::new(),
        );
        let held = registry.acquire(USER).unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(registry.active_keys(), 1);

        drop(held);
        tokio::time::sleep(Duration::from_secs(25)).await;
        settle().await;
        assert_eq!(registry.active_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_registry_stops_evicting() {
        let cancel = CancellationToken::new();
        let registry = RateLimitRegistry::with_idle(
            "test",
            spacing_free(5, 1, 1),
            Duration::from_secs(10),
            cancel.clone(),
        );
        drop(registry.acquire(USER).unwrap());
        cancel.cancel();
        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(registry.active_keys(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_registry_leaves_shared_token_alone() {
        let app = CancellationToken::new();
        let registry = RateLimitRegistry::with_idle(
            "test",
            spacing_free(5, 1, 1),
            Duration::from_secs(10),
            app.clone(),
        );
        let sibling = RateLimitRegistry::with_idle(
            "sibling",
            spacing_free(5, 1, 1),
            Duration::from_secs(10),
            app.clone(),
        );
        drop(registry.acquire(USER).unwrap());
        drop(sibling.acquire(USER).unwrap());
        drop(registry);
        settle().await;
        assert!(!app.is_cancelled());

        // The surviving registry still evicts on its own schedule.
        tokio::time::sleep(Duration::from_secs(11)).await;
        settle().await;
        assert_eq!(sibling.active_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_quota() {
        let registry = RateLimitRegistry::new("test", spacing_free(1, 1, 1));
        registry.schedule(USER, async {}).await.unwrap();
        assert_eq!(registry.remaining(USER), 0);
        registry.clear();
        assert_eq!(registry.active_keys(), 0);
        assert_eq!(registry.remaining(USER), 1);
    }

    #[test]
    fn acquire_works_outside_a_runtime() {
        let registry = RateLimitRegistry::new("test", spacing_free(1, 1, 1));
        let permit = registry.acquire(USER).unwrap();
        registry.release(permit);
        assert_eq!(registry.stats().outstanding, 0);
    }
}
