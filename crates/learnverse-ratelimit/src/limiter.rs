//! Per-key limiter state and permits.
//!
//! A [`KeyLimiter`] owns one token bucket plus the counters the scheduler
//! needs: permits waiting for a slot, permits running, and the time the last
//! task started. Refill is lazy: the bucket is topped up for every whole
//! interval that elapsed whenever the state is touched.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::Rejected;
use crate::policy::{Policy, RateLimitKey};

#[derive(Debug)]
struct LimiterState {
    tokens: u32,
    window_start: Instant,
    queued: usize,
    running: usize,
    last_start: Option<Instant>,
    last_activity: Instant,
}

/// Limiter for one key.
#[derive(Debug)]
pub(crate) struct KeyLimiter {
    policy: Arc<Policy>,
    state: Mutex<LimiterState>,
    slot_freed: Notify,
}

impl KeyLimiter {
    pub(crate) fn new(policy: Arc<Policy>) -> Self {
        let now = Instant::now();
        Self {
            state: Mutex::new(LimiterState {
                tokens: policy.capacity,
                window_start: now,
                queued: 0,
                running: 0,
                last_start: None,
                last_activity: now,
            }),
            policy,
            slot_freed: Notify::new(),
        }
    }

    fn refill(&self, state: &mut LimiterState, now: Instant) {
        let interval = self.policy.refill_interval;
        if interval.is_zero() {
            state.tokens = self.policy.capacity;
            state.window_start = now;
            return;
        }
        let elapsed = now.saturating_duration_since(state.window_start);
        let periods = elapsed.as_nanos() / interval.as_nanos();
        if periods == 0 {
            return;
        }
        let periods = u32::try_from(periods).unwrap_or(u32::MAX);
        let added = self.policy.refill_amount.saturating_mul(periods);
        state.tokens = state.tokens.saturating_add(added).min(self.policy.capacity);
        state.window_start += interval * periods;
    }

    /// Consume one unit and reserve a queue position, or refuse.
    pub(crate) fn try_acquire(&self) -> Result<(), Rejected> {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.refill(&mut state, now);
        state.last_activity = now;

        if state.queued + state.running >= self.policy.max_outstanding() {
            return Err(Rejected::Saturated);
        }
        if state.tokens == 0 {
            let next = state.window_start + self.policy.refill_interval;
            return Err(Rejected::QuotaExhausted {
                retry_after: next.saturating_duration_since(now),
            });
        }
        state.tokens -= 1;
        state.queued += 1;
        Ok(())
    }

    /// Whether the key has been idle for `idle` with nothing outstanding.
    pub(crate) fn is_evictable(&self, idle: Duration, now: Instant) -> bool {
        let state = self.state.lock();
        state.queued == 0
            && state.running == 0
            && now.saturating_duration_since(state.last_activity) >= idle
    }

    /// When the key becomes idle if nothing else happens.
    pub(crate) fn idle_deadline(&self, idle: Duration) -> Instant {
        self.state.lock().last_activity + idle
    }

    /// Permits currently running or queued.
    pub(crate) fn outstanding(&self) -> usize {
        let state = self.state.lock();
        state.queued + state.running
    }

    /// Units left in the current window.
    pub(crate) fn remaining(&self) -> u32 {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.refill(&mut state, now);
        state.tokens
    }

    fn release(&self, started: bool) {
        {
            let mut state = self.state.lock();
            if started {
                state.running = state.running.saturating_sub(1);
            } else {
                state.queued = state.queued.saturating_sub(1);
            }
            state.last_activity = Instant::now();
        }
        self.slot_freed.notify_waiters();
    }
}

enum Wait {
    Slot,
    Until(Instant),
}

/// A granted slot against one key's policy.
///
/// Holds one queue position until [`run`](Self::run) moves it to a running
/// slot. Dropping the permit (or dropping a pending `run` future) releases
/// whatever it holds.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit {
    key: RateLimitKey,
    limiter: Arc<KeyLimiter>,
    started: bool,
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit")
            .field("key", &self.key)
            .field("started", &self.started)
            .finish()
    }
}

impl Permit {
    pub(crate) fn new(key: RateLimitKey, limiter: Arc<KeyLimiter>) -> Self {
        Self {
            key,
            limiter,
            started: false,
        }
    }

    /// Key the permit was granted on.
    pub fn key(&self) -> RateLimitKey {
        self.key
    }

    /// Wait for a concurrency slot and the minimum spacing, then run `task`.
    pub async fn run<F, T>(mut self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        self.wait_for_slot().await;
        let out = task.await;
        drop(self);
        out
    }

    async fn wait_for_slot(&mut self) {
        let limiter = Arc::clone(&self.limiter);
        loop {
            let notified = limiter.slot_freed.notified();
            let wait = {
                let now = Instant::now();
                let mut state = limiter.state.lock();
                if state.running >= limiter.policy.max_concurrent {
                    Wait::Slot
                } else {
                    let earliest = state
                        .last_start
                        .map_or(now, |last| last + limiter.policy.min_spacing);
                    if earliest <= now {
                        state.queued = state.queued.saturating_sub(1);
                        state.running += 1;
                        state.last_start = Some(now);
                        state.last_activity = now;
                        self.started = true;
                        return;
                    }
                    Wait::Until(earliest)
                }
            };
            match wait {
                Wait::Slot => notified.await,
                Wait::Until(at) => tokio::time::sleep_until(at).await,
            }
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.limiter.release(self.started);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnverse_core::UserId;

    fn policy(capacity: u32, max_concurrent: usize, max_queued: usize) -> Arc<Policy> {
        Arc::new(Policy {
            capacity,
            refill_amount: capacity,
            refill_interval: Duration::from_secs(60),
            max_concurrent,
            min_spacing: Duration::ZERO,
            max_queued,
        })
    }

    fn permit(limiter: &Arc<KeyLimiter>) -> Permit {
        limiter.try_acquire().unwrap();
        Permit::new(RateLimitKey::User(UserId(1)), Arc::clone(limiter))
    }

    #[tokio::test(start_paused = true)]
    async fn bucket_refills_after_interval() {
        let limiter = Arc::new(KeyLimiter::new(policy(2, 5, 5)));
        drop(permit(&limiter));
        drop(permit(&limiter));
        assert!(matches!(
            limiter.try_acquire(),
            Err(Rejected::QuotaExhausted { .. })
        ));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_counts_down_to_next_refill() {
        let limiter = Arc::new(KeyLimiter::new(policy(1, 5, 5)));
        drop(permit(&limiter));
        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(
            limiter.try_acquire(),
            Err(Rejected::QuotaExhausted {
                retry_after: Duration::from_secs(40)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn refill_never_exceeds_capacity() {
        let limiter = Arc::new(KeyLimiter::new(policy(3, 5, 5)));
        drop(permit(&limiter));
        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(limiter.remaining(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_permit_frees_its_position() {
        let limiter = Arc::new(KeyLimiter::new(policy(10, 1, 0)));
        let held = permit(&limiter);
        assert_eq!(limiter.try_acquire(), Err(Rejected::Saturated));
        drop(held);
        assert_eq!(limiter.outstanding(), 0);
        assert!(limiter.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn run_moves_permit_from_queued_to_running() {
        let limiter = Arc::new(KeyLimiter::new(policy(10, 1, 1)));
        let p = permit(&limiter);
        let observed = p
            .run(async {
                let state = limiter.state.lock();
                (state.queued, state.running)
            })
            .await;
        assert_eq!(observed, (0, 1));
        assert_eq!(limiter.outstanding(), 0);
    }
}
