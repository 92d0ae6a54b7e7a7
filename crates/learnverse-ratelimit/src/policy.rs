//! Limiter policies and keys.

use std::fmt;
use std::time::Duration;

use learnverse_core::{ChatId, UserId};
use learnverse_settings::PolicySettings;
use serde::Serialize;

/// Token-bucket and scheduling parameters shared by every key of a registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policy {
    /// Units available in a full bucket.
    pub capacity: u32,
    /// Units restored each refill.
    pub refill_amount: u32,
    /// Time between refills.
    pub refill_interval: Duration,
    /// Tasks that may run at once for one key.
    pub max_concurrent: usize,
    /// Minimum gap between task starts for one key.
    pub min_spacing: Duration,
    /// Tasks that may wait for a slot for one key.
    pub max_queued: usize,
}

impl Policy {
    /// Per-user classifier-call policy.
    pub fn classifier() -> Self {
        Self::from(&PolicySettings::classifier())
    }

    /// Per-conversation reply-dispatch policy.
    pub fn replies() -> Self {
        Self::from(&PolicySettings::replies())
    }

    /// Outstanding permits (running plus queued) allowed for one key.
    pub fn max_outstanding(&self) -> usize {
        self.max_concurrent + self.max_queued
    }
}

impl From<&PolicySettings> for Policy {
    fn from(s: &PolicySettings) -> Self {
        Self {
            capacity: s.capacity,
            refill_amount: s.refill_amount,
            refill_interval: Duration::from_millis(s.refill_interval_ms),
            max_concurrent: s.max_concurrent.max(1) as usize,
            min_spacing: Duration::from_millis(s.min_spacing_ms),
            max_queued: s.max_queued as usize,
        }
    }
}

/// What a limiter is keyed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum RateLimitKey {
    /// One user, across conversations.
    User(UserId),
    /// One conversation, across users.
    Conversation(ChatId),
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Conversation(id) => write!(f, "chat:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_policies() {
        let c = Policy::classifier();
        assert_eq!(c.capacity, 5);
        assert_eq!(c.refill_interval, Duration::from_secs(60));
        assert_eq!(c.min_spacing, Duration::from_secs(2));
        assert_eq!(c.max_outstanding(), 2);

        let r = Policy::replies();
        assert_eq!(r.capacity, 15);
        assert_eq!(r.max_concurrent, 3);
        assert_eq!(r.min_spacing, Duration::from_secs(1));
        assert_eq!(r.max_outstanding(), 5);
    }

    #[test]
    fn zero_concurrency_is_raised_to_one() {
        let s = PolicySettings {
            max_concurrent: 0,
            ..PolicySettings::replies()
        };
        assert_eq!(Policy::from(&s).max_concurrent, 1);
    }

    #[test]
    fn key_display() {
        assert_eq!(RateLimitKey::User(UserId(7)).to_string(), "user:7");
        assert_eq!(RateLimitKey::Conversation(ChatId(-100)).to_string(), "chat:-100");
    }
}
