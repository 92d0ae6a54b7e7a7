//! Rate-limit policy settings.

use serde::{Deserialize, Serialize};

/// One token-bucket policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicySettings {
    /// Bucket size (units available in a fresh window).
    pub capacity: u32,
    /// Units restored at each refill.
    pub refill_amount: u32,
    /// Time between refills, in milliseconds.
    pub refill_interval_ms: u64,
    /// Maximum tasks running at once for one key.
    pub max_concurrent: u32,
    /// Minimum gap between task starts for one key, in milliseconds.
    pub min_spacing_ms: u64,
    /// Maximum tasks waiting for a slot for one key.
    pub max_queued: u32,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self::classifier()
    }
}

impl PolicySettings {
    /// Per-user policy guarding classifier calls.
    pub fn classifier() -> Self {
        Self {
            capacity: 5,
            refill_amount: 5,
            refill_interval_ms: 60_000,
            max_concurrent: 1,
            min_spacing_ms: 2_000,
            max_queued: 1,
        }
    }

    /// Per-conversation policy guarding outbound replies.
    pub fn replies() -> Self {
        Self {
            capacity: 15,
            refill_amount: 15,
            refill_interval_ms: 60_000,
            max_concurrent: 3,
            min_spacing_ms: 1_000,
            max_queued: 2,
        }
    }
}

/// Rate-limit policies for both classes of work.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitSettings {
    /// Per-user classifier-call policy.
    pub classifier: PolicySettings,
    /// Per-conversation reply-dispatch policy.
    pub replies: PolicySettings,
    /// Idle period after which a key's limiter is discarded, in seconds.
    pub idle_eviction_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            classifier: PolicySettings::classifier(),
            replies: PolicySettings::replies(),
            idle_eviction_secs: 600,
        }
    }
}
