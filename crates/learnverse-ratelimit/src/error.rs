//! Rejections.

use std::time::Duration;

use learnverse_core::ErrorKind;
use thiserror::Error;

use crate::policy::RateLimitKey;

/// Why [`acquire`](crate::RateLimitRegistry::acquire) refused a permit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Rejected {
    /// No quota left in the current window.
    #[error("quota exhausted, refills in {}ms", retry_after.as_millis())]
    QuotaExhausted {
        /// Time until the next refill.
        retry_after: Duration,
    },
    /// Running plus queued permits are at the policy ceiling.
    #[error("too many outstanding permits")]
    Saturated,
}

/// A scheduled task was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("rate limited on {key}: {reason}")]
pub struct RateLimited {
    /// Key that refused the task.
    pub key: RateLimitKey,
    /// Why.
    pub reason: Rejected,
}

impl RateLimited {
    /// Always [`ErrorKind::RateLimited`].
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::RateLimited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnverse_core::UserId;

    #[test]
    fn display() {
        let err = RateLimited {
            key: RateLimitKey::User(UserId(3)),
            reason: Rejected::QuotaExhausted {
                retry_after: Duration::from_millis(1500),
            },
        };
        assert_eq!(
            err.to_string(),
            "rate limited on user:3: quota exhausted, refills in 1500ms"
        );
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }
}
