//! Backpressure gate.
//!
//! Sequences the cheap admission checks (feature flags, per-user quota)
//! ahead of the classifier call, and runs every outbound reply through the
//! per-conversation dispatch quota. Rejections never surface as errors:
//! group traffic is dropped silently, private chats get at most one
//! "please wait" notice per refill window.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use learnverse_classifier::{Classification, ClassifierError, NOT_CONFIGURED_REASON, QueryClassifier};
use learnverse_core::{ChatId, ChatKind, UserId};
use learnverse_ratelimit::{RateLimitKey, RateLimitRegistry, RegistryStats, Rejected};
use learnverse_settings::FeatureFlags;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Why a group message was not classified to completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// `aiQueryDetection` or `groupChatReplies` is off.
    FeaturesDisabled,
    /// The sender is over their classifier quota.
    RateLimited,
    /// The classifier failed or timed out.
    ClassifierFailed,
}

/// Result of screening one group message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screening {
    /// A material request at or above the confidence threshold.
    Query(Classification),
    /// Classified, but not a request (or below the threshold).
    NotQuery(Classification),
    /// Never classified.
    Dropped(DropReason),
}

impl Screening {
    /// Whether the message should get a reply.
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query(_))
    }
}

/// Result of running a reply through the dispatch quota.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch<T> {
    /// The reply ran.
    Delivered(T),
    /// Over quota in a group; nothing is sent.
    Dropped,
    /// Over quota in a private chat. `notify` is set for the first
    /// rejection of a window only.
    Throttled {
        /// Whether the caller should send the "please wait" notice.
        notify: bool,
    },
}

/// Admission control in front of the classifier and reply dispatch.
pub struct BackpressureGate {
    classifier: Arc<dyn QueryClassifier>,
    classifier_limits: RateLimitRegistry,
    reply_limits: RateLimitRegistry,
    classifier_timeout: Duration,
    confidence_threshold: u8,
    /// Private chats that already got a notice, and until when.
    notices: DashMap<ChatId, Instant>,
}

impl BackpressureGate {
    /// Gate over `classifier`, using one registry per policy class.
    pub fn new(
        classifier: Arc<dyn QueryClassifier>,
        classifier_limits: RateLimitRegistry,
        reply_limits: RateLimitRegistry,
        classifier_timeout: Duration,
        confidence_threshold: u8,
    ) -> Self {
        Self {
            classifier,
            classifier_limits,
            reply_limits,
            classifier_timeout,
            confidence_threshold,
            notices: DashMap::new(),
        }
    }

    /// Limiter snapshots, classifier first.
    pub fn stats(&self) -> [RegistryStats; 2] {
        [self.classifier_limits.stats(), self.reply_limits.stats()]
    }

    /// Decide whether a group message is a material request.
    ///
    /// Flags are checked first, then the sender's classifier quota; only then
    /// is the classifier called, under a hard timeout.
    #[instrument(skip(self, text, flags), fields(user_id = %user))]
    pub async fn screen(&self, user: UserId, text: &str, flags: FeatureFlags) -> Screening {
        if !flags.ai_query_detection || !flags.group_chat_replies {
            debug!("group replies disabled by flags");
            return Screening::Dropped(DropReason::FeaturesDisabled);
        }
        if !self.classifier.is_enabled() {
            return Screening::NotQuery(Classification::not_query(NOT_CONFIGURED_REASON));
        }

        let verdict = if flags.rate_limiting {
            match self
                .classifier_limits
                .schedule(RateLimitKey::User(user), self.classify(text))
                .await
            {
                Ok(verdict) => verdict,
                Err(limited) => {
                    debug!(reason = %limited.reason, "classifier call rejected");
                    return Screening::Dropped(DropReason::RateLimited);
                }
            }
        } else {
            self.classify(text).await
        };

        match verdict {
            Ok(c) if c.accepted(self.confidence_threshold) => Screening::Query(c),
            Ok(c) => {
                debug!(confidence = c.confidence, reasoning = %c.reasoning, "not a material request");
                Screening::NotQuery(c)
            }
            Err(err) => {
                warn!(error = %err, kind = %err.kind(), "classification failed; treating as not a request");
                Screening::Dropped(DropReason::ClassifierFailed)
            }
        }
    }

    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        tokio::time::timeout(self.classifier_timeout, self.classifier.classify(text))
            .await
            .unwrap_or_else(|_| {
                Err(ClassifierError::Timeout {
                    timeout_ms: u64::try_from(self.classifier_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                })
            })
    }

    /// Run `reply` through `chat`'s dispatch quota.
    #[instrument(skip(self, flags, reply), fields(chat_id = %chat))]
    pub async fn dispatch<F, T>(
        &self,
        chat: ChatId,
        kind: ChatKind,
        flags: FeatureFlags,
        reply: F,
    ) -> Dispatch<T>
    where
        F: Future<Output = T>,
    {
        if !flags.rate_limiting {
            return Dispatch::Delivered(reply.await);
        }
        match self
            .reply_limits
            .schedule(RateLimitKey::Conversation(chat), reply)
            .await
        {
            Ok(out) => Dispatch::Delivered(out),
            Err(limited) if kind.is_group() => {
                debug!(reason = %limited.reason, "group reply dropped");
                Dispatch::Dropped
            }
            Err(limited) => {
                let window = match limited.reason {
                    Rejected::QuotaExhausted { retry_after } => retry_after,
                    Rejected::Saturated => self.reply_limits.policy().refill_interval,
                };
                let notify = self.claim_notice(chat, window);
                debug!(reason = %limited.reason, notify, "private reply throttled");
                Dispatch::Throttled { notify }
            }
        }
    }

    /// True when `chat` has not been notified within the current window.
    fn claim_notice(&self, chat: ChatId, window: Duration) -> bool {
        let now = Instant::now();
        self.notices.retain(|_, until| *until > now);
        match self.notices.entry(chat) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let _ = slot.insert(now + window);
                true
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
