//! Classifiers that never call out: the disabled stand-in and a scripted
//! one for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ClassifierError;
use crate::types::{Classification, QueryClassifier};

/// Reasoning attached to every verdict of [`DisabledClassifier`].
pub const NOT_CONFIGURED_REASON: &str = "Classifier not configured";

/// Stand-in used when no API key is configured: every message is "not a
/// request".
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledClassifier;

#[async_trait]
impl QueryClassifier for DisabledClassifier {
    async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
        Ok(Classification::not_query(NOT_CONFIGURED_REASON))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Outcome queued on a [`ScriptedClassifier`].
#[derive(Clone, Debug)]
pub enum Scripted {
    /// Answer with this verdict.
    Verdict(Classification),
    /// Fail with a timeout.
    Timeout,
}

/// Replays queued outcomes, then repeats a fallback verdict. Counts calls
/// and can hold each call for a fixed delay.
pub struct ScriptedClassifier {
    queue: Mutex<VecDeque<Scripted>>,
    fallback: Classification,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    /// Answer every call with `fallback`.
    pub fn always(fallback: Classification) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Positive verdict at `confidence` for every call.
    pub fn positive(confidence: u8) -> Self {
        Self::always(Classification {
            is_query: true,
            confidence,
            reasoning: "scripted".into(),
        })
    }

    /// Hold each call for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue an outcome ahead of the fallback.
    #[must_use]
    pub fn then(self, outcome: Scripted) -> Self {
        self.queue.lock().push_back(outcome);
        self
    }

    /// Calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryClassifier for ScriptedClassifier {
    async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.queue.lock().pop_front();
        match next {
            Some(Scripted::Verdict(v)) => Ok(v),
            Some(Scripted::Timeout) => Err(ClassifierError::Timeout {
                timeout_ms: u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX),
            }),
            None => Ok(self.fallback.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_never_accepts() {
        let c = DisabledClassifier.classify("need DBMS notes").await.unwrap();
        assert_eq!(c.reasoning, NOT_CONFIGURED_REASON);
        assert!(!c.accepted(0));
        assert!(!DisabledClassifier.is_enabled());
    }

    #[tokio::test]
    async fn scripted_replays_then_falls_back() {
        let c = ScriptedClassifier::positive(80)
            .then(Scripted::Timeout)
            .then(Scripted::Verdict(Classification::not_query("chat")));
        assert!(c.classify("a").await.is_err());
        assert_eq!(c.classify("b").await.unwrap().reasoning, "chat");
        assert_eq!(c.classify("c").await.unwrap().confidence, 80);
        assert_eq!(c.calls(), 3);
    }
}
