//! Classification result and the classifier trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Verdict on whether a message asks for study material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// The classifier believes the message is a request.
    pub is_query: bool,
    /// Confidence in the verdict, 0–100.
    pub confidence: u8,
    /// Short explanation from the classifier.
    pub reasoning: String,
}

impl Classification {
    /// A negative verdict with zero confidence.
    pub fn not_query(reasoning: impl Into<String>) -> Self {
        Self {
            is_query: false,
            confidence: 0,
            reasoning: reasoning.into(),
        }
    }

    /// Whether the verdict clears `threshold`: a positive verdict with
    /// confidence at or above the threshold.
    pub fn accepted(&self, threshold: u8) -> bool {
        self.is_query && self.confidence >= threshold
    }
}

/// Decides whether free-form text is a study-material request.
///
/// Output is an untrusted signal; callers gate on
/// [`Classification::accepted`] and treat errors as "not a request".
#[async_trait]
pub trait QueryClassifier: Send + Sync {
    /// Classify one message.
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;

    /// Whether this classifier can ever answer positively.
    fn is_enabled(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        let c = Classification {
            is_query: true,
            confidence: 60,
            reasoning: String::new(),
        };
        assert!(c.accepted(60));
        assert!(!c.accepted(61));
    }

    #[test]
    fn negative_verdict_never_accepted() {
        let c = Classification {
            is_query: false,
            confidence: 100,
            reasoning: String::new(),
        };
        assert!(!c.accepted(0));
    }

    #[test]
    fn not_query_has_zero_confidence() {
        let c = Classification::not_query("Gemini not configured");
        assert!(!c.is_query);
        assert_eq!(c.confidence, 0);
    }
}
