//! Classifier errors.

use learnverse_core::ErrorKind;
use thiserror::Error;

/// Errors from a classification call.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// HTTP request failed before a response arrived.
    #[error("classifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The call exceeded its deadline.
    #[error("classifier timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline that elapsed.
        timeout_ms: u64,
    },

    /// Quota exhausted at the provider.
    #[error("classifier rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds.
        retry_after_ms: u64,
    },

    /// Provider returned an API error.
    #[error("classifier API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
}

impl ClassifierError {
    /// Fold into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Http(_) | Self::Timeout { .. } | Self::Api { .. } => {
                ErrorKind::UpstreamUnavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            ClassifierError::Timeout { timeout_ms: 10 }.kind(),
            ErrorKind::UpstreamUnavailable
        );
        assert_eq!(
            ClassifierError::RateLimited { retry_after_ms: 5 }.kind(),
            ErrorKind::RateLimited
        );
    }

    #[test]
    fn api_display() {
        let err = ClassifierError::Api {
            status: 400,
            message: "bad request".into(),
        };
        assert_eq!(err.to_string(), "classifier API error (400): bad request");
    }
}
