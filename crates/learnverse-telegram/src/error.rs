//! Platform errors.

use learnverse_core::ErrorKind;
use thiserror::Error;

/// Errors from a [`ChatPlatform`](crate::ChatPlatform).
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The request never produced a response.
    #[error("platform request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Flood control; wait before retrying.
    #[error("platform rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait.
        retry_after_secs: u64,
    },

    /// The API refused the call.
    #[error("platform API error {code}: {description}")]
    Api {
        /// Error code.
        code: u16,
        /// Error description.
        description: String,
    },

    /// The response body did not decode.
    #[error("platform response invalid: {0}")]
    Decode(String),
}

impl PlatformError {
    /// Fold into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Http(_) | Self::Api { .. } => ErrorKind::UpstreamUnavailable,
            Self::Decode(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for platform calls.
pub type Result<T> = std::result::Result<T, PlatformError>;
