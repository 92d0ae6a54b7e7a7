//! Catalog client errors.

use learnverse_core::ErrorKind;
use thiserror::Error;

/// Errors returned by a [`Catalog`](crate::Catalog).
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request never produced a response (connect failure, timeout).
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The catalog answered with a non-success HTTP status.
    #[error("catalog answered HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The catalog answered `success: false`.
    #[error("catalog reported failure: {message}")]
    Rejected {
        /// Message supplied by the catalog, if any.
        message: String,
    },

    /// The referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity type (`branch`, `year`, ...).
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// The response body did not match the expected shape.
    #[error("catalog payload invalid for {entity}: {message}")]
    Malformed {
        /// Entity type being decoded.
        entity: &'static str,
        /// Decoder message.
        message: String,
    },
}

impl CatalogError {
    /// Fold into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Status { .. } | Self::Rejected { .. } => {
                ErrorKind::UpstreamUnavailable
            }
            Self::NotFound { .. } => ErrorKind::EntityNotFound,
            Self::Malformed { .. } => ErrorKind::Internal,
        }
    }

    /// Whether trying again later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Rejected { .. } => true,
            Self::Status { status } => *status == 429 || *status >= 500,
            Self::NotFound { .. } | Self::Malformed { .. } => false,
        }
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            CatalogError::Status { status: 502 }.kind(),
            ErrorKind::UpstreamUnavailable
        );
        assert_eq!(
            CatalogError::Rejected { message: String::new() }.kind(),
            ErrorKind::UpstreamUnavailable
        );
        assert_eq!(
            CatalogError::NotFound { entity: "year", id: "y".into() }.kind(),
            ErrorKind::EntityNotFound
        );
        assert_eq!(
            CatalogError::Malformed { entity: "year", message: "bad".into() }.kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn retryable() {
        assert!(CatalogError::Status { status: 503 }.is_retryable());
        assert!(CatalogError::Status { status: 429 }.is_retryable());
        assert!(!CatalogError::Status { status: 400 }.is_retryable());
        assert!(!CatalogError::NotFound { entity: "branch", id: "b".into() }.is_retryable());
    }

    #[test]
    fn not_found_display() {
        let err = CatalogError::NotFound { entity: "subject", id: "abc".into() };
        assert_eq!(err.to_string(), "subject abc not found");
    }
}
