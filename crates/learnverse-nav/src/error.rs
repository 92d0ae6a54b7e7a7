//! Navigation errors.

use learnverse_core::ErrorKind;
use thiserror::Error;

/// Errors from the token codec.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NavError {
    /// The token is missing its delimiters, has an unknown tag, or carries
    /// empty segments.
    #[error("malformed navigation token: {token:?}")]
    MalformedToken {
        /// The raw token as received.
        token: String,
    },

    /// An id is empty or contains the `:` delimiter.
    #[error("invalid entity id: {id:?}")]
    InvalidEntityId {
        /// The offending id.
        id: String,
    },

    /// The token exceeds the control-data limit even without ancestors.
    #[error("navigation token is {len} bytes, limit is {max}")]
    TokenTooLong {
        /// Encoded length without ancestors.
        len: usize,
        /// The limit.
        max: usize,
    },
}

impl NavError {
    /// Fold into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedToken { .. } => ErrorKind::MalformedToken,
            Self::InvalidEntityId { .. } | Self::TokenTooLong { .. } => ErrorKind::Internal,
        }
    }
}
