//! Handler errors.
//!
//! Every failure that reaches the dispatcher is folded into an
//! [`ErrorKind`]; the kind decides what, if anything, the user sees.

use learnverse_catalog::CatalogError;
use learnverse_classifier::ClassifierError;
use learnverse_core::ErrorKind;
use learnverse_nav::NavError;
use learnverse_ratelimit::RateLimited;
use learnverse_store::StoreError;
use learnverse_telegram::PlatformError;
use thiserror::Error;

/// Any failure raised while handling one update.
#[derive(Debug, Error)]
pub enum BotError {
    /// The chat platform refused or failed a call.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The catalog could not answer.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The classifier could not answer.
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// A navigation token was unusable.
    #[error(transparent)]
    Nav(#[from] NavError),

    /// A limiter refused the work.
    #[error(transparent)]
    RateLimited(#[from] RateLimited),

    /// The audit store failed.
    #[error("audit store: {0}")]
    Store(#[from] StoreError),
}

impl BotError {
    /// Fold into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Platform(e) => e.kind(),
            Self::Catalog(e) => e.kind(),
            Self::Classifier(e) => e.kind(),
            Self::Nav(e) => e.kind(),
            Self::RateLimited(e) => e.kind(),
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;
    use learnverse_core::UserId;
    use learnverse_ratelimit::{RateLimitKey, Rejected};

    #[test]
    fn kinds_follow_the_source() {
        let limited: BotError = RateLimited {
            key: RateLimitKey::User(UserId(1)),
            reason: Rejected::Saturated,
        }
        .into();
        assert_eq!(limited.kind(), ErrorKind::RateLimited);

        let flood: BotError = PlatformError::RateLimited { retry_after_secs: 3 }.into();
        assert_eq!(flood.kind(), ErrorKind::RateLimited);

        let missing: BotError = CatalogError::NotFound {
            entity: "year",
            id: "y9".into(),
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::EntityNotFound);

        let store: BotError = StoreError::Database("locked".into()).into();
        assert_eq!(store.kind(), ErrorKind::Internal);
    }
}
