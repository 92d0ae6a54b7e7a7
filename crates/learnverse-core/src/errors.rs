//! User-facing error taxonomy.
//!
//! Each crate has its own `thiserror` enum; at the boundary those errors are
//! folded into one [`ErrorKind`], and each kind maps to exactly one behavior
//! toward the user.

use serde::{Deserialize, Serialize};

/// Category of a failure as seen by the person chatting with the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An external dependency (catalog, classifier, config service) failed
    /// or timed out. Degrade or fall back.
    UpstreamUnavailable,
    /// An incoming navigation token could not be parsed.
    MalformedToken,
    /// A rate-limit policy rejected the work.
    RateLimited,
    /// The catalog answered but the referenced entity does not exist.
    EntityNotFound,
    /// A programming fault or unexpected payload. Answered with a generic
    /// apology.
    Internal,
}

impl ErrorKind {
    /// Stable identifier for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::MalformedToken => "malformed_token",
            Self::RateLimited => "rate_limited",
            Self::EntityNotFound => "entity_not_found",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_name() {
        for kind in [
            ErrorKind::UpstreamUnavailable,
            ErrorKind::MalformedToken,
            ErrorKind::RateLimited,
            ErrorKind::EntityNotFound,
            ErrorKind::Internal,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
