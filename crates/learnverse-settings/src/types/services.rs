//! Settings for the external services the bot talks to.

use serde::{Deserialize, Serialize};

/// Chat platform connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramSettings {
    /// Bot API token. Required at startup.
    pub bot_token: String,
    /// Public username of the bot (without `@`), used for deep links and
    /// command suffix matching.
    pub bot_username: String,
    /// Bot API base URL.
    pub api_base_url: String,
    /// Long-poll timeout passed to `getUpdates`, in seconds.
    pub poll_timeout_secs: u64,
    /// Timeout for every call other than the long poll, in milliseconds.
    pub request_timeout_ms: u64,
    /// Invite link offered to private-chat users.
    pub study_group_link: String,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            bot_username: "learnverse_bot".to_string(),
            api_base_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
            request_timeout_ms: 10_000,
            study_group_link: "https://t.me/+pqv5-taDH60wNjFl".to_string(),
        }
    }
}

/// Document catalog service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogSettings {
    /// Base URL of the REST API (the `/api/v1` prefix is appended).
    pub api_base_url: String,
    /// Base URL of the public web catalog (used for viewer links).
    pub web_base_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            web_base_url: "https://learnverse.live".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Query-intent classifier settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierSettings {
    /// Gemini API key. Classification is disabled when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Generative Language API base URL.
    pub base_url: String,
    /// Hard timeout for one classification call, in milliseconds.
    pub timeout_ms: u64,
    /// Minimum confidence (0–100) for a message to count as a request.
    pub confidence_threshold: u8,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_ms: 10_000,
            confidence_threshold: 60,
        }
    }
}

/// Remote feature-flag cache settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlagSettings {
    /// How long a fetched configuration stays fresh, in seconds.
    pub ttl_secs: u64,
    /// Timeout for one config fetch, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// After a failed fetch, how long to serve the fallback before trying
    /// again, in seconds.
    pub failure_retry_secs: u64,
}

impl Default for FlagSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            fetch_timeout_ms: 5_000,
            failure_retry_secs: 30,
        }
    }
}
