//! Remote feature flags with a TTL cache and hard-coded fallback.
//!
//! The config service answers `GET {apiBase}/api/v1/config/telegram` with
//! `{ success, data: { version, featureFlags } }`. The payload is deep-merged
//! over [`RemoteConfig::default`], so a partial answer only overrides the
//! flags it names.
//!
//! Reads never fail and never wait longer than the fetch timeout. A fresh
//! cache entry is served directly; otherwise one caller refreshes while the
//! others wait on the same refresh. A failed refresh serves the last good
//! value (or the defaults) and is retried after a short backoff.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::loader::deep_merge;
use crate::types::FlagSettings;

/// Remotely configurable toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    /// Classify group messages with the external classifier.
    pub ai_query_detection: bool,
    /// Reply to detected requests in group conversations.
    pub group_chat_replies: bool,
    /// Enforce the per-user and per-conversation rate limits.
    pub rate_limiting: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            ai_query_detection: true,
            group_chat_replies: true,
            rate_limiting: true,
        }
    }
}

/// Bot configuration published by the config service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteConfig {
    /// Published bot version.
    pub version: String,
    /// Feature toggles.
    pub feature_flags: FeatureFlags,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            feature_flags: FeatureFlags::default(),
        }
    }
}

/// Anything that can answer "what are the flags right now".
#[async_trait]
pub trait FlagSource: Send + Sync {
    /// Current configuration. Never fails; degrades to defaults.
    async fn current(&self) -> RemoteConfig;

    /// Current feature flags.
    async fn flags(&self) -> FeatureFlags {
        self.current().await.feature_flags
    }
}

/// A fixed configuration, for tests and offline runs.
#[derive(Clone, Debug, Default)]
pub struct StaticFlags(pub RemoteConfig);

impl StaticFlags {
    /// Static source with the given flags and the default version.
    pub fn new(feature_flags: FeatureFlags) -> Self {
        Self(RemoteConfig {
            feature_flags,
            ..RemoteConfig::default()
        })
    }
}

#[async_trait]
impl FlagSource for StaticFlags {
    async fn current(&self) -> RemoteConfig {
        self.0.clone()
    }
}

/// Why a refresh failed. Only logged; callers always get a value.
#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("config request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("config service answered {0}")]
    Status(u16),
    #[error("config response had success=false or no data")]
    Rejected,
    #[error("config payload invalid: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
}

struct CacheSlot {
    config: RemoteConfig,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheState {
    slot: Option<CacheSlot>,
    last_good: Option<RemoteConfig>,
}

/// [`FlagSource`] backed by the config service.
pub struct RemoteFlagCache {
    client: reqwest::Client,
    url: String,
    ttl: Duration,
    fetch_timeout: Duration,
    failure_retry: Duration,
    state: Mutex<CacheState>,
}

impl RemoteFlagCache {
    /// Cache for `{api_base_url}/api/v1/config/telegram`.
    pub fn new(client: reqwest::Client, api_base_url: &str, settings: &FlagSettings) -> Self {
        Self {
            client,
            url: format!("{}/api/v1/config/telegram", api_base_url.trim_end_matches('/')),
            ttl: Duration::from_secs(settings.ttl_secs),
            fetch_timeout: Duration::from_millis(settings.fetch_timeout_ms),
            failure_retry: Duration::from_secs(settings.failure_retry_secs),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Override the cache durations.
    #[must_use]
    pub fn with_durations(mut self, ttl: Duration, failure_retry: Duration) -> Self {
        self.ttl = ttl;
        self.failure_retry = failure_retry;
        self
    }

    /// Drop the cached entry so the next read refetches.
    pub async fn invalidate(&self) {
        self.state.lock().await.slot = None;
        info!("feature flag cache cleared");
    }

    /// Published bot version.
    pub async fn version(&self) -> String {
        self.current().await.version
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<RemoteConfig, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.fetch_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let envelope: Envelope = response.json().await?;
        let data = match envelope.data {
            Some(data) if envelope.success && data.is_object() => data,
            _ => return Err(FetchError::Rejected),
        };
        let defaults = serde_json::to_value(RemoteConfig::default())?;
        Ok(serde_json::from_value(deep_merge(defaults, data))?)
    }
}

#[async_trait]
impl FlagSource for RemoteFlagCache {
    async fn current(&self) -> RemoteConfig {
        // Held across the fetch: concurrent readers wait on one refresh.
        let mut state = self.state.lock().await;
        let now = Instant::now();
        if let Some(slot) = state.slot.as_ref().filter(|s| s.expires_at > now) {
            debug!("using cached feature flags");
            return slot.config.clone();
        }

        match self.fetch().await {
            Ok(config) => {
                info!(version = %config.version, flags = ?config.feature_flags, "feature flags refreshed");
                state.last_good = Some(config.clone());
                state.slot = Some(CacheSlot {
                    config: config.clone(),
                    expires_at: Instant::now() + self.ttl,
                });
                config
            }
            Err(error) => {
                let fallback = state.last_good.clone().unwrap_or_default();
                warn!(%error, version = %fallback.version, "failed to fetch feature flags, using fallback");
                state.slot = Some(CacheSlot {
                    config: fallback.clone(),
                    expires_at: Instant::now() + self.failure_retry,
                });
                fallback
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
