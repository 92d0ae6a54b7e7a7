//! # learnverse-settings
//!
//! Configuration for the Learnverse bot.
//!
//! Static settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`BotSettings::default()`]
//! 2. **User file**: `~/.learnverse/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TELEGRAM_BOT_TOKEN`, `LEARNVERSE_API_BASE_URL`,
//!    `GEMINI_API_KEY`, `PORT`, ... (highest priority, `.env` supported)
//!
//! Runtime feature flags live in [`flags`]: they are fetched from the config
//! service, cached with a TTL, and fall back to compiled defaults.

#![deny(unsafe_code)]

pub mod errors;
pub mod flags;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use flags::{FeatureFlags, FlagSource, RemoteConfig, RemoteFlagCache, StaticFlags};
pub use loader::{
    deep_merge, load_settings, load_settings_from_path, resolve_store_path, settings_path, validate,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_carry_reference_constants() {
        let settings = BotSettings::default();
        assert_eq!(settings.server.port, 3001);
        assert_eq!(settings.classifier.model, "gemini-2.5-flash");
        assert_eq!(settings.classifier.timeout_ms, 10_000);
        assert_eq!(settings.classifier.confidence_threshold, 60);
        assert_eq!(settings.flags.ttl_secs, 300);
        assert_eq!(settings.flags.fetch_timeout_ms, 5_000);
        assert_eq!(settings.rate_limits.idle_eviction_secs, 600);
        assert!(settings.classifier.api_key.is_none());
    }
}
