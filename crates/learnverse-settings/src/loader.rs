//! Where settings come from.
//!
//! `.env` is read first so its variables count as environment. Then the
//! compiled defaults are overlaid with the JSON settings file (see
//! [`deep_merge`]) and finally with individual environment variables.
//! Unparseable environment values are logged and skipped, never fatal.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{BotSettings, Environment, LogFormat};

/// Resolve the bot's home directory (`~/.learnverse`).
pub fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".learnverse")
}

/// Resolve the path to the settings file (`~/.learnverse/settings.json`).
pub fn settings_path() -> PathBuf {
    home_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<BotSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A `.env` file in the working directory is read first so its variables
/// take part in the override step. If the settings file does not exist,
/// defaults are used. If it contains invalid JSON, an error is returned.
pub fn load_settings_from_path(path: &Path) -> Result<BotSettings> {
    if let Ok(env_file) = dotenvy::dotenv() {
        debug!(path = %env_file.display(), "loaded .env file");
    }

    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults deep-merged with the settings file, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<BotSettings> {
    if !path.exists() {
        debug!(?path, "settings file not found, using defaults");
        return Ok(BotSettings::default());
    }

    debug!(?path, "loading settings from file");
    let json_err = |source| SettingsError::Json {
        path: path.to_owned(),
        source,
    };
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_owned(),
        source,
    })?;
    let user: Value = serde_json::from_str(&content).map_err(json_err)?;
    let defaults = serde_json::to_value(BotSettings::default()).map_err(json_err)?;
    serde_json::from_value(deep_merge(defaults, user)).map_err(json_err)
}

/// Overlay `overlay` on `base`.
///
/// Nested objects merge key by key. A `null` in the overlay leaves the base
/// value alone, so a partial file only changes what it names. Any other
/// overlay value, arrays included, wins outright.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut fields), Value::Object(overrides)) => {
            for (key, value) in overrides.into_iter().filter(|(_, v)| !v.is_null()) {
                let value = match fields.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = fields.insert(key, value);
            }
            Value::Object(fields)
        }
        (_, overlay) => overlay,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut BotSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Each variable has strict parsing rules:
/// - Integers must be valid and within the specified range
/// - Empty strings are treated as unset
/// - Invalid values are ignored with a warning (fall back to file/default)
pub fn apply_overrides_from(settings: &mut BotSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Telegram ────────────────────────────────────────────────────
    if let Some(v) = read("TELEGRAM_BOT_TOKEN") {
        settings.telegram.bot_token = v;
    }
    if let Some(v) = read("BOT_USERNAME") {
        settings.telegram.bot_username = v.trim_start_matches('@').to_string();
    }
    if let Some(v) = read("TELEGRAM_API_BASE_URL") {
        settings.telegram.api_base_url = v;
    }

    // ── Catalog ─────────────────────────────────────────────────────
    if let Some(v) = read("LEARNVERSE_API_BASE_URL") {
        settings.catalog.api_base_url = v;
    }
    if let Some(v) = read("LEARNVERSE_BASE_URL") {
        settings.catalog.web_base_url = v;
    }

    // ── Classifier ──────────────────────────────────────────────────
    if let Some(v) = read("GEMINI_API_KEY") {
        settings.classifier.api_key = Some(v);
    }
    if let Some(v) = read("GEMINI_MODEL") {
        settings.classifier.model = v;
    }

    // ── Flags ───────────────────────────────────────────────────────
    if let Some(v) = read("LEARNVERSE_FLAG_TTL_SECS")
        .and_then(|v| checked("LEARNVERSE_FLAG_TTL_SECS", &v, parse_u64_range(&v, 1, 86_400)))
    {
        settings.flags.ttl_secs = v;
    }

    // ── Server / store ──────────────────────────────────────────────
    if let Some(v) = read("PORT").and_then(|v| checked("PORT", &v, parse_u16_range(&v, 1, 65535))) {
        settings.server.port = v;
    }
    if let Some(v) = read("LEARNVERSE_DB_PATH") {
        settings.store.path = v;
    }

    // ── Environment / logging ───────────────────────────────────────
    let env_name = read("LEARNVERSE_ENV").or_else(|| read("NODE_ENV"));
    if let Some(env) = env_name.and_then(|v| checked("LEARNVERSE_ENV", &v, Environment::parse(&v))) {
        settings.environment = env;
        if env == Environment::Production {
            settings.logging.format = LogFormat::Json;
        }
    }
    if let Some(v) = read("LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(format) = read("LOG_FORMAT").and_then(|v| checked("LOG_FORMAT", &v, parse_log_format(&v))) {
        settings.logging.format = format;
    }
}

/// Reject settings the bot cannot start with.
pub fn validate(settings: &BotSettings) -> Result<()> {
    if settings.telegram.bot_token.trim().is_empty() {
        return Err(SettingsError::Missing {
            key: "telegram.botToken",
            env: "TELEGRAM_BOT_TOKEN",
        });
    }
    if settings.catalog.api_base_url.trim().is_empty() {
        return Err(SettingsError::Missing {
            key: "catalog.apiBaseUrl",
            env: "LEARNVERSE_API_BASE_URL",
        });
    }
    if settings.classifier.confidence_threshold > 100 {
        return Err(SettingsError::InvalidValue(format!(
            "classifier.confidenceThreshold must be 0-100, got {}",
            settings.classifier.confidence_threshold
        )));
    }
    for (name, policy) in [
        ("classifier", &settings.rate_limits.classifier),
        ("replies", &settings.rate_limits.replies),
    ] {
        if policy.capacity == 0 || policy.max_concurrent == 0 || policy.refill_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(format!(
                "rateLimits.{name}: capacity, maxConcurrent and refillIntervalMs must be positive"
            )));
        }
    }
    Ok(())
}

/// Resolve the audit database path. Relative paths live under `~/.learnverse`.
pub fn resolve_store_path(settings: &BotSettings) -> PathBuf {
    let path = PathBuf::from(&settings.store.path);
    if path.is_absolute() {
        path
    } else {
        home_dir().join(path)
    }
}

// ── Env value parsing ───────────────────────────────────────────────────────

/// `val` as a `u16` in `min..=max`.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    val.trim().parse().ok().filter(|n| (min..=max).contains(n))
}

/// `val` as a `u64` in `min..=max`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    val.trim().parse().ok().filter(|n| (min..=max).contains(n))
}

/// Parse `json` or `pretty`, case-insensitive.
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" | "text" => Some(LogFormat::Pretty),
        _ => None,
    }
}

fn checked<T>(name: &str, raw: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        warn!(key = name, value = %raw, "invalid env var, ignoring");
    }
    parsed
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
