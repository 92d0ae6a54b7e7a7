//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON file
//! format. Each type implements [`Default`] with production default values,
//! and `#[serde(default)]` lets a settings file name only the fields it
//! overrides.

mod limits;
mod services;

pub use limits::*;
pub use services::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the bot.
///
/// Loaded from `~/.learnverse/settings.json` with defaults applied for
/// missing fields. Environment variables can override specific values.
///
/// ```json
/// {
///   "telegram": { "botUsername": "learnverse_bot" },
///   "rateLimits": { "replies": { "capacity": 20 } }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotSettings {
    /// Settings schema version.
    pub version: String,
    /// Deployment environment.
    pub environment: Environment,
    /// Chat platform connection.
    pub telegram: TelegramSettings,
    /// Document catalog service.
    pub catalog: CatalogSettings,
    /// Query-intent classifier.
    pub classifier: ClassifierSettings,
    /// Remote feature-flag cache.
    pub flags: FlagSettings,
    /// Rate-limit policies.
    pub rate_limits: RateLimitSettings,
    /// Health HTTP server.
    pub server: ServerSettings,
    /// Audit trail database.
    pub store: StoreSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            environment: Environment::default(),
            telegram: TelegramSettings::default(),
            catalog: CatalogSettings::default(),
            classifier: ClassifierSettings::default(),
            flags: FlagSettings::default(),
            rate_limits: RateLimitSettings::default(),
            server: ServerSettings::default(),
            store: StoreSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Deployment environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Production deployment.
    Production,
}

impl Environment {
    /// Parse `development`/`dev` or `production`/`prod`, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

/// Log line format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable compact lines.
    #[default]
    Pretty,
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Health HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

/// Audit trail database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Database file, relative to `~/.learnverse` unless absolute.
    pub path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: "learnverse.db".to_string(),
        }
    }
}
