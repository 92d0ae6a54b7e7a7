//! # learnverse-bot
//!
//! Bot binary: loads settings, wires the services together, then runs the
//! update poller and the health server until interrupted.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use learnverse_bot::dispatcher::{Dispatcher, Services};
use learnverse_bot::gate::BackpressureGate;
use learnverse_bot::poller::Poller;
use learnverse_bot::server::{self, AppState};
use learnverse_bot::shutdown::{DEFAULT_DRAIN_TIMEOUT, ShutdownCoordinator};
use learnverse_bot::{AuditTrail, AuditingPlatform, Replies, logging, replies};
use learnverse_catalog::HttpCatalog;
use learnverse_classifier::{DisabledClassifier, GeminiClassifier, GeminiConfig, QueryClassifier};
use learnverse_nav::RenderContext;
use learnverse_ratelimit::{Policy, RateLimitRegistry};
use learnverse_settings::{BotSettings, FlagSource, RemoteFlagCache};
use learnverse_store::Database;
use learnverse_telegram::{ChatPlatform, TelegramClient};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Learnverse Telegram bot.
#[derive(Parser, Debug)]
#[command(name = "learnverse-bot", about = "Learnverse Telegram study-material bot")]
struct Cli {
    /// Settings file (defaults to `~/.learnverse/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Health server port (overrides settings and `PORT`).
    #[arg(long)]
    port: Option<u16>,
}

fn load(cli: &Cli) -> Result<BotSettings> {
    let mut settings = match &cli.config {
        Some(path) => learnverse_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => learnverse_settings::load_settings().context("Failed to load settings")?,
    };
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    learnverse_settings::validate(&settings).context("Invalid settings")?;
    Ok(settings)
}

fn classifier(client: &reqwest::Client, settings: &BotSettings) -> Arc<dyn QueryClassifier> {
    match &settings.classifier.api_key {
        Some(key) => Arc::new(GeminiClassifier::new(
            client.clone(),
            GeminiConfig {
                api_key: SecretString::from(key.clone()),
                model: settings.classifier.model.clone(),
                base_url: settings.classifier.base_url.clone(),
                timeout: Duration::from_millis(settings.classifier.timeout_ms),
            },
        )),
        None => {
            tracing::warn!("no classifier API key; group messages will not be classified");
            Arc::new(DisabledClassifier)
        }
    }
}

fn gate(
    client: &reqwest::Client,
    settings: &BotSettings,
    cancel: &CancellationToken,
) -> BackpressureGate {
    let limits = &settings.rate_limits;
    let idle = Duration::from_secs(limits.idle_eviction_secs);
    BackpressureGate::new(
        classifier(client, settings),
        RateLimitRegistry::with_idle(
            "classifier",
            Policy::from(&limits.classifier),
            idle,
            cancel.clone(),
        ),
        RateLimitRegistry::with_idle("replies", Policy::from(&limits.replies), idle, cancel.clone()),
        Duration::from_millis(settings.classifier.timeout_ms),
        settings.classifier.confidence_threshold,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;
    logging::init_subscriber(&settings.logging);
    tracing::info!(
        version = %settings.version,
        environment = ?settings.environment,
        "starting learnverse bot"
    );

    let shutdown = ShutdownCoordinator::new();
    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let catalog = Arc::new(HttpCatalog::new(
        client.clone(),
        &settings.catalog.api_base_url,
        Duration::from_millis(settings.catalog.request_timeout_ms),
    ));
    let flags: Arc<dyn FlagSource> = Arc::new(RemoteFlagCache::new(
        client.clone(),
        &settings.catalog.api_base_url,
        &settings.flags,
    ));
    let gate = Arc::new(gate(&client, &settings, &shutdown.token()));

    let store_path = learnverse_settings::resolve_store_path(&settings);
    let audit = Arc::new(AuditTrail::new(
        Database::open(&store_path)
            .with_context(|| format!("Failed to open store at {}", store_path.display()))?,
    ));

    let telegram = Arc::new(TelegramClient::new(
        client.clone(),
        &settings.telegram.api_base_url,
        SecretString::from(settings.telegram.bot_token.clone()),
    )
    .with_request_timeout(Duration::from_millis(settings.telegram.request_timeout_ms)));
    let platform: Arc<dyn ChatPlatform> =
        Arc::new(AuditingPlatform::new(telegram.clone(), audit.clone()));
    if let Err(e) = platform.set_commands(&replies::commands()).await {
        tracing::warn!(error = %e, "failed to register bot commands");
    }

    let dispatcher = Dispatcher::new(Services {
        platform,
        catalog,
        gate: gate.clone(),
        flags: flags.clone(),
        audit: Some(audit),
        replies: Replies::new(
            &settings.telegram.bot_username,
            &settings.catalog.web_base_url,
            &settings.telegram.study_group_link,
        ),
        render: RenderContext::new(&settings.catalog.web_base_url),
        bot_username: settings.telegram.bot_username.clone(),
    });

    let poller = Poller::new(
        telegram,
        dispatcher,
        settings.telegram.poll_timeout_secs,
        shutdown.token(),
    );
    let poller_handle = tokio::spawn(poller.run());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let state = AppState {
        gate,
        flags,
        start_time: Instant::now(),
    };
    let server_token = shutdown.token();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state, server_token).await {
            tracing::error!(error = %e, "health server failed");
        }
    });
    tracing::info!(%addr, bot = %settings.telegram.bot_username, "learnverse bot running");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let aborted = shutdown
        .drain(
            vec![("poller", poller_handle), ("server", server_handle)],
            DEFAULT_DRAIN_TIMEOUT,
        )
        .await;
    if !aborted.is_empty() {
        tracing::warn!(?aborted, "some tasks were aborted");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_settings_file() {
        let cli = Cli::parse_from(["learnverse-bot"]);
        assert!(cli.config.is_none());
        assert!(cli.port.is_none());
    }

    #[test]
    fn cli_custom_config_and_port() {
        let cli = Cli::parse_from([
            "learnverse-bot",
            "--config",
            "/etc/learnverse.json",
            "--port",
            "8080",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/learnverse.json")));
        assert_eq!(cli.port, Some(8080));
    }

    #[test]
    fn cli_rejects_bad_port() {
        assert!(Cli::try_parse_from(["learnverse-bot", "--port", "70000"]).is_err());
    }
}
