//! Update routing.
//!
//! One [`Dispatcher::handle`] call per update. Messages go through the
//! inbound filters (bot accounts, join notices, audit registration), then
//! to commands, private free text, or group screening. Pressed controls go
//! straight to the navigator. Every reply goes through the gate's dispatch
//! quota.

use std::future::Future;
use std::sync::Arc;

use learnverse_catalog::Catalog;
use learnverse_core::{ChatId, ChatKind, ErrorKind, MessageId, OutgoingMessage};
use learnverse_nav::{Navigator, RenderContext, render};
use learnverse_settings::{FeatureFlags, FlagSource};
use learnverse_telegram::{CallbackQuery, ChatPlatform, Message, PlatformError, Update, User};
use tracing::{debug, error, info, instrument, warn};

use crate::audit::AuditTrail;
use crate::error::Result;
use crate::gate::{BackpressureGate, Dispatch};
use crate::replies::Replies;

/// Commands honored in private chats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/search`
    Search,
}

impl Command {
    /// Parse `/name`, `/name@bot` or `/name args`.
    ///
    /// Returns `None` for unknown commands and for commands addressed to a
    /// different bot.
    pub fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        let (name, target) = match word.split_once('@') {
            Some((name, target)) => (name, Some(target)),
            None => (word, None),
        };
        if target.is_some_and(|t| !t.eq_ignore_ascii_case(bot_username)) {
            return None;
        }
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "search" => Some(Self::Search),
            _ => None,
        }
    }
}

/// Everything a dispatcher needs.
pub struct Services {
    /// Outbound platform (usually wrapped for auditing).
    pub platform: Arc<dyn ChatPlatform>,
    /// Catalog the navigator reads.
    pub catalog: Arc<dyn Catalog>,
    /// Admission control.
    pub gate: Arc<BackpressureGate>,
    /// Feature flags.
    pub flags: Arc<dyn FlagSource>,
    /// Private-conversation audit trail, when enabled.
    pub audit: Option<Arc<AuditTrail>>,
    /// Fixed reply texts.
    pub replies: Replies,
    /// Screen rendering settings.
    pub render: RenderContext,
    /// The bot's own username, for `/cmd@bot` matching.
    pub bot_username: String,
}

struct Inner {
    platform: Arc<dyn ChatPlatform>,
    navigator: Navigator,
    gate: Arc<BackpressureGate>,
    flags: Arc<dyn FlagSource>,
    audit: Option<Arc<AuditTrail>>,
    replies: Replies,
    render: RenderContext,
    bot_username: String,
}

/// Routes updates to handlers. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Dispatcher over `services`.
    pub fn new(services: Services) -> Self {
        Self {
            inner: Arc::new(Inner {
                navigator: Navigator::new(services.catalog),
                platform: services.platform,
                gate: services.gate,
                flags: services.flags,
                audit: services.audit,
                replies: services.replies,
                render: services.render,
                bot_username: services.bot_username,
            }),
        }
    }

    /// Handle one update. Failures are logged, never returned; an internal
    /// failure in a private chat also gets one apology.
    #[instrument(skip_all, fields(update_id = update.update_id))]
    pub async fn handle(&self, update: Update) {
        let private_chat = update.private_chat();
        let result = if let Some(query) = update.callback_query {
            self.on_callback(query).await
        } else if let Some(message) = update.message {
            self.on_message(message).await
        } else {
            Ok(())
        };

        let Err(err) = result else {
            return;
        };
        match err.kind() {
            ErrorKind::Internal => {
                error!(error = %err, ?private_chat, "update failed unexpectedly");
                if let Some(chat) = private_chat {
                    self.apologize(chat).await;
                }
            }
            kind => warn!(error = %err, %kind, "update failed"),
        }
    }

    /// Send the generic apology to a private chat, subject to the reply
    /// quota. Failures are only logged.
    pub async fn apologize(&self, chat: ChatId) {
        let apology = self.inner.replies.apology();
        if let Err(e) = self.reply(chat, ChatKind::Private, apology).await {
            warn!(error = %e, chat_id = %chat, "apology not delivered");
        }
    }

    async fn on_message(&self, message: Message) -> Result<()> {
        let Some(from) = message.from.as_ref() else {
            return Ok(());
        };
        let chat = message.chat.id;
        let kind = message.chat.kind();

        if from.is_bot {
            if kind.is_private() {
                self.reply(chat, kind, self.inner.replies.bots_not_allowed())
                    .await?;
            }
            return Ok(());
        }
        if message.is_member_join() {
            return Ok(());
        }

        if kind.is_private() {
            if let Some(audit) = &self.inner.audit {
                if let Some(row) = audit.register(chat, from) {
                    audit.record_inbound(&row, &message);
                }
            }
        }

        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };
        if text.starts_with('/') {
            if kind.is_group() {
                return Ok(());
            }
            return match Command::parse(text, &self.inner.bot_username) {
                Some(command) => self.on_command(chat, command).await,
                None => Ok(()),
            };
        }

        if kind.is_private() {
            self.reply(chat, kind, self.inner.replies.persona()).await
        } else {
            self.on_group_text(&message, from, text).await
        }
    }

    #[instrument(skip(self), fields(chat_id = %chat))]
    async fn on_command(&self, chat: ChatId, command: Command) -> Result<()> {
        info!(?command, "command");
        match command {
            Command::Start => self.reply(chat, ChatKind::Private, self.inner.replies.welcome()).await,
            Command::Help => self.reply(chat, ChatKind::Private, self.inner.replies.help()).await,
            Command::Search => {
                let flags = self.inner.flags.flags().await;
                self.deliver(chat, ChatKind::Private, flags, self.open_root(chat))
                    .await
            }
        }
    }

    #[instrument(skip_all, fields(chat_id = %message.chat.id, user_id = %from.id))]
    async fn on_group_text(&self, message: &Message, from: &User, text: &str) -> Result<()> {
        let flags = self.inner.flags.flags().await;
        let screening = self.inner.gate.screen(from.id, text, flags).await;
        if !screening.is_query() {
            debug!(?screening, "group message ignored");
            return Ok(());
        }

        info!("material request detected");
        let chat = message.chat.id;
        let reply = self
            .inner
            .replies
            .group_invite(from.display_name(), message.message_id);
        self.deliver(chat, message.chat.kind(), flags, self.send(chat, &reply))
            .await
    }

    #[instrument(skip_all, fields(user_id = %query.from.id, token = query.data.as_deref().unwrap_or_default()))]
    async fn on_callback(&self, query: CallbackQuery) -> Result<()> {
        if let Err(e) = self.inner.platform.answer_callback(&query.id, None).await {
            debug!(error = %e, "callback acknowledgement failed");
        }
        if query.from.is_bot {
            return Ok(());
        }
        let Some(origin) = query.message else {
            return Ok(());
        };
        let data = query.data.unwrap_or_default();
        let chat = origin.chat.id;
        let flags = self.inner.flags.flags().await;

        self.deliver(
            chat,
            origin.chat.kind(),
            flags,
            self.show(chat, origin.message_id, &data),
        )
        .await
    }

    /// Send the branch list as a new message.
    async fn open_root(&self, chat: ChatId) -> Result<()> {
        let screen = self.inner.navigator.root().await;
        self.send(chat, &render(&screen, &self.inner.render)).await
    }

    /// Replace `message_id` with the screen `token` opens.
    async fn show(&self, chat: ChatId, message_id: MessageId, token: &str) -> Result<()> {
        let screen = self.inner.navigator.open(token).await;
        let message = render(&screen, &self.inner.render);
        match self
            .inner
            .platform
            .edit_message(chat, message_id, &message)
            .await
        {
            Ok(_) => Ok(()),
            Err(PlatformError::Api { code, description }) => {
                // Old messages can no longer be edited; send a fresh one.
                debug!(code, %description, "edit refused; sending new message");
                self.send(chat, &message).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn send(&self, chat: ChatId, message: &OutgoingMessage) -> Result<()> {
        let _ = self.inner.platform.send_message(chat, message).await?;
        Ok(())
    }

    async fn reply(&self, chat: ChatId, kind: ChatKind, message: OutgoingMessage) -> Result<()> {
        let flags = self.inner.flags.flags().await;
        self.deliver(chat, kind, flags, self.send(chat, &message))
            .await
    }

    /// Run `send` through the dispatch quota and handle throttling.
    async fn deliver<F>(&self, chat: ChatId, kind: ChatKind, flags: FeatureFlags, send: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        match self.inner.gate.dispatch(chat, kind, flags, send).await {
            Dispatch::Delivered(result) => result,
            Dispatch::Dropped | Dispatch::Throttled { notify: false } => Ok(()),
            Dispatch::Throttled { notify: true } => {
                self.send(chat, &self.inner.replies.throttled()).await
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
