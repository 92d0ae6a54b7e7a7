//! Audit trail for private conversations.
//!
//! Users are registered on first private contact. Inbound private messages
//! are logged by the dispatcher; outbound sends and edits are logged by
//! [`AuditingPlatform`], which wraps the real platform. Only chats with a
//! registered user are logged, so group content never reaches the store.
//! Store failures are logged and otherwise ignored.

use std::sync::Arc;

use async_trait::async_trait;
use learnverse_core::{ChatId, MessageId, OutgoingMessage};
use learnverse_store::{Database, MessageKind, MessageRepo, NewUser, StoreError, UserRepo, UserRow};
use learnverse_telegram::{BotCommand, ChatPlatform, Message, User};
use tracing::warn;

/// Users and messages of private conversations.
pub struct AuditTrail {
    users: UserRepo,
    messages: MessageRepo,
}

impl AuditTrail {
    /// Trail backed by `db`.
    pub fn new(db: Database) -> Self {
        Self {
            users: UserRepo::new(db.clone()),
            messages: MessageRepo::new(db),
        }
    }

    /// Get or create the user owning private chat `chat_id`.
    pub fn register(&self, chat_id: ChatId, user: &User) -> Option<UserRow> {
        let profile = NewUser {
            chat_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            language_code: user.language_code.clone(),
        };
        self.users
            .get_or_create(&profile)
            .inspect_err(|e| warn!(%chat_id, error = %e, "user registration failed"))
            .ok()
    }

    /// Log a message the user sent in a private chat.
    pub fn record_inbound(&self, user: &UserRow, message: &Message) {
        let text = message.text.as_deref();
        if let Err(e) = self.messages.record_inbound(
            user.id,
            message.chat.id,
            message.message_id,
            text.unwrap_or_default(),
            MessageKind::classify(text),
        ) {
            warn!(chat_id = %message.chat.id, error = %e, "inbound audit failed");
        }
    }

    /// Log (or update) a message the bot sent.
    pub fn record_outbound(&self, chat_id: ChatId, message_id: MessageId, content: &str) {
        let user = match self.users.get(chat_id) {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => return,
            Err(e) => {
                warn!(%chat_id, error = %e, "outbound audit lookup failed");
                return;
            }
        };
        if let Err(e) = self
            .messages
            .upsert_outbound(user.id, chat_id, message_id, content)
        {
            warn!(%chat_id, error = %e, "outbound audit failed");
        }
    }

    /// Messages logged for a chat, oldest first.
    pub fn history(&self, chat_id: ChatId, limit: usize) -> Vec<learnverse_store::MessageRow> {
        self.messages.list_for_chat(chat_id, limit).unwrap_or_default()
    }
}

/// [`ChatPlatform`] decorator that logs outbound messages to an
/// [`AuditTrail`].
pub struct AuditingPlatform {
    inner: Arc<dyn ChatPlatform>,
    audit: Arc<AuditTrail>,
}

impl AuditingPlatform {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn ChatPlatform>, audit: Arc<AuditTrail>) -> Self {
        Self { inner, audit }
    }
}

#[async_trait]
impl ChatPlatform for AuditingPlatform {
    async fn send_message(
        &self,
        chat_id: ChatId,
        message: &OutgoingMessage,
    ) -> learnverse_telegram::Result<MessageId> {
        let id = self.inner.send_message(chat_id, message).await?;
        self.audit.record_outbound(chat_id, id, &message.text);
        Ok(id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> learnverse_telegram::Result<Option<MessageId>> {
        let edited = self.inner.edit_message(chat_id, message_id, message).await?;
        if let Some(id) = edited {
            self.audit.record_outbound(chat_id, id, &message.text);
        }
        Ok(edited)
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> learnverse_telegram::Result<()> {
        self.inner.answer_callback(callback_id, text).await
    }

    async fn set_commands(&self, commands: &[BotCommand]) -> learnverse_telegram::Result<()> {
        self.inner.set_commands(commands).await
    }
}
