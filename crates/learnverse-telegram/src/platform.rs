//! The chat platform seam.

use async_trait::async_trait;

use learnverse_core::{ChatId, MessageId, OutgoingMessage};

use crate::error::Result;
use crate::types::BotCommand;

/// Outbound operations the bot needs from a chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Send a new message; returns its id.
    async fn send_message(&self, chat_id: ChatId, message: &OutgoingMessage) -> Result<MessageId>;

    /// Replace a message's text and controls in place.
    ///
    /// Returns `None` when the platform reports the content unchanged.
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<Option<MessageId>>;

    /// Acknowledge a pressed control, optionally with a toast.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    /// Publish the command menu.
    async fn set_commands(&self, commands: &[BotCommand]) -> Result<()>;
}
