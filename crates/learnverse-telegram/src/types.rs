//! Bot API wire types.
//!
//! Only the fields the bot reads are modelled; everything else in an update
//! is ignored by serde.

use serde::{Deserialize, Serialize};

use learnverse_core::{ChatId, ChatKind, MessageId, UserId};

/// Envelope around every Bot API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Result payload when `ok`.
    pub result: Option<T>,
    /// Error description when not `ok`.
    #[serde(default)]
    pub description: Option<String>,
    /// Error code when not `ok`.
    #[serde(default)]
    pub error_code: Option<u16>,
    /// Extra details such as `retry_after`.
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

/// Extra error details.
#[derive(Debug, Default, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before retrying after a flood-control error.
    #[serde(default)]
    pub retry_after: Option<u64>,
}

/// One incoming update.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Update {
    /// Monotonic update id.
    pub update_id: i64,
    /// New message, if this update carries one.
    #[serde(default)]
    pub message: Option<Message>,
    /// Pressed inline control, if this update carries one.
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// The private conversation this update came from, if any.
    pub fn private_chat(&self) -> Option<ChatId> {
        self.message
            .as_ref()
            .or_else(|| self.callback_query.as_ref()?.message.as_ref())
            .map(|m| &m.chat)
            .filter(|chat| chat.kind().is_private())
            .map(|chat| chat.id)
    }
}

/// A user or bot account.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Account id.
    pub id: UserId,
    /// Whether the account is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Last name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Handle without `@`.
    #[serde(default)]
    pub username: Option<String>,
    /// IETF language tag.
    #[serde(default)]
    pub language_code: Option<String>,
}

impl User {
    /// How to address the user: handle, then first name, then "there".
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|u| !u.is_empty())
            .or(Some(self.first_name.as_str()).filter(|n| !n.is_empty()))
            .unwrap_or("there")
    }
}

/// A conversation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Chat {
    /// Chat id.
    pub id: ChatId,
    /// `private`, `group`, `supergroup` or `channel`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Group title.
    #[serde(default)]
    pub title: Option<String>,
}

impl Chat {
    /// Parsed conversation kind.
    pub fn kind(&self) -> ChatKind {
        ChatKind::from_wire(&self.kind)
    }
}

/// A chat message.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Message {
    /// Message id within the chat.
    pub message_id: MessageId,
    /// Sender; absent for channel posts.
    #[serde(default)]
    pub from: Option<User>,
    /// Conversation.
    pub chat: Chat,
    /// Unix timestamp.
    #[serde(default)]
    pub date: i64,
    /// Text body.
    #[serde(default)]
    pub text: Option<String>,
    /// Members added to a group (service message).
    #[serde(default)]
    pub new_chat_members: Option<Vec<User>>,
}

impl Message {
    /// Whether the text starts with a `/command`.
    pub fn is_command(&self) -> bool {
        self.text.as_deref().is_some_and(|t| t.starts_with('/'))
    }

    /// Whether this is a "members joined" service message.
    pub fn is_member_join(&self) -> bool {
        self.new_chat_members.as_ref().is_some_and(|m| !m.is_empty())
    }
}

/// A pressed inline control.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CallbackQuery {
    /// Query id, answered to stop the client spinner.
    pub id: String,
    /// Who pressed.
    pub from: User,
    /// Message the control belonged to.
    #[serde(default)]
    pub message: Option<Message>,
    /// Token attached to the control.
    #[serde(default)]
    pub data: Option<String>,
}

/// Entry in the bot's command menu.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BotCommand {
    /// Command without the slash.
    pub command: String,
    /// Menu description.
    pub description: String,
}

impl BotCommand {
    /// Build a command entry.
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}
