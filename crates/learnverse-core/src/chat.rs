//! Platform-neutral chat surface values.
//!
//! Handlers build an [`OutgoingMessage`] and hand it to whatever chat
//! platform adapter is wired in. Keeping these types free of transport
//! details lets the navigation and gate layers be tested without HTTP.

use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

/// Kind of conversation a message arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// One-to-one conversation with the bot.
    Private,
    /// Basic group.
    Group,
    /// Large group.
    Supergroup,
    /// Broadcast channel.
    Channel,
}

impl ChatKind {
    /// Whether the conversation is a private one-to-one chat.
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }

    /// Whether the conversation has more than one human participant.
    pub fn is_group(self) -> bool {
        !self.is_private()
    }

    /// Parse the platform's wire name. Unknown kinds are treated as groups
    /// so they never receive private-only behavior.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "private" => Self::Private,
            "supergroup" => Self::Supergroup,
            "channel" => Self::Channel,
            _ => Self::Group,
        }
    }
}

/// What an interactive control does when activated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ButtonAction {
    /// Send the opaque token back to the bot as a callback.
    Callback(String),
    /// Open an external URL.
    Url(String),
}

/// A labelled interactive control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Visible label.
    pub label: String,
    /// Activation behavior.
    pub action: ButtonAction,
}

impl Button {
    /// A control that round-trips `token` back to the bot.
    pub fn callback(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(token.into()),
        }
    }

    /// A control that opens `url`.
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    /// The callback token, if this is a callback control.
    pub fn token(&self) -> Option<&str> {
        match &self.action {
            ButtonAction::Callback(t) => Some(t),
            ButtonAction::Url(_) => None,
        }
    }
}

/// Rows of controls rendered under a message.
pub type Keyboard = Vec<Vec<Button>>;

/// A message the bot wants to send or edit into place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Body text. HTML-formatted when `html` is set.
    pub text: String,
    /// Whether `text` uses the platform's HTML formatting subset.
    pub html: bool,
    /// Controls rendered under the message.
    pub keyboard: Keyboard,
    /// Suppress link previews.
    pub disable_preview: bool,
    /// Reply to a specific message.
    pub reply_to: Option<MessageId>,
}

impl OutgoingMessage {
    /// Plain-text message with no controls.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// HTML-formatted message with no controls.
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: true,
            ..Self::default()
        }
    }

    /// Attach a keyboard.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }

    /// Reply to the given message.
    #[must_use]
    pub fn replying_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    /// Disable link previews.
    #[must_use]
    pub fn without_preview(mut self) -> Self {
        self.disable_preview = true;
        self
    }

    /// Iterate over every control in the keyboard, row by row.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.keyboard.iter().flatten()
    }
}
