//! In-memory platform that records every outbound call.
//!
//! Used by handler and end-to-end tests in place of the HTTP client.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use learnverse_core::{ChatId, MessageId, OutgoingMessage};

use crate::error::{PlatformError, Result};
use crate::platform::ChatPlatform;
use crate::types::BotCommand;

/// One recorded outbound call.
#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    /// `send_message`.
    Send {
        /// Target chat.
        chat_id: ChatId,
        /// Message body.
        message: OutgoingMessage,
    },
    /// `edit_message`.
    Edit {
        /// Target chat.
        chat_id: ChatId,
        /// Message replaced.
        message_id: MessageId,
        /// New body.
        message: OutgoingMessage,
    },
    /// `answer_callback`.
    Callback {
        /// Query id.
        id: String,
        /// Toast text.
        text: Option<String>,
    },
    /// `set_commands`.
    Commands(Vec<BotCommand>),
}

impl Sent {
    /// The message body for sends and edits.
    pub fn message(&self) -> Option<&OutgoingMessage> {
        match self {
            Self::Send { message, .. } | Self::Edit { message, .. } => Some(message),
            Self::Callback { .. } | Self::Commands(_) => None,
        }
    }
}

/// Platform double that records calls and hands out increasing message ids.
#[derive(Debug)]
pub struct RecordingPlatform {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    fail_sends: Mutex<bool>,
    queued_failures: Mutex<VecDeque<PlatformError>>,
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPlatform {
    /// Empty recorder; the first sent message gets id 1000.
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
            fail_sends: Mutex::new(false),
            queued_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Make subsequent sends and edits fail with an API error.
    pub fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock() = fail;
    }

    /// Fail the next send or edit with `err`. Queued failures are used up
    /// in order before [`fail_sends`](Self::fail_sends) is consulted.
    pub fn fail_next(&self, err: PlatformError) {
        self.queued_failures.lock().push_back(err);
    }

    /// Everything recorded so far.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// Only sends and edits, in order.
    pub fn messages(&self) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .iter()
            .filter_map(Sent::message)
            .cloned()
            .collect()
    }

    /// The most recent send or edit.
    pub fn last_message(&self) -> Option<OutgoingMessage> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find_map(Sent::message)
            .cloned()
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    fn check(&self) -> Result<()> {
        if let Some(err) = self.queued_failures.lock().pop_front() {
            return Err(err);
        }
        if *self.fail_sends.lock() {
            return Err(PlatformError::Api {
                code: 400,
                description: "Bad Request: chat not found".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn send_message(&self, chat_id: ChatId, message: &OutgoingMessage) -> Result<MessageId> {
        self.check()?;
        let id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sent.lock().push(Sent::Send {
            chat_id,
            message: message.clone(),
        });
        Ok(id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<Option<MessageId>> {
        self.check()?;
        self.sent.lock().push(Sent::Edit {
            chat_id,
            message_id,
            message: message.clone(),
        });
        Ok(Some(message_id))
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.sent.lock().push(Sent::Callback {
            id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }

    async fn set_commands(&self, commands: &[BotCommand]) -> Result<()> {
        self.sent.lock().push(Sent::Commands(commands.to_vec()));
        Ok(())
    }
}
