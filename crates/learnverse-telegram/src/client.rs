//! Telegram Bot API client.
//!
//! Every method is a JSON `POST` to `{api_base}/bot{token}/{method}`. The
//! token is kept in a [`SecretString`] and the URL is built per call so it
//! never sits in a `Debug`-printable field.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use learnverse_core::{ButtonAction, ChatId, Keyboard, MessageId, OutgoingMessage};

use crate::error::{PlatformError, Result};
use crate::platform::ChatPlatform;
use crate::types::{ApiResponse, BotCommand, Update};

const NOT_MODIFIED: &str = "message is not modified";

/// Extra time on top of the long-poll timeout before the HTTP call gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Timeout for calls other than `getUpdates` unless overridden.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    api_base_url: String,
    token: SecretString,
    request_timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Client for the bot identified by `token`.
    pub fn new(client: reqwest::Client, api_base_url: &str, token: SecretString) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Bound every call except the long poll by `timeout`.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base_url,
            self.token.expose_secret()
        )
    }

    /// POST `body` to `method`. `None` bounds the call by the request timeout.
    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let request = self
            .client
            .post(self.url(method))
            .json(body)
            .timeout(timeout.unwrap_or(self.request_timeout));
        // Strip the URL from transport errors: it contains the token.
        let response = request.send().await.map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(reqwest::Error::without_url)?;

        let parsed: ApiResponse<T> = serde_json::from_slice(&bytes).map_err(|e| {
            PlatformError::Decode(format!("{method} (HTTP {}): {e}", status.as_u16()))
        })?;

        if parsed.ok {
            return parsed
                .result
                .ok_or_else(|| PlatformError::Decode(format!("{method}: missing result")));
        }

        let code = parsed.error_code.unwrap_or(status.as_u16());
        let description = parsed.description.unwrap_or_default();
        if code == 429 {
            let retry_after_secs = parsed
                .parameters
                .and_then(|p| p.retry_after)
                .unwrap_or(1);
            warn!(method, retry_after_secs, "platform flood control");
            return Err(PlatformError::RateLimited { retry_after_secs });
        }
        Err(PlatformError::Api { code, description })
    }

    /// Long-poll for updates after `offset`.
    #[instrument(skip(self))]
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &body,
                Some(Duration::from_secs(timeout_secs) + POLL_GRACE),
            )
            .await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), "received updates");
        }
        Ok(updates)
    }
}

/// Request body shared by `sendMessage` and `editMessageText`.
fn message_body(chat_id: ChatId, message: &OutgoingMessage) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": message.text,
    });
    if message.html {
        body["parse_mode"] = json!("HTML");
    }
    if !message.keyboard.is_empty() {
        body["reply_markup"] = json!({ "inline_keyboard": inline_keyboard(&message.keyboard) });
    }
    if message.disable_preview {
        body["link_preview_options"] = json!({ "is_disabled": true });
    }
    if let Some(reply_to) = message.reply_to {
        body["reply_parameters"] = json!({
            "message_id": reply_to,
            "allow_sending_without_reply": true,
        });
    }
    body
}

fn inline_keyboard(keyboard: &Keyboard) -> Vec<Vec<Value>> {
    keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.action {
                    ButtonAction::Callback(token) => {
                        json!({ "text": button.label, "callback_data": token })
                    }
                    ButtonAction::Url(url) => json!({ "text": button.label, "url": url }),
                })
                .collect()
        })
        .collect()
}

#[derive(serde::Deserialize)]
struct SentMessage {
    message_id: MessageId,
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    #[instrument(skip(self, message), fields(chat_id = %chat_id))]
    async fn send_message(&self, chat_id: ChatId, message: &OutgoingMessage) -> Result<MessageId> {
        let sent: SentMessage = self
            .call("sendMessage", &message_body(chat_id, message), None)
            .await?;
        Ok(sent.message_id)
    }

    #[instrument(skip(self, message), fields(chat_id = %chat_id, message_id = %message_id))]
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<Option<MessageId>> {
        let mut body = message_body(chat_id, message);
        body["message_id"] = json!(message_id);
        if let Some(fields) = body.as_object_mut() {
            let _ = fields.remove("reply_parameters");
        }
        match self.call::<_, Value>("editMessageText", &body, None).await {
            Ok(_) => Ok(Some(message_id)),
            Err(PlatformError::Api { description, .. }) if description.contains(NOT_MODIFIED) => {
                debug!("edit skipped: content unchanged");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self))]
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: bool = self.call("answerCallbackQuery", &body, None).await?;
        Ok(())
    }

    #[instrument(skip(self, commands), fields(count = commands.len()))]
    async fn set_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let _: bool = self
            .call("setMyCommands", &json!({ "commands": commands }), None)
            .await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
