//! # learnverse-telegram
//!
//! The chat platform seam and its Telegram implementation.
//!
//! Handlers depend on [`ChatPlatform`] only. [`TelegramClient`] speaks the Bot
//! API over HTTPS; [`RecordingPlatform`] records calls for tests.

#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod platform;
pub mod recording;
pub mod types;

pub use client::TelegramClient;
pub use error::{PlatformError, Result};
pub use platform::ChatPlatform;
pub use recording::{RecordingPlatform, Sent};
pub use types::{BotCommand, CallbackQuery, Chat, Message, Update, User};
