//! Fixed reply texts.
//!
//! Everything the bot says outside of catalog screens. Bodies are HTML;
//! user-supplied names are escaped before interpolation.

use learnverse_core::markup::escape_html;
use learnverse_core::{Button, MessageId, OutgoingMessage};
use learnverse_telegram::BotCommand;

const WELCOME: &str = "🎓 <b>Welcome to Learnverse Bot!</b>\n\n\
I can help you access:\n\
• 📁 Files &amp; Study Materials\n\
• 📚 Syllabuses &amp; PDFs\n\
• 📝 Notes &amp; Resources\n\n\
Use /search to find and download files!\n\
Use /help to see all available commands.";

const HELP: &str = "📋 <b>Available Commands:</b>\n\n\
/start - Start the bot and see welcome message\n\
/help - Display this help message\n\
/search - Search and download files by branch and year\n\n\
Need more help? Contact support!";

const PERSONA: &str = "Meow! Luna here! 🐈\n\n\
I'm your classy study companion (and an orange cat! ✨).\n\
I'm here to provide study materials.\n\n\
<b>How I can help:</b>\n\
/search - Browse my organized library 📚\n\
/help - See commands\n\n\
Just use /search and I'll guide you!";

/// Sent once per window to a private chat that hit its reply quota.
pub const THROTTLE_NOTICE: &str = "Meow! 😿 Hold on! It's my lunch time 🐟 (I'm eating fish).\n\
Please wait a moment, I'll be back soon!";

/// Sent to bot accounts that message the bot privately.
pub const BOTS_NOT_ALLOWED: &str = "You are a bot, bots are not allowed";

/// Sent once when handling a private update fails unexpectedly.
pub const APOLOGY: &str = "Meow... 🙀 Something went wrong on my side. Please try again in a little while.";

/// The command menu published at startup.
pub fn commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Start bot"),
        BotCommand::new("help", "Help"),
        BotCommand::new("search", "Search files"),
    ]
}

/// Links the fixed replies point at.
#[derive(Clone, Debug)]
pub struct Replies {
    bot_username: String,
    web_base_url: String,
    study_group_link: String,
}

impl Replies {
    /// Replies linking to the given bot, web catalog and study group.
    pub fn new(
        bot_username: impl Into<String>,
        web_base_url: impl Into<String>,
        study_group_link: impl Into<String>,
    ) -> Self {
        Self {
            bot_username: bot_username.into(),
            web_base_url: web_base_url.into(),
            study_group_link: study_group_link.into(),
        }
    }

    /// `/start`.
    pub fn welcome(&self) -> OutgoingMessage {
        OutgoingMessage::html(WELCOME)
    }

    /// `/help`.
    pub fn help(&self) -> OutgoingMessage {
        OutgoingMessage::html(HELP)
    }

    /// Answer to any free text in a private chat.
    pub fn persona(&self) -> OutgoingMessage {
        OutgoingMessage::html(PERSONA).with_keyboard(vec![vec![Button::url(
            "Join Study Group",
            &self.study_group_link,
        )]])
    }

    /// Answer to a detected material request in a group, threaded under the
    /// triggering message.
    pub fn group_invite(&self, name: &str, reply_to: MessageId) -> OutgoingMessage {
        let text = format!(
            "Meow! I can help with that, {}\n\n\
             Chat with me privately and I'll find what you need:\n\
             🐱 <a href=\"https://t.me/{}\">Talk to Luna</a>\n\
             📚 <a href=\"{}\">Browse web</a>",
            escape_html(name),
            escape_html(&self.bot_username),
            escape_html(&self.web_base_url),
        );
        OutgoingMessage::html(text)
            .replying_to(reply_to)
            .without_preview()
    }

    /// The "please wait" line.
    pub fn throttled(&self) -> OutgoingMessage {
        OutgoingMessage::plain(THROTTLE_NOTICE)
    }

    /// Generic apology for an unexpected failure.
    pub fn apology(&self) -> OutgoingMessage {
        OutgoingMessage::plain(APOLOGY)
    }

    /// Rejection for bot accounts.
    pub fn bots_not_allowed(&self) -> OutgoingMessage {
        OutgoingMessage::plain(BOTS_NOT_ALLOWED)
    }
}
