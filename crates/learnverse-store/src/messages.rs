use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use learnverse_core::{ChatId, MessageId};

use crate::database::Database;
use crate::error::StoreError;

/// What kind of interaction a logged message was.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Command,
    CallbackQuery,
    Other,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Command => "command",
            Self::CallbackQuery => "callback_query",
            Self::Other => "other",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "text" => Self::Text,
            "command" => Self::Command,
            "callback_query" => Self::CallbackQuery,
            _ => Self::Other,
        }
    }

    /// Classify an inbound message body: `/`-prefixed text is a command,
    /// other text is text, and anything without text is other.
    pub fn classify(text: Option<&str>) -> Self {
        match text {
            Some(t) if t.starts_with('/') => Self::Command,
            Some(_) => Self::Text,
            None => Self::Other,
        }
    }
}

/// One logged message in a private conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub content: String,
    pub is_bot: bool,
    pub kind: MessageKind,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRepo {
    db: Database,
}

impl MessageRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Log a message the user sent. Redelivered messages are ignored.
    #[instrument(skip(self, content), fields(chat_id = %chat_id, message_id = %message_id))]
    pub fn record_inbound(
        &self,
        user_id: i64,
        chat_id: ChatId,
        message_id: MessageId,
        content: &str,
        kind: MessageKind,
    ) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let _ = conn.execute(
                "INSERT INTO messages (user_id, chat_id, message_id, content, is_bot, kind, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?6) \
                 ON CONFLICT (chat_id, message_id, is_bot) DO NOTHING",
                rusqlite::params![
                    user_id,
                    chat_id.get(),
                    message_id.get(),
                    content,
                    kind.as_str(),
                    now
                ],
            )?;
            Ok(())
        })
    }

    /// Log a message the bot sent, or update it in place when the bot later
    /// edits the same message.
    #[instrument(skip(self, content), fields(chat_id = %chat_id, message_id = %message_id))]
    pub fn upsert_outbound(
        &self,
        user_id: i64,
        chat_id: ChatId,
        message_id: MessageId,
        content: &str,
    ) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let _ = conn.execute(
                "INSERT INTO messages (user_id, chat_id, message_id, content, is_bot, kind, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 1, 'text', ?5, ?5) \
                 ON CONFLICT (chat_id, message_id, is_bot) \
                 DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
                rusqlite::params![user_id, chat_id.get(), message_id.get(), content, now],
            )?;
            Ok(())
        })
    }

    /// Most recent messages in a conversation, oldest first.
    #[instrument(skip(self), fields(chat_id = %chat_id))]
    pub fn list_for_chat(&self, chat_id: ChatId, limit: usize) -> Result<Vec<MessageRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, chat_id, message_id, content, is_bot, kind, created_at, \
                 updated_at FROM messages WHERE chat_id = ?1 ORDER BY id DESC LIMIT ?2",
            )?;
            let mut rows = stmt
                .query_map(
                    rusqlite::params![chat_id.get(), i64::try_from(limit).unwrap_or(i64::MAX)],
                    |row| {
                        Ok(MessageRow {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            chat_id: ChatId(row.get(2)?),
                            message_id: MessageId(row.get(3)?),
                            content: row.get(4)?,
                            is_bot: row.get(5)?,
                            kind: MessageKind::parse(&row.get::<_, String>(6)?),
                            created_at: row.get(7)?,
                            updated_at: row.get(8)?,
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{NewUser, UserRepo};

    fn setup() -> (MessageRepo, i64) {
        let db = Database::in_memory().unwrap();
        let user = UserRepo::new(db.clone())
            .get_or_create(&NewUser::new(ChatId(7), "Bo"))
            .unwrap();
        (MessageRepo::new(db), user.id)
    }

    #[test]
    fn classify_kinds() {
        assert_eq!(MessageKind::classify(Some("/search")), MessageKind::Command);
        assert_eq!(MessageKind::classify(Some("hi")), MessageKind::Text);
        assert_eq!(MessageKind::classify(None), MessageKind::Other);
    }

    #[test]
    fn inbound_and_outbound_logged_in_order() {
        let (repo, user) = setup();
        repo.record_inbound(user, ChatId(7), MessageId(1), "/start", MessageKind::Command)
            .unwrap();
        repo.upsert_outbound(user, ChatId(7), MessageId(2), "Welcome").unwrap();

        let rows = repo.list_for_chat(ChatId(7), 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].content, "/start");
        assert!(!rows[0].is_bot);
        assert_eq!(rows[0].kind, MessageKind::Command);
        assert_eq!(rows[1].content, "Welcome");
        assert!(rows[1].is_bot);
    }

    #[test]
    fn edit_updates_existing_bot_row() {
        let (repo, user) = setup();
        repo.upsert_outbound(user, ChatId(7), MessageId(5), "Branches").unwrap();
        repo.upsert_outbound(user, ChatId(7), MessageId(5), "Years").unwrap();

        let rows = repo.list_for_chat(ChatId(7), 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content, "Years");
    }

    #[test]
    fn edit_of_untracked_message_inserts() {
        let (repo, user) = setup();
        repo.upsert_outbound(user, ChatId(7), MessageId(9), "Subjects").unwrap();
        assert_eq!(repo.list_for_chat(ChatId(7), 10).unwrap().len(), 1);
    }

    #[test]
    fn redelivered_inbound_ignored() {
        let (repo, user) = setup();
        repo.record_inbound(user, ChatId(7), MessageId(1), "hello", MessageKind::Text)
            .unwrap();
        repo.record_inbound(user, ChatId(7), MessageId(1), "hello", MessageKind::Text)
            .unwrap();
        assert_eq!(repo.list_for_chat(ChatId(7), 10).unwrap().len(), 1);
    }

    #[test]
    fn user_and_bot_rows_with_same_id_coexist() {
        let (repo, user) = setup();
        repo.record_inbound(user, ChatId(7), MessageId(3), "hi", MessageKind::Text)
            .unwrap();
        repo.upsert_outbound(user, ChatId(7), MessageId(3), "reply").unwrap();
        assert_eq!(repo.list_for_chat(ChatId(7), 10).unwrap().len(), 2);
    }

    #[test]
    fn list_respects_limit() {
        let (repo, user) = setup();
        for i in 1..=5 {
            repo.record_inbound(user, ChatId(7), MessageId(i), "m", MessageKind::Text)
                .unwrap();
        }
        let rows = repo.list_for_chat(ChatId(7), 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].message_id, MessageId(4));
        assert_eq!(rows[1].message_id, MessageId(5));
    }
}
