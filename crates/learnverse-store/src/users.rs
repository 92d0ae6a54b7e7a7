use chrono::Utc;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use learnverse_core::ChatId;

use crate::database::Database;
use crate::error::StoreError;

/// A person who has talked to the bot privately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub chat_id: ChatId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Profile fields captured on first contact.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub chat_id: ChatId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

impl NewUser {
    /// Profile with only the required fields set.
    pub fn new(chat_id: ChatId, first_name: impl Into<String>) -> Self {
        Self {
            chat_id,
            first_name: first_name.into(),
            last_name: None,
            username: None,
            language_code: None,
        }
    }
}

const SELECT_USER: &str = "SELECT id, chat_id, first_name, last_name, username, language_code, \
                           created_at, updated_at FROM users";

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        chat_id: ChatId(row.get(1)?),
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        username: row.get(4)?,
        language_code: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get or create the user owning a private chat.
    /// An existing row is returned unchanged.
    #[instrument(skip(self, user), fields(chat_id = %user.chat_id))]
    pub fn get_or_create(&self, user: &NewUser) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            let existing = conn
                .query_row(
                    &format!("{SELECT_USER} WHERE chat_id = ?1"),
                    [user.chat_id.get()],
                    map_user,
                )
                .optional()?;

            if let Some(row) = existing {
                return Ok(row);
            }

            let now = Utc::now().to_rfc3339();
            let _ = conn.execute(
                "INSERT INTO users (chat_id, first_name, last_name, username, language_code, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![
                    user.chat_id.get(),
                    user.first_name,
                    user.last_name,
                    user.username,
                    user.language_code,
                    now
                ],
            )?;
            tracing::info!(chat_id = %user.chat_id, "new user registered");

            Ok(UserRow {
                id: conn.last_insert_rowid(),
                chat_id: user.chat_id,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                username: user.username.clone(),
                language_code: user.language_code.clone(),
                created_at: now.clone(),
                updated_at: now,
            })
        })
    }

    /// Look up a user by their private chat.
    #[instrument(skip(self), fields(chat_id = %chat_id))]
    pub fn get(&self, chat_id: ChatId) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("{SELECT_USER} WHERE chat_id = ?1"),
                [chat_id.get()],
                map_user,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("user {chat_id}")))
        })
    }

    /// Number of registered users.
    pub fn count(&self) -> Result<u64, StoreError> {
        self.db.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(u64::try_from(n).unwrap_or_default())
        })
    }
}
