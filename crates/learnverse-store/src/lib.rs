//! # learnverse-store
//!
//! SQLite audit trail for private conversations: who talked to the bot and
//! what was exchanged. Group conversations are never persisted.

pub mod database;
pub mod error;
pub mod messages;
pub mod schema;
pub mod users;

pub use database::Database;
pub use error::StoreError;
pub use messages::{MessageKind, MessageRepo, MessageRow};
pub use users::{NewUser, UserRepo, UserRow};
