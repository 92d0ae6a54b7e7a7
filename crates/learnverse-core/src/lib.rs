//! # learnverse-core
//!
//! Foundation types shared by every Learnverse crate:
//!
//! - [`ids`]: branded newtypes for catalog entities and chat identities
//! - [`chat`]: platform-neutral outgoing messages, keyboards, and chat kinds
//! - [`markup`]: HTML escaping and length limits for message bodies and labels
//! - [`errors`]: the user-facing error taxonomy every failure is folded into

#![deny(unsafe_code)]

pub mod chat;
pub mod errors;
pub mod ids;
pub mod markup;

pub use chat::{Button, ButtonAction, ChatKind, Keyboard, OutgoingMessage};
pub use errors::ErrorKind;
pub use ids::{BranchId, ChatId, FileId, MessageId, SubjectId, SyllabusId, UserId, YearId};
