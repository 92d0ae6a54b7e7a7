//! Branded ID newtypes for type safety.
//!
//! Catalog entities are identified by opaque strings issued by the catalog
//! service. Each level of the hierarchy gets its own newtype so a year ID can
//! never be passed where a subject ID is expected. Chat identities issued by
//! the messaging platform are signed 64-bit integers and get the same
//! treatment.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Return the raw platform value.
            #[must_use]
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }
    };
}

branded_id!(
    /// Identifies an academic branch (e.g. Computer Science).
    BranchId
);
branded_id!(
    /// Identifies an academic year within a branch.
    YearId
);
branded_id!(
    /// Identifies a curriculum (syllabus pattern) within a year.
    SyllabusId
);
branded_id!(
    /// Identifies a subject within a syllabus.
    SubjectId
);
branded_id!(
    /// Identifies a downloadable material file.
    FileId
);

platform_id!(
    /// A conversation on the messaging platform (private chat or group).
    ChatId
);
platform_id!(
    /// A person (or bot account) on the messaging platform.
    UserId
);
platform_id!(
    /// A message within a conversation.
    MessageId
);
