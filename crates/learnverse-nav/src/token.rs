//! Navigation tokens.
//!
//! Every control carries a short colon-delimited token naming the screen it
//! opens. Tokens are plain text so they can be read straight off the wire:
//!
//! | Token | Opens |
//! |---|---|
//! | `r` | branch list |
//! | `b:<branch>` | years of a branch |
//! | `y:<year>[:<branch>]` | curricula of a year |
//! | `s:<syllabus>[:<year>]` | subjects of a curriculum |
//! | `u:<subject>[:<syllabus>]` | materials of a subject |
//! | `k:<b\|y\|s\|u>:<id>` | the listing containing `<id>`, found by a catalog lookup |
//!
//! The optional trailing id is the nearest ancestor. It is dropped when the
//! token would not fit in [`MAX_TOKEN_BYTES`].

use std::fmt;

use learnverse_core::{BranchId, SubjectId, SyllabusId, YearId};

use crate::error::NavError;

/// Platform limit on control data.
pub const MAX_TOKEN_BYTES: usize = 64;

const DELIMITER: char = ':';

/// Catalog level an entity lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// Branch.
    Branch,
    /// Academic year.
    Year,
    /// Curriculum.
    Syllabus,
    /// Subject.
    Subject,
}

impl Level {
    fn tag(self) -> char {
        match self {
            Self::Branch => 'b',
            Self::Year => 'y',
            Self::Syllabus => 's',
            Self::Subject => 'u',
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "b" => Some(Self::Branch),
            "y" => Some(Self::Year),
            "s" => Some(Self::Syllabus),
            "u" => Some(Self::Subject),
            _ => None,
        }
    }
}

/// A decoded navigation token.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NavToken {
    /// Start over at the branch list.
    Root,
    /// Years of a branch.
    Branch(BranchId),
    /// Curricula of a year.
    Year {
        /// Year to open.
        year: YearId,
        /// Branch the year was reached from.
        branch: Option<BranchId>,
    },
    /// Subjects of a curriculum.
    Syllabus {
        /// Curriculum to open.
        syllabus: SyllabusId,
        /// Year the curriculum was reached from.
        year: Option<YearId>,
    },
    /// Materials of a subject.
    Subject {
        /// Subject to open.
        subject: SubjectId,
        /// Curriculum the subject was reached from.
        syllabus: Option<SyllabusId>,
    },
    /// The listing that contains `id`, whose parent is looked up on demand.
    Back {
        /// Level of `id`.
        level: Level,
        /// Entity whose parent listing to show.
        id: String,
    },
}

impl NavToken {
    /// Build a token from its parts.
    ///
    /// `ancestor` is ignored for [`Level::Branch`], whose parent is the root.
    pub fn from_parts(level: Level, id: &str, ancestor: Option<&str>) -> Result<Self, NavError> {
        let id = checked_id(id)?;
        let ancestor = ancestor.map(checked_id).transpose()?;
        Ok(match level {
            Level::Branch => Self::Branch(BranchId::new(id)),
            Level::Year => Self::Year {
                year: YearId::new(id),
                branch: ancestor.map(BranchId::new),
            },
            Level::Syllabus => Self::Syllabus {
                syllabus: SyllabusId::new(id),
                year: ancestor.map(YearId::new),
            },
            Level::Subject => Self::Subject {
                subject: SubjectId::new(id),
                syllabus: ancestor.map(SyllabusId::new),
            },
        })
    }

    /// Deferred back token for the listing containing `id`.
    pub fn back(level: Level, id: impl Into<String>) -> Self {
        Self::Back {
            level,
            id: id.into(),
        }
    }

    /// Level of the entity this token names, `None` for [`NavToken::Root`].
    pub fn level(&self) -> Option<Level> {
        match self {
            Self::Root => None,
            Self::Branch(_) => Some(Level::Branch),
            Self::Year { .. } => Some(Level::Year),
            Self::Syllabus { .. } => Some(Level::Syllabus),
            Self::Subject { .. } => Some(Level::Subject),
            Self::Back { level, .. } => Some(*level),
        }
    }

    /// Id of the entity this token names.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Branch(id) => Some(id.as_str()),
            Self::Year { year, .. } => Some(year.as_str()),
            Self::Syllabus { syllabus, .. } => Some(syllabus.as_str()),
            Self::Subject { subject, .. } => Some(subject.as_str()),
            Self::Back { id, .. } => Some(id.as_str()),
        }
    }

    /// Embedded ancestor id, if any.
    pub fn ancestor(&self) -> Option<&str> {
        match self {
            Self::Year { branch, .. } => branch.as_deref(),
            Self::Syllabus { year, .. } => year.as_deref(),
            Self::Subject { syllabus, .. } => syllabus.as_deref(),
            Self::Root | Self::Branch(_) | Self::Back { .. } => None,
        }
    }

    /// The same token with its ancestor removed.
    #[must_use]
    pub fn without_ancestor(&self) -> Self {
        match self {
            Self::Year { year, .. } => Self::Year {
                year: year.clone(),
                branch: None,
            },
            Self::Syllabus { syllabus, .. } => Self::Syllabus {
                syllabus: syllabus.clone(),
                year: None,
            },
            Self::Subject { subject, .. } => Self::Subject {
                subject: subject.clone(),
                syllabus: None,
            },
            other => other.clone(),
        }
    }

    /// Encode for the wire.
    ///
    /// The ancestor is dropped when the full token exceeds
    /// [`MAX_TOKEN_BYTES`]; if the token is still too long the call fails
    /// rather than produce an oversized token.
    pub fn encode(&self) -> Result<String, NavError> {
        let head = match self {
            Self::Root => return Ok("r".to_string()),
            Self::Branch(id) => tagged('b', id)?,
            Self::Year { year, .. } => tagged('y', year)?,
            Self::Syllabus { syllabus, .. } => tagged('s', syllabus)?,
            Self::Subject { subject, .. } => tagged('u', subject)?,
            Self::Back { level, id } => format!("k{DELIMITER}{}{DELIMITER}{}", level.tag(), checked_id(id)?),
        };

        if let Some(ancestor) = self.ancestor() {
            let full = format!("{head}{DELIMITER}{}", checked_id(ancestor)?);
            if full.len() <= MAX_TOKEN_BYTES {
                return Ok(full);
            }
        }
        if head.len() > MAX_TOKEN_BYTES {
            return Err(NavError::TokenTooLong {
                len: head.len(),
                max: MAX_TOKEN_BYTES,
            });
        }
        Ok(head)
    }

    /// Decode a token received from the platform.
    pub fn decode(token: &str) -> Result<Self, NavError> {
        let malformed = || NavError::MalformedToken {
            token: token.to_string(),
        };
        let parts: Vec<&str> = token.split(DELIMITER).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(malformed());
        }

        match parts.as_slice() {
            ["r"] => Ok(Self::Root),
            ["b", id] => Ok(Self::Branch(BranchId::new(*id))),
            ["y", id, rest @ ..] if rest.len() <= 1 => Ok(Self::Year {
                year: YearId::new(*id),
                branch: rest.first().map(|a| BranchId::new(*a)),
            }),
            ["s", id, rest @ ..] if rest.len() <= 1 => Ok(Self::Syllabus {
                syllabus: SyllabusId::new(*id),
                year: rest.first().map(|a| YearId::new(*a)),
            }),
            ["u", id, rest @ ..] if rest.len() <= 1 => Ok(Self::Subject {
                subject: SubjectId::new(*id),
                syllabus: rest.first().map(|a| SyllabusId::new(*a)),
            }),
            ["k", tag, id] => {
                let level = Level::from_tag(tag).ok_or_else(malformed)?;
                Ok(Self::back(level, *id))
            }
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for NavToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.encode() {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

fn checked_id(id: &str) -> Result<&str, NavError> {
    if id.is_empty() || id.contains(DELIMITER) {
        return Err(NavError::InvalidEntityId { id: id.to_string() });
    }
    Ok(id)
}

fn tagged(tag: char, id: &str) -> Result<String, NavError> {
    Ok(format!("{tag}{DELIMITER}{}", checked_id(id)?))
}
