//! Screens produced by the navigator.

use learnverse_catalog::{Branch, Subject, Syllabus, Year};
use learnverse_core::ErrorKind;

use crate::token::NavToken;

static ROOT: NavToken = NavToken::Root;

/// Where in the traversal a screen sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavState {
    /// Choosing a branch. The browse command and the root token land here
    /// directly: the root has no screen of its own.
    BranchSelect,
    /// Choosing a year within a branch.
    YearSelect,
    /// Choosing a curriculum within a year.
    CurriculumSelect,
    /// Choosing a subject within a curriculum.
    SubjectSelect,
    /// Reading a subject's materials.
    MaterialsView,
}

/// Extra line shown above the branch list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The control that was pressed could not be understood.
    InvalidSelection,
}

/// Terminated screens: no forward controls, one way back to the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    /// The catalog could not be reached or reported failure.
    Unavailable,
    /// The requested entity does not exist.
    NotFound(&'static str),
    /// The catalog answered with something unusable.
    Internal,
}

impl Failure {
    /// Matching taxonomy kind.
    pub fn kind(self) -> ErrorKind {
        match self {
            Self::Unavailable => ErrorKind::UpstreamUnavailable,
            Self::NotFound(_) => ErrorKind::EntityNotFound,
            Self::Internal => ErrorKind::Internal,
        }
    }
}

/// One rendered step of the traversal. Built per request, never stored.
#[derive(Clone, Debug, PartialEq)]
pub enum Screen {
    /// All branches.
    Branches {
        /// Branches in catalog order.
        branches: Vec<Branch>,
        /// Optional line above the list.
        notice: Option<Notice>,
    },
    /// Years of one branch.
    Years {
        /// The branch, with its years.
        branch: Branch,
    },
    /// Curricula of one year.
    Curricula {
        /// The year, with its curricula.
        year: Year,
        /// Target of the back control.
        back: NavToken,
    },
    /// Subjects of one curriculum.
    Subjects {
        /// The curriculum, with its subjects.
        syllabus: Syllabus,
        /// Target of the back control.
        back: NavToken,
    },
    /// Materials of one subject.
    Materials {
        /// The subject, with its materials.
        subject: Subject,
        /// Target of the back control.
        back: NavToken,
    },
    /// Terminated screen.
    Failed(Failure),
}

impl Screen {
    /// State this screen represents; `None` for a terminated screen.
    pub fn state(&self) -> Option<NavState> {
        match self {
            Self::Branches { .. } => Some(NavState::BranchSelect),
            Self::Years { .. } => Some(NavState::YearSelect),
            Self::Curricula { .. } => Some(NavState::CurriculumSelect),
            Self::Subjects { .. } => Some(NavState::SubjectSelect),
            Self::Materials { .. } => Some(NavState::MaterialsView),
            Self::Failed(_) => None,
        }
    }

    /// Back target for screens below the branch list.
    pub fn back(&self) -> Option<&NavToken> {
        match self {
            Self::Years { .. } => Some(&ROOT),
            Self::Curricula { back, .. }
            | Self::Subjects { back, .. }
            | Self::Materials { back, .. } => Some(back),
            Self::Branches { .. } | Self::Failed(_) => None,
        }
    }
}
