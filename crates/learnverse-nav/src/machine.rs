//! The navigation state machine.
//!
//! Each request decodes its token, fetches exactly the entity the token
//! names, and derives the back target from the token's embedded ancestor,
//! then from the fetched entity's parent reference, then the root. Nothing
//! is remembered between requests.

use std::sync::Arc;

use learnverse_catalog::{Catalog, CatalogError};
use learnverse_core::{BranchId, SubjectId, SyllabusId, YearId};
use tracing::{debug, error, instrument, warn};

use crate::screen::{Failure, Notice, Screen};
use crate::token::{Level, NavToken};

/// Drives traversal over a [`Catalog`].
#[derive(Clone)]
pub struct Navigator {
    catalog: Arc<dyn Catalog>,
}

impl Navigator {
    /// Navigator reading from `catalog`.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Branch list, as shown by the browse command.
    pub async fn root(&self) -> Screen {
        self.branches(None).await
    }

    /// Handle a raw token from a pressed control.
    ///
    /// Tokens that fail to decode fall back to the branch list with a short
    /// notice.
    pub async fn open(&self, raw: &str) -> Screen {
        match NavToken::decode(raw) {
            Ok(token) => self.navigate(&token).await,
            Err(err) => {
                warn!(token = raw, error = %err, "invalid navigation token");
                self.branches(Some(Notice::InvalidSelection)).await
            }
        }
    }

    /// Produce the screen `token` opens.
    #[instrument(skip_all, fields(token = %token))]
    pub async fn navigate(&self, token: &NavToken) -> Screen {
        match token {
            NavToken::Root => self.root().await,
            NavToken::Branch(id) => self.years(id).await,
            NavToken::Year { year, branch } => self.curricula(year, branch.as_ref()).await,
            NavToken::Syllabus { syllabus, year } => self.subjects(syllabus, year.as_ref()).await,
            NavToken::Subject { subject, syllabus } => {
                self.materials(subject, syllabus.as_ref()).await
            }
            NavToken::Back { level, id } => self.back_to_parent(*level, id).await,
        }
    }

    async fn branches(&self, notice: Option<Notice>) -> Screen {
        match self.catalog.branches().await {
            Ok(branches) => Screen::Branches { branches, notice },
            Err(err) => failed(&err),
        }
    }

    async fn years(&self, id: &BranchId) -> Screen {
        match self.catalog.branch(id).await {
            Ok(branch) => Screen::Years { branch },
            Err(err) => failed(&err),
        }
    }

    async fn curricula(&self, id: &YearId, branch: Option<&BranchId>) -> Screen {
        match self.catalog.year(id).await {
            Ok(year) => {
                let parent = branch.or_else(|| year.branch_id()).cloned();
                let back = pick_back(parent.map(NavToken::Branch), Level::Year, id);
                Screen::Curricula { year, back }
            }
            Err(err) => failed(&err),
        }
    }

    async fn subjects(&self, id: &SyllabusId, year: Option<&YearId>) -> Screen {
        match self.catalog.syllabus(id).await {
            Ok(syllabus) => {
                let parent = year.or_else(|| syllabus.year_id()).cloned();
                let back = pick_back(
                    parent.map(|year| NavToken::Year { year, branch: None }),
                    Level::Syllabus,
                    id,
                );
                Screen::Subjects { syllabus, back }
            }
            Err(err) => failed(&err),
        }
    }

    async fn materials(&self, id: &SubjectId, syllabus: Option<&SyllabusId>) -> Screen {
        match self.catalog.subject(id).await {
            Ok(subject) => {
                let parent = syllabus.or_else(|| subject.syllabus_id()).cloned();
                let back = pick_back(
                    parent.map(|syllabus| NavToken::Syllabus {
                        syllabus,
                        year: None,
                    }),
                    Level::Subject,
                    id,
                );
                Screen::Materials { subject, back }
            }
            Err(err) => failed(&err),
        }
    }

    /// Resolve a deferred back token: look up the entity, then open the
    /// listing its parent owns.
    async fn back_to_parent(&self, level: Level, id: &str) -> Screen {
        let parent = match level {
            Level::Branch => Ok(None),
            Level::Year => self
                .catalog
                .year(&YearId::new(id))
                .await
                .map(|y| y.branch_id().cloned().map(NavToken::Branch)),
            Level::Syllabus => self
                .catalog
                .syllabus(&SyllabusId::new(id))
                .await
                .map(|s| {
                    s.year_id().cloned().map(|year| NavToken::Year { year, branch: None })
                }),
            Level::Subject => self
                .catalog
                .subject(&SubjectId::new(id))
                .await
                .map(|u| {
                    u.syllabus_id().cloned().map(|syllabus| NavToken::Syllabus {
                        syllabus,
                        year: None,
                    })
                }),
        };

        match parent {
            Ok(Some(NavToken::Branch(branch))) => self.years(&branch).await,
            Ok(Some(NavToken::Year { year, .. })) => self.curricula(&year, None).await,
            Ok(Some(NavToken::Syllabus { syllabus, .. })) => self.subjects(&syllabus, None).await,
            Ok(_) => {
                debug!(?level, id, "no parent reference, returning to root");
                self.root().await
            }
            Err(err) => failed(&err),
        }
    }
}

/// The parent's forward token if it fits, else a deferred lookup on the
/// current entity, else the root.
fn pick_back(parent: Option<NavToken>, level: Level, current: &str) -> NavToken {
    let Some(parent) = parent else {
        return NavToken::Root;
    };
    if parent.encode().is_ok() {
        return parent;
    }
    let deferred = NavToken::back(level, current);
    if deferred.encode().is_ok() {
        return deferred;
    }
    NavToken::Root
}

fn failed(err: &CatalogError) -> Screen {
    let failure = match err {
        CatalogError::NotFound { entity, .. } => Failure::NotFound(*entity),
        CatalogError::Malformed { .. } => {
            error!(error = %err, "unusable catalog payload");
            Failure::Internal
        }
        CatalogError::Transport(_) | CatalogError::Status { .. } | CatalogError::Rejected { .. } => {
            warn!(error = %err, "catalog unavailable");
            Failure::Unavailable
        }
    };
    Screen::Failed(failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnverse_catalog::{
        Branch, BranchRef, InMemoryCatalog, Subject, SubjectSummary, Syllabus, SyllabusRef,
        SyllabusSummary, Year, YearRef,
    };

    use crate::screen::NavState;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_branch(Branch {
                id: "b1".into(),
                name: "Computer Science".into(),
                code: "CS".into(),
                years: vec![YearRef {
                    id: "y1".into(),
                    code: Some("2024".into()),
                    name: None,
                }],
            })
            .with_year(Year {
                id: "y1".into(),
                code: "2024".into(),
                name: Some("Third Year".into()),
                branch: Some(BranchRef {
                    id: Some("b1".into()),
                    ..BranchRef::default()
                }),
                syllabuses: vec![SyllabusSummary {
                    id: "s1".into(),
                    pattern_year: "2019".into(),
                }],
            })
            .with_syllabus(Syllabus {
                id: "s1".into(),
                pattern_year: "2019".into(),
                academic_year: Some(YearRef {
                    id: "y1".into(),
                    code: Some("2024".into()),
                    name: Some("Third Year".into()),
                }),
                subjects: vec![SubjectSummary {
                    id: "u1".into(),
                    code: "310241".into(),
                    name: "Operating Systems".into(),
                }],
            })
            .with_subject(Subject {
                id: "u1".into(),
                name: "Operating Systems".into(),
                code: "310241".into(),
                syllabus: Some(SyllabusRef {
                    id: Some("s1".into()),
                    pattern_year: Some("2019".into()),
                }),
                units: vec![],
                previous_year: learnverse_catalog::PreviousYear::default(),
                decodes: vec![],
                books: vec![],
            })
    }

    fn navigator(catalog: InMemoryCatalog) -> (Navigator, Arc<InMemoryCatalog>) {
        let catalog = Arc::new(catalog);
        (Navigator::new(catalog.clone()), catalog)
    }

    #[tokio::test]
    async fn root_lists_branches() {
        let (nav, _) = navigator(catalog());
        let screen = nav.root().await;
        assert_eq!(screen.state(), Some(NavState::BranchSelect));
        assert!(screen.back().is_none());
    }

    #[tokio::test]
    async fn embedded_ancestor_wins_over_lookup() {
        let (nav, _) = navigator(catalog());
        let screen = nav.open("y:y1:b9").await;
        assert_eq!(screen.back(), Some(&NavToken::Branch("b9".into())));
    }

    #[tokio::test]
    async fn parent_reference_fills_missing_ancestor() {
        let (nav, _) = navigator(catalog());
        let screen = nav.open("u:u1").await;
        assert_eq!(screen.state(), Some(NavState::MaterialsView));
        assert_eq!(
            screen.back(),
            Some(&NavToken::Syllabus {
                syllabus: "s1".into(),
                year: None
            })
        );
    }

    #[tokio::test]
    async fn missing_parent_falls_back_to_root() {
        let cat = catalog().with_year(Year {
            id: "y2".into(),
            code: "2025".into(),
            name: None,
            branch: None,
            syllabuses: vec![],
        });
        let (nav, _) = navigator(cat);
        let screen = nav.open("y:y2").await;
        assert_eq!(screen.back(), Some(&NavToken::Root));
    }

    #[tokio::test]
    async fn back_then_reselect_is_equivalent() {
        let (nav, _) = navigator(catalog());
        let first = nav.open("s:s1:y1").await;
        let back = first.back().unwrap().clone();
        assert_eq!(back.encode().unwrap(), "y:y1");

        let curricula = nav.navigate(&back).await;
        let Screen::Curricula { year, .. } = &curricula else {
            panic!("expected curricula, got {curricula:?}");
        };
        let child = NavToken::from_parts(Level::Syllabus, &year.syllabuses[0].id, Some(year.id.as_str()))
            .unwrap();
        assert_eq!(child.encode().unwrap(), "s:s1:y1");

        let again = nav.navigate(&child).await;
        assert_eq!(again, first);
    }

    #[tokio::test]
    async fn deferred_back_looks_up_parent() {
        let (nav, catalog) = navigator(catalog());
        let screen = nav.open("k:u:u1").await;
        assert_eq!(screen.state(), Some(NavState::SubjectSelect));
        assert_eq!(catalog.calls(), vec!["subject:u1", "syllabus:s1"]);

        let screen = nav.open("k:b:b1").await;
        assert_eq!(screen.state(), Some(NavState::BranchSelect));
    }

    #[tokio::test]
    async fn rejected_fetch_terminates() {
        let (nav, catalog) = navigator(catalog());
        catalog.fail("y1");
        assert_eq!(nav.open("y:y1:b1").await, Screen::Failed(Failure::Unavailable));
    }

    #[tokio::test]
    async fn unknown_entity_is_not_found() {
        let (nav, _) = navigator(catalog());
        assert_eq!(
            nav.open("u:nope").await,
            Screen::Failed(Failure::NotFound("subject"))
        );
    }

    #[tokio::test]
    async fn malformed_token_returns_to_root_with_notice() {
        let (nav, _) = navigator(catalog());
        let screen = nav.open("branch_b1").await;
        assert!(matches!(
            screen,
            Screen::Branches {
                notice: Some(Notice::InvalidSelection),
                ..
            }
        ));
    }

    #[test]
    fn oversized_parent_defers_to_lookup() {
        let parent = NavToken::Branch(BranchId::new("p".repeat(70)));
        assert_eq!(
            pick_back(Some(parent), Level::Year, "y1"),
            NavToken::back(Level::Year, "y1")
        );
        assert_eq!(pick_back(None, Level::Year, "y1"), NavToken::Root);
    }
}
