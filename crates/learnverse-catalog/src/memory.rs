//! In-process catalog for tests and local demos.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use learnverse_core::{BranchId, SubjectId, SyllabusId, YearId};

use crate::client::Catalog;
use crate::error::{CatalogError, Result};
use crate::types::{Branch, Subject, Syllabus, Year};

#[derive(Default)]
struct Inner {
    branches: Vec<Branch>,
    years: HashMap<YearId, Year>,
    syllabuses: HashMap<SyllabusId, Syllabus>,
    subjects: HashMap<SubjectId, Subject>,
    failing: HashSet<String>,
    calls: Vec<String>,
}

/// A [`Catalog`] over in-memory documents.
///
/// Ids registered with [`fail`](Self::fail) answer
/// [`CatalogError::Rejected`], the same as a `success: false` response.
/// Every call is recorded as `"<entity>:<id>"` (or `"branches"`).
#[derive(Default)]
pub struct InMemoryCatalog {
    inner: RwLock<Inner>,
}

impl InMemoryCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch.
    #[must_use]
    pub fn with_branch(self, branch: Branch) -> Self {
        self.inner.write().branches.push(branch);
        self
    }

    /// Add a year.
    #[must_use]
    pub fn with_year(self, year: Year) -> Self {
        let _ = self.inner.write().years.insert(year.id.clone(), year);
        self
    }

    /// Add a syllabus.
    #[must_use]
    pub fn with_syllabus(self, syllabus: Syllabus) -> Self {
        let _ = self
            .inner
            .write()
            .syllabuses
            .insert(syllabus.id.clone(), syllabus);
        self
    }

    /// Add a subject.
    #[must_use]
    pub fn with_subject(self, subject: Subject) -> Self {
        let _ = self
            .inner
            .write()
            .subjects
            .insert(subject.id.clone(), subject);
        self
    }

    /// Make lookups of `id` (or of the branch list, with `"branches"`) fail
    /// as if the catalog answered `success: false`.
    pub fn fail(&self, id: &str) {
        let _ = self.inner.write().failing.insert(id.to_string());
    }

    /// Calls made so far.
    pub fn calls(&self) -> Vec<String> {
        self.inner.read().calls.clone()
    }

    fn record(&self, entity: &str, id: &str) -> Result<()> {
        let mut inner = self.inner.write();
        inner.calls.push(format!("{entity}:{id}"));
        if inner.failing.contains(id) {
            return Err(CatalogError::Rejected {
                message: format!("{entity} {id} unavailable"),
            });
        }
        Ok(())
    }
}

fn not_found(entity: &'static str, id: &str) -> CatalogError {
    CatalogError::NotFound {
        entity,
        id: id.to_string(),
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn branches(&self) -> Result<Vec<Branch>> {
        {
            let mut inner = self.inner.write();
            inner.calls.push("branches".into());
            if inner.failing.contains("branches") {
                return Err(CatalogError::Rejected {
                    message: "branches unavailable".into(),
                });
            }
        }
        Ok(self.inner.read().branches.clone())
    }

    async fn branch(&self, id: &BranchId) -> Result<Branch> {
        self.record("branch", id)?;
        self.inner
            .read()
            .branches
            .iter()
            .find(|b| &b.id == id)
            .cloned()
            .ok_or_else(|| not_found("branch", id))
    }

    async fn year(&self, id: &YearId) -> Result<Year> {
        self.record("year", id)?;
        self.inner
            .read()
            .years
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("year", id))
    }

    async fn syllabus(&self, id: &SyllabusId) -> Result<Syllabus> {
        self.record("syllabus", id)?;
        self.inner
            .read()
            .syllabuses
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("syllabus", id))
    }

    async fn subject(&self, id: &SubjectId) -> Result<Subject> {
        self.record("subject", id)?;
        self.inner
            .read()
            .subjects
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("subject", id))
    }
}
