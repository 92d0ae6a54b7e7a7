//! The [`Catalog`] trait and its HTTP implementation.
//!
//! Every endpoint answers `{ success: bool, data: T | null }` under
//! `{apiBase}/api/v1`. Failures are classified as:
//!
//! | Response | Error |
//! |---|---|
//! | connect error / timeout | [`CatalogError::Transport`] |
//! | HTTP 404, or `data: null` for a single entity | [`CatalogError::NotFound`] |
//! | other non-2xx | [`CatalogError::Status`] |
//! | `success: false` | [`CatalogError::Rejected`] |
//! | body does not decode | [`CatalogError::Malformed`] |

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use learnverse_core::{BranchId, SubjectId, SyllabusId, YearId};

use crate::error::{CatalogError, Result};
use crate::types::{Branch, Subject, Syllabus, Year};

/// Read access to the study-material catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All branches, in catalog order.
    async fn branches(&self) -> Result<Vec<Branch>>;
    /// One branch with its years.
    async fn branch(&self, id: &BranchId) -> Result<Branch>;
    /// One year with its curricula.
    async fn year(&self, id: &YearId) -> Result<Year>;
    /// One curriculum with its subjects.
    async fn syllabus(&self, id: &SyllabusId) -> Result<Syllabus>;
    /// One subject with all of its materials.
    async fn subject(&self, id: &SubjectId) -> Result<Subject>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

/// [`Catalog`] backed by the catalog REST API.
#[derive(Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCatalog {
    /// Client for `{api_base_url}/api/v1`.
    pub fn new(client: reqwest::Client, api_base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: format!("{}/api/v1", api_base_url.trim_end_matches('/')),
            timeout,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        entity: &'static str,
        path: &str,
    ) -> Result<Option<T>> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, entity, "catalog request");

        let response = self.client.get(&url).timeout(self.timeout).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "catalog request failed");
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|e| CatalogError::Malformed {
                entity,
                message: e.to_string(),
            })?;
        if !envelope.success {
            return Err(CatalogError::Rejected {
                message: envelope.message.unwrap_or_default(),
            });
        }
        Ok(envelope.data)
    }

    async fn get_one<T: DeserializeOwned>(&self, entity: &'static str, id: &str) -> Result<T> {
        let not_found = || CatalogError::NotFound {
            entity,
            id: id.to_string(),
        };
        if !is_path_segment(id) {
            debug!(entity, id, "id is not a plain path segment; not requesting");
            return Err(not_found());
        }
        self.get(entity, &format!("/{entity}/{id}"))
            .await?
            .ok_or_else(not_found)
    }
}

/// Catalog ids are document-store object ids. Anything that could change
/// the request path (`/`, `?`, `#`, `%`, dot segments) never matches one.
fn is_path_segment(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[async_trait]
impl Catalog for HttpCatalog {
    #[instrument(skip(self))]
    async fn branches(&self) -> Result<Vec<Branch>> {
        Ok(self.get("branch", "/branch").await?.unwrap_or_default())
    }

    #[instrument(skip(self), fields(branch_id = %id))]
    async fn branch(&self, id: &BranchId) -> Result<Branch> {
        self.get_one("branch", id).await
    }

    #[instrument(skip(self), fields(year_id = %id))]
    async fn year(&self, id: &YearId) -> Result<Year> {
        self.get_one("year", id).await
    }

    #[instrument(skip(self), fields(syllabus_id = %id))]
    async fn syllabus(&self, id: &SyllabusId) -> Result<Syllabus> {
        self.get_one("syllabus", id).await
    }

    #[instrument(skip(self), fields(subject_id = %id))]
    async fn subject(&self, id: &SubjectId) -> Result<Subject> {
        self.get_one("subject", id).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
