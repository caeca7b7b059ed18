//! HTTP client for the DSA Recall backend.
//!
//! All requests go through one [`ApiClient`] configured once with the base
//! URL, a timeout, and a cookie store — the session credential established by
//! login is a cookie the transport attaches automatically from then on, so
//! no other component ever handles credentials per-call. The cookie is also
//! persisted to a state file so separate CLI invocations share the session.
//!
//! [`RecallBackend`] is the seam the session store and dashboard model are
//! written against; `ApiClient` is its production implementation.

pub mod error;
#[cfg(test)]
pub(crate) mod fakes;
pub mod models;

pub use error::ApiError;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use models::{
    ActivityDay, Credentials, Problem, ProblemDraft, ProblemPage, ProblemPatch, ReviewRequest,
    SignupDetails, UserIdentity,
};

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations the DSA Recall backend exposes.
///
/// The session store and dashboard model depend on this trait rather than on
/// `ApiClient` so tests can substitute a scripted backend.
#[async_trait]
pub trait RecallBackend: Send + Sync {
    /// `GET /api/me` — the current identity, or `NotAuthenticated`.
    async fn me(&self) -> ApiResult<UserIdentity>;
    /// `POST /api/login` — establishes the session cookie, returns no body.
    async fn login(&self, credentials: &Credentials) -> ApiResult<()>;
    /// `POST /api/signup`.
    async fn signup(&self, details: &SignupDetails) -> ApiResult<()>;
    /// `POST /api/logout`.
    async fn logout(&self) -> ApiResult<()>;
    /// `GET /api/problems/due` — paginated, never filtered.
    async fn list_due(&self, page: u32, limit: u32) -> ApiResult<ProblemPage>;
    /// `GET /api/problems` — paginated, `q` sent only when non-empty.
    async fn list_all(&self, search: &str, page: u32, limit: u32) -> ApiResult<ProblemPage>;
    /// `POST /api/problems`.
    async fn create_problem(&self, draft: &ProblemDraft) -> ApiResult<Problem>;
    /// `GET /api/problems/:id`.
    async fn get_problem(&self, id: i64) -> ApiResult<Problem>;
    /// `PATCH /api/problems/:id`.
    async fn update_problem(&self, id: i64, patch: &ProblemPatch) -> ApiResult<Problem>;
    /// `POST /api/problems/:id/review` — backend recomputes streak and next
    /// review date; callers refetch rather than patching local copies.
    async fn review_problem(&self, id: i64, is_easy: bool) -> ApiResult<Problem>;
    /// `GET /api/activity/heatmap?months=`.
    async fn activity(&self, months: u32) -> ApiResult<Vec<ActivityDay>>;
}

/// Typed client for the DSA Recall REST API.
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    jar: Arc<Jar>,
    cookie_path: Option<PathBuf>,
}

impl ApiClient {
    /// Create a client for the given base URL.
    ///
    /// When `cookie_path` is set, previously saved session cookies are loaded
    /// into the jar and every auth transition is written back to that file.
    pub fn new(base_url: &str, timeout: Duration, cookie_path: Option<PathBuf>) -> Result<Self> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid API URL: {}", base_url))?;

        let jar = Arc::new(Jar::default());
        if let Some(path) = &cookie_path {
            load_cookies(&jar, &base, path);
        }

        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base,
            http,
            jar,
            cookie_path,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Drop the persisted session cookie, if any.
    pub fn forget_session(&self) {
        if let Some(path) = &self.cookie_path {
            let _ = std::fs::remove_file(path);
        }
    }

    /// Write the jar's current cookies for the backend back to disk.
    fn persist_cookies(&self) {
        let Some(path) = &self.cookie_path else {
            return;
        };
        match self.jar.cookies(&self.base) {
            Some(header) => {
                let Ok(value) = header.to_str() else {
                    return;
                };
                if let Some(parent) = path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                let lines = value.split("; ").collect::<Vec<_>>().join("\n");
                if let Err(e) = std::fs::write(path, lines) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to save session cookie");
                }
            }
            None => {
                let _ = std::fs::remove_file(path);
            }
        }
    }

    /// Check the status and decode a JSON body.
    async fn parse<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response(status, &body));
        }
        response.json::<T>().await.map_err(ApiError::from)
    }

    /// Check the status of a response with no interesting body.
    async fn check(response: Response) -> ApiResult<()> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response(status, &body));
        }
        Ok(())
    }
}

/// Query pairs for a problem-list request. `q` is included only when the
/// search text is non-empty.
fn list_query(search: &str, page: u32, limit: u32) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(3);
    if !search.is_empty() {
        query.push(("q", search.to_string()));
    }
    query.push(("page", page.to_string()));
    query.push(("limit", limit.to_string()));
    query
}

/// Load saved cookies (one per line) into the jar.
fn load_cookies(jar: &Jar, base: &Url, path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if !line.is_empty() {
            jar.add_cookie_str(line, base);
        }
    }
}

#[async_trait]
impl RecallBackend for ApiClient {
    async fn me(&self) -> ApiResult<UserIdentity> {
        let response = self
            .http
            .get(self.url("/api/me"))
            .send()
            .await
            .map_err(ApiError::from)?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::NotAuthenticated);
        }
        Self::parse(response).await
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<()> {
        let response = self
            .http
            .post(self.url("/api/login"))
            .json(credentials)
            .send()
            .await
            .map_err(ApiError::from)?;
        let result = Self::check(response).await;
        if result.is_ok() {
            self.persist_cookies();
        }
        result
    }

    async fn signup(&self, details: &SignupDetails) -> ApiResult<()> {
        let response = self
            .http
            .post(self.url("/api/signup"))
            .json(details)
            .send()
            .await
            .map_err(ApiError::from)?;
        let result = Self::check(response).await;
        if result.is_ok() {
            self.persist_cookies();
        }
        result
    }

    async fn logout(&self) -> ApiResult<()> {
        let result = match self.http.post(self.url("/api/logout")).send().await {
            Ok(response) => Self::check(response).await,
            Err(e) => Err(ApiError::from(e)),
        };
        // The local credential is dropped no matter what the backend said;
        // a client that just logged out must not look authenticated.
        self.forget_session();
        result
    }

    async fn list_due(&self, page: u32, limit: u32) -> ApiResult<ProblemPage> {
        let response = self
            .http
            .get(self.url("/api/problems/due"))
            .query(&[("page", page.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(response).await
    }

    async fn list_all(&self, search: &str, page: u32, limit: u32) -> ApiResult<ProblemPage> {
        let response = self
            .http
            .get(self.url("/api/problems"))
            .query(&list_query(search, page, limit))
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(response).await
    }

    async fn create_problem(&self, draft: &ProblemDraft) -> ApiResult<Problem> {
        let response = self
            .http
            .post(self.url("/api/problems"))
            .json(draft)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(response).await
    }

    async fn get_problem(&self, id: i64) -> ApiResult<Problem> {
        let response = self
            .http
            .get(self.url(&format!("/api/problems/{}", id)))
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(response).await
    }

    async fn update_problem(&self, id: i64, patch: &ProblemPatch) -> ApiResult<Problem> {
        let response = self
            .http
            .patch(self.url(&format!("/api/problems/{}", id)))
            .json(patch)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(response).await
    }

    async fn review_problem(&self, id: i64, is_easy: bool) -> ApiResult<Problem> {
        let response = self
            .http
            .post(self.url(&format!("/api/problems/{}/review", id)))
            .json(&ReviewRequest { is_easy })
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(response).await
    }

    async fn activity(&self, months: u32) -> ApiResult<Vec<ActivityDay>> {
        let response = self
            .http
            .get(self.url("/api/activity/heatmap"))
            .query(&[("months", months.to_string())])
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(response).await
    }
}
