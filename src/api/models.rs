//! Wire types for the DSA Recall backend.
//!
//! Problem payloads use the backend's Go-style PascalCase field names
//! (`Title`, `NextReviewDate`, ...) with `ID`/`UserID` spelled out; auth and
//! pagination payloads use lowercase/snake_case. Dates travel as RFC 3339
//! strings and are parsed on demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user, as returned by `GET /api/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Signup request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupDetails {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A tracked algorithm problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Problem {
    #[serde(rename = "ID")]
    pub id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
    #[serde(rename = "UserID")]
    pub user_id: i64,
    pub title: String,
    pub link: String,
    pub approach: String,
    pub code: String,
    pub language: String,
    pub current_streak: i64,
    pub next_review_date: String,
}

impl Problem {
    /// Parse the next review date, if the backend sent a valid timestamp.
    pub fn next_review_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.next_review_date)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Fields for creating a problem (`POST /api/problems`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProblemDraft {
    pub title: String,
    pub link: String,
    pub approach: String,
    pub code: String,
    pub language: String,
}

/// Partial update for a problem (`PATCH /api/problems/:id`). Unset fields are
/// omitted from the body so the backend leaves them untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProblemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approach: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ProblemPatch {
    /// True when no field is set; sending an empty PATCH is a no-op.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.link.is_none()
            && self.approach.is_none()
            && self.code.is_none()
            && self.language.is_none()
    }
}

/// Pagination metadata attached to every list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total_records: i64,
    pub current_page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// One page of problems, as returned by `GET /api/problems` and
/// `GET /api/problems/due`. Item order is the backend's and is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemPage {
    pub problems: Vec<Problem>,
    pub meta: PageMeta,
}

/// Review request body (`POST /api/problems/:id/review`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub is_easy: bool,
}

/// One day of review activity from `GET /api/activity/heatmap`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDay {
    pub date: String,
    pub count: i64,
}

/// Heatmap intensity on a 0-4 scale: one level per two reviews, capped.
pub fn activity_level(count: i64) -> u8 {
    if count <= 0 {
        0
    } else {
        ((count + 1) / 2).min(4) as u8
    }
}

impl ActivityDay {
    /// Heatmap intensity for this day.
    pub fn level(&self) -> u8 {
        activity_level(self.count)
    }

    /// Parse the day's date.
    pub fn date_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.date)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
