use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

pub type PullRequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub id: Option<u64>,
    pub avatar_url: String,
    pub html_url: String,
}

impl User {
    /// Logins are case-insensitive on the remote side.
    pub fn is(&self, login: &str) -> bool {
        self.login.eq_ignore_ascii_case(login)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
}

/// Raw review state as reported by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

impl ReviewState {
    /// The verdict this review contributes, if it counts towards one at all.
    pub fn verdict(self) -> Option<ReviewVerdict> {
        match self {
            ReviewState::Approved => Some(ReviewVerdict::Approved),
            ReviewState::ChangesRequested => Some(ReviewVerdict::ChangesRequested),
            ReviewState::Commented => Some(ReviewVerdict::Commented),
            ReviewState::Dismissed | ReviewState::Pending => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown review state {0:?}")]
pub struct UnknownReviewState(pub String);

impl FromStr for ReviewState {
    type Err = UnknownReviewState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(ReviewState::Approved),
            "CHANGES_REQUESTED" => Ok(ReviewState::ChangesRequested),
            "COMMENTED" => Ok(ReviewState::Commented),
            "DISMISSED" => Ok(ReviewState::Dismissed),
            "PENDING" => Ok(ReviewState::Pending),
            other => Err(UnknownReviewState(other.to_string())),
        }
    }
}

/// Aggregate review outcome for one pull request.
///
/// Precedence when reducing several reviewers is
/// `ChangesRequested > Approved > Commented > None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewVerdict {
    #[default]
    None,
    Approved,
    ChangesRequested,
    Commented,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    pub user: User,
    pub state: ReviewState,
    /// Pending reviews have not been submitted yet and carry no timestamp.
    #[serde(with = "time::serde::rfc3339::option")]
    pub submitted_at: Option<OffsetDateTime>,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: PullRequestId,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub state: PrState,
    pub draft: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub closed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub merged_at: Option<OffsetDateTime>,
    pub user: User,
    pub repository: RepositoryRef,
    pub labels: Vec<Label>,
    pub comments_count: u64,
    pub reviews: Vec<Review>,

    // Derived on every classification pass; never ground truth.
    #[serde(default)]
    pub has_new_activity: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_read_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub review_status: ReviewVerdict,
    #[serde(default)]
    pub reviewers: BTreeMap<String, ReviewVerdict>,
}

impl PullRequest {
    /// Short reference in the form `owner/repo#123`.
    pub fn short_ref(&self) -> String {
        format!("{}#{}", self.repository.full_name, self.number)
    }
}
