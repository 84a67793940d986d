use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::pull_request::{PullRequest, PullRequestId};

/// Record of when, and at what comment count, a pull request was last acknowledged.
///
/// A missing marker means the pull request was never explicitly read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMarker {
    #[serde(with = "time::serde::rfc3339")]
    pub last_read_at: OffsetDateTime,
    pub comments_read_count: u64,
}

impl ReadMarker {
    pub fn new(last_read_at: OffsetDateTime, comments_read_count: u64) -> Self {
        Self {
            last_read_at,
            comments_read_count,
        }
    }

    /// Marker acknowledging `pr` as it currently is.
    pub fn for_pull_request(pr: &PullRequest, now: OffsetDateTime) -> Self {
        Self::new(now, pr.comments_count)
    }
}

pub type MarkerMap = BTreeMap<PullRequestId, ReadMarker>;
