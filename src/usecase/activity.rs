use std::collections::BTreeSet;

use time::{Duration, OffsetDateTime};

use super::review::{aggregate_reviews, latest_review};
use crate::domain::{MarkerMap, PullRequest, PullRequestId, ReadMarker};

pub const DEFAULT_OWN_REVIEW_TOLERANCE: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Something happened since the last acknowledgement.
    New,
    /// Nothing new since the marker.
    Read,
    /// Would be new, but the latest event is the viewer's own review.
    OwnReview,
}

impl Activity {
    pub fn has_new_activity(self) -> bool {
        matches!(self, Activity::New)
    }
}

/// Decides whether a pull request carries activity the viewer has not seen.
#[derive(Debug, Clone)]
pub struct Classifier {
    viewer: Option<String>,
    tolerance: Duration,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(None, DEFAULT_OWN_REVIEW_TOLERANCE)
    }
}

impl Classifier {
    pub fn new(viewer: Option<String>, tolerance: std::time::Duration) -> Self {
        Self {
            viewer: normalize_viewer(viewer),
            tolerance: Duration::try_from(tolerance).unwrap_or(Duration::MAX),
        }
    }

    pub fn viewer(&self) -> Option<&str> {
        self.viewer.as_deref()
    }

    pub fn set_viewer(&mut self, viewer: Option<String>) {
        self.viewer = normalize_viewer(viewer);
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// True when the viewer wrote the most recent review and it landed within the
    /// tolerance window of `updated_at` (inclusive).
    ///
    /// The remote bumps `updated_at` and records the review in two separate writes, so
    /// the two timestamps rarely match exactly.
    pub fn is_own_latest_review(&self, pr: &PullRequest) -> bool {
        let Some(viewer) = self.viewer.as_deref() else {
            return false;
        };
        let Some(review) = latest_review(&pr.reviews) else {
            return false;
        };
        let Some(submitted_at) = review.submitted_at else {
            return false;
        };
        review.user.is(viewer) && (submitted_at - pr.updated_at).abs() <= self.tolerance
    }

    pub fn classify(&self, pr: &PullRequest, marker: Option<&ReadMarker>) -> Activity {
        self.evaluate(pr, marker, true)
    }

    /// Classify with own-review suppression optionally disabled.
    pub fn evaluate(
        &self,
        pr: &PullRequest,
        marker: Option<&ReadMarker>,
        allow_suppression: bool,
    ) -> Activity {
        let suppressed = || allow_suppression && self.is_own_latest_review(pr);
        match marker {
            None if suppressed() => Activity::OwnReview,
            None => Activity::New,
            Some(m) if pr.updated_at > m.last_read_at => {
                if suppressed() {
                    Activity::OwnReview
                } else {
                    Activity::New
                }
            }
            // Unseen comments are never hidden by the viewer's own review.
            Some(m) if pr.comments_count > m.comments_read_count => Activity::New,
            Some(_) => Activity::Read,
        }
    }
}

fn normalize_viewer(viewer: Option<String>) -> Option<String> {
    viewer
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Result of one classification pass.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedBatch {
    pub pull_requests: Vec<PullRequest>,
    /// Markers created for pull requests auto-read through own-review suppression.
    /// The caller must persist them.
    pub synthesized: MarkerMap,
}

/// Annotate every pull request with its review verdict and unread flag.
///
/// Pull requests listed in `exempt` are classified without own-review suppression.
pub fn classify_all(
    pull_requests: &[PullRequest],
    markers: &MarkerMap,
    classifier: &Classifier,
    exempt: &BTreeSet<PullRequestId>,
    now: OffsetDateTime,
) -> ClassifiedBatch {
    let mut batch = ClassifiedBatch::default();
    for raw in pull_requests {
        let mut pr = raw.clone();
        let summary = aggregate_reviews(&pr.reviews);
        pr.review_status = summary.verdict;
        pr.reviewers = summary.reviewers;

        let marker = markers.get(&pr.id);
        let activity = classifier.evaluate(&pr, marker, !exempt.contains(&pr.id));
        pr.has_new_activity = activity.has_new_activity();
        pr.last_read_at = marker.map(|m| m.last_read_at);

        if activity == Activity::OwnReview && marker.is_none() {
            let synthesized = ReadMarker::for_pull_request(&pr, now);
            pr.last_read_at = Some(synthesized.last_read_at);
            batch.synthesized.insert(pr.id, synthesized);
        }
        batch.pull_requests.push(pr);
    }
    batch
}
