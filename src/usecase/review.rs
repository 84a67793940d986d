use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::domain::{Review, ReviewVerdict};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub verdict: ReviewVerdict,
    /// Latest qualifying verdict per reviewer login. Never contains `ReviewVerdict::None`.
    pub reviewers: BTreeMap<String, ReviewVerdict>,
}

/// Reduce a pull request's review history to one verdict plus a per-reviewer map.
///
/// Only the latest review per reviewer counts, with logins compared case-insensitively;
/// the map key uses the casing of that latest review. Equal timestamps keep the review seen
/// first in `reviews`; reviews with no timestamp rank below any timestamped one.
pub fn aggregate_reviews(reviews: &[Review]) -> ReviewSummary {
    let mut latest: Vec<&Review> = Vec::new();
    for review in reviews {
        match latest
            .iter_mut()
            .find(|kept| kept.user.is(&review.user.login))
        {
            Some(kept) => {
                if is_newer(review.submitted_at, kept.submitted_at) {
                    *kept = review;
                }
            }
            None => latest.push(review),
        }
    }

    let reviewers: BTreeMap<String, ReviewVerdict> = latest
        .iter()
        .filter_map(|r| r.state.verdict().map(|v| (r.user.login.clone(), v)))
        .collect();

    let verdict = [
        ReviewVerdict::ChangesRequested,
        ReviewVerdict::Approved,
        ReviewVerdict::Commented,
    ]
    .into_iter()
    .find(|class| reviewers.values().any(|v| v == class))
    .unwrap_or(ReviewVerdict::None);

    ReviewSummary { verdict, reviewers }
}

/// Most recent review on the pull request, by submission time.
pub fn latest_review(reviews: &[Review]) -> Option<&Review> {
    let mut best: Option<&Review> = None;
    for review in reviews.iter().filter(|r| r.submitted_at.is_some()) {
        match best {
            Some(b) if !is_newer(review.submitted_at, b.submitted_at) => {}
            _ => best = Some(review),
        }
    }
    best
}

fn is_newer(candidate: Option<OffsetDateTime>, kept: Option<OffsetDateTime>) -> bool {
    match (candidate, kept) {
        (Some(c), Some(k)) => c > k,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::domain::ReviewState;
    use crate::domain::fixtures::{T0, review};

    #[test]
    fn empty_history_has_no_verdict() {
        let summary = aggregate_reviews(&[]);
        assert_eq!(summary.verdict, ReviewVerdict::None);
        assert!(summary.reviewers.is_empty());
    }

    #[test]
    fn changes_requested_outranks_a_later_approval() {
        let reviews = vec![
            review(1, "A", ReviewState::Commented, T0 + Duration::seconds(1)),
            review(2, "A", ReviewState::Approved, T0 + Duration::seconds(2)),
            review(3, "B", ReviewState::ChangesRequested, T0 + Duration::seconds(1)),
        ];
        let summary = aggregate_reviews(&reviews);
        assert_eq!(summary.verdict, ReviewVerdict::ChangesRequested);
        assert_eq!(summary.reviewers.len(), 2);
        assert_eq!(summary.reviewers["A"], ReviewVerdict::Approved);
        assert_eq!(summary.reviewers["B"], ReviewVerdict::ChangesRequested);
    }

    #[test]
    fn input_order_does_not_matter_for_distinct_timestamps() {
        let mut reviews = vec![
            review(2, "A", ReviewState::Approved, T0 + Duration::seconds(2)),
            review(1, "A", ReviewState::ChangesRequested, T0 + Duration::seconds(1)),
            review(3, "B", ReviewState::Commented, T0),
        ];
        let forward = aggregate_reviews(&reviews);
        reviews.reverse();
        assert_eq!(aggregate_reviews(&reviews), forward);
        assert_eq!(forward.verdict, ReviewVerdict::Approved);
    }

    #[test]
    fn dismissed_latest_review_removes_the_reviewer() {
        let reviews = vec![
            review(1, "A", ReviewState::Approved, T0),
            review(2, "A", ReviewState::Dismissed, T0 + Duration::seconds(5)),
        ];
        let summary = aggregate_reviews(&reviews);
        assert_eq!(summary.verdict, ReviewVerdict::None);
        assert!(summary.reviewers.is_empty());
    }

    #[test]
    fn pending_review_without_timestamp_is_ignored() {
        let mut pending = review(2, "A", ReviewState::Pending, T0);
        pending.submitted_at = None;
        let reviews = vec![pending, review(1, "A", ReviewState::Commented, T0)];
        let summary = aggregate_reviews(&reviews);
        assert_eq!(summary.verdict, ReviewVerdict::Commented);
    }

    #[test]
    fn equal_timestamps_keep_the_first_review() {
        let reviews = vec![
            review(1, "A", ReviewState::Commented, T0),
            review(2, "A", ReviewState::Approved, T0),
        ];
        let summary = aggregate_reviews(&reviews);
        assert_eq!(summary.reviewers["A"], ReviewVerdict::Commented);
        assert_eq!(summary.verdict, ReviewVerdict::Commented);
    }

    #[test]
    fn reviewer_logins_match_regardless_of_case() {
        let reviews = vec![
            review(1, "alice", ReviewState::Approved, T0),
            review(2, "Alice", ReviewState::Commented, T0 + Duration::seconds(5)),
        ];
        let summary = aggregate_reviews(&reviews);
        assert_eq!(summary.reviewers.len(), 1);
        assert_eq!(summary.reviewers["Alice"], ReviewVerdict::Commented);
        assert_eq!(summary.verdict, ReviewVerdict::Commented);
    }

    #[test]
    fn latest_review_picks_greatest_timestamp() {
        let reviews = vec![
            review(1, "A", ReviewState::Approved, T0 + Duration::seconds(9)),
            review(2, "B", ReviewState::Commented, T0 + Duration::seconds(3)),
        ];
        assert_eq!(latest_review(&reviews).map(|r| r.id), Some(1));
        assert!(latest_review(&[]).is_none());
    }
}
