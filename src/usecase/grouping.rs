use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{PullRequest, RepositoryRef, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    #[default]
    Repository,
    Author,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Updated,
    Created,
}

impl SortKey {
    fn of(self, pr: &PullRequest) -> OffsetDateTime {
        match self {
            SortKey::Updated => pr.updated_at,
            SortKey::Created => pr.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryGroup {
    pub repository: RepositoryRef,
    pub pull_requests: Vec<PullRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorGroup {
    pub user: User,
    pub pull_requests: Vec<PullRequest>,
}

/// Most recent first. Equal timestamps keep their relative order.
pub fn sort_pull_requests(pull_requests: &mut [PullRequest], key: SortKey) {
    pull_requests.sort_by(|a, b| key.of(b).cmp(&key.of(a)));
}

pub fn sorted(pull_requests: &[PullRequest], key: SortKey) -> Vec<PullRequest> {
    let mut out = pull_requests.to_vec();
    sort_pull_requests(&mut out, key);
    out
}

/// Partition by repository id. Groups appear in order of first appearance; members are
/// collected in source order and then sorted by `key`.
pub fn group_by_repository(pull_requests: &[PullRequest], key: SortKey) -> Vec<RepositoryGroup> {
    let mut groups: Vec<RepositoryGroup> = Vec::new();
    for pr in pull_requests {
        match groups
            .iter_mut()
            .find(|g| g.repository.id == pr.repository.id)
        {
            Some(group) => group.pull_requests.push(pr.clone()),
            None => groups.push(RepositoryGroup {
                repository: pr.repository.clone(),
                pull_requests: vec![pr.clone()],
            }),
        }
    }
    for group in &mut groups {
        sort_pull_requests(&mut group.pull_requests, key);
    }
    groups
}

/// Partition by author login, with the same ordering rules as [`group_by_repository`].
pub fn group_by_author(pull_requests: &[PullRequest], key: SortKey) -> Vec<AuthorGroup> {
    let mut groups: Vec<AuthorGroup> = Vec::new();
    for pr in pull_requests {
        match groups.iter_mut().find(|g| g.user.login == pr.user.login) {
            Some(group) => group.pull_requests.push(pr.clone()),
            None => groups.push(AuthorGroup {
                user: pr.user.clone(),
                pull_requests: vec![pr.clone()],
            }),
        }
    }
    for group in &mut groups {
        sort_pull_requests(&mut group.pull_requests, key);
    }
    groups
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::domain::fixtures::{T0, pr, repo, user};

    fn sample() -> Vec<PullRequest> {
        let mut a = pr(1, T0);
        let mut b = pr(2, T0 + Duration::hours(2));
        let mut c = pr(3, T0 + Duration::hours(1));
        let mut d = pr(4, T0 + Duration::hours(3));
        let mut e = pr(5, T0 + Duration::hours(2));
        for p in [&mut b, &mut d] {
            p.repository = repo(2, "gadgets");
            p.user = user("bob");
        }
        c.user = user("bob");
        a.created_at = T0 + Duration::hours(9);
        e.created_at = T0 - Duration::hours(9);
        vec![a, b, c, d, e]
    }

    fn ids(prs: &[PullRequest]) -> Vec<u64> {
        prs.iter().map(|p| p.id).collect()
    }

    #[test]
    fn five_items_across_two_repositories() {
        let groups = group_by_repository(&sample(), SortKey::Updated);
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups.iter().map(|g| g.pull_requests.len()).sum::<usize>(),
            5
        );
        assert_eq!(groups[0].repository.name, "widgets");
        assert_eq!(ids(&groups[0].pull_requests), vec![5, 3, 1]);
        assert_eq!(groups[1].repository.name, "gadgets");
        assert_eq!(ids(&groups[1].pull_requests), vec![4, 2]);
    }

    #[test]
    fn ties_keep_source_order() {
        let mut prs = sample();
        prs[2].updated_at = prs[1].updated_at;
        // 2, 3 and 5 now share a timestamp
        assert_eq!(ids(&sorted(&prs, SortKey::Updated)), vec![4, 2, 3, 5, 1]);
    }

    #[test]
    fn created_sort_uses_creation_time() {
        assert_eq!(ids(&sorted(&sample(), SortKey::Created)), vec![1, 4, 2, 3, 5]);
    }

    #[test]
    fn authors_group_by_login() {
        let groups = group_by_author(&sample(), SortKey::Updated);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].user.login, "alice");
        assert_eq!(ids(&groups[0].pull_requests), vec![5, 1]);
        assert_eq!(ids(&groups[1].pull_requests), vec![4, 2, 3]);
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group_by_repository(&[], SortKey::Updated).is_empty());
        assert!(group_by_author(&[], SortKey::Created).is_empty());
    }
}
