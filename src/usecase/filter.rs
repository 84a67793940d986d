use std::collections::BTreeSet;

use crate::domain::{PullRequest, ReviewVerdict, User};
use crate::repo::settings::ViewPreferences;

use super::grouping::{AuthorGroup, RepositoryGroup};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    /// Author logins to keep; `None` keeps everyone.
    pub users: Option<BTreeSet<String>>,
    pub unread_only: bool,
    pub show_drafts: bool,
    pub hide_approved: bool,
}

impl Filters {
    pub fn from_preferences(prefs: &ViewPreferences, users: Option<BTreeSet<String>>) -> Self {
        Self {
            users,
            unread_only: prefs.show_unread_only,
            show_drafts: prefs.show_drafts,
            hide_approved: prefs.hide_approved,
        }
    }

    pub fn author_allowed(&self, login: &str) -> bool {
        self.users.as_ref().is_none_or(|u| u.contains(login))
    }

    pub fn matches(&self, pr: &PullRequest) -> bool {
        self.author_allowed(&pr.user.login)
            && (!self.unread_only || pr.has_new_activity)
            && (self.show_drafts || !pr.draft)
            && (!self.hide_approved || pr.review_status != ReviewVerdict::Approved)
    }

    pub fn apply(&self, pull_requests: &[PullRequest]) -> Vec<PullRequest> {
        pull_requests
            .iter()
            .filter(|pr| self.matches(pr))
            .cloned()
            .collect()
    }

    /// Drops non-matching members, then groups left empty.
    pub fn apply_to_repository_groups(&self, groups: Vec<RepositoryGroup>) -> Vec<RepositoryGroup> {
        groups
            .into_iter()
            .map(|mut g| {
                g.pull_requests.retain(|pr| self.matches(pr));
                g
            })
            .filter(|g| !g.pull_requests.is_empty())
            .collect()
    }

    pub fn apply_to_author_groups(&self, groups: Vec<AuthorGroup>) -> Vec<AuthorGroup> {
        groups
            .into_iter()
            .filter(|g| self.author_allowed(&g.user.login))
            .map(|mut g| {
                g.pull_requests.retain(|pr| self.matches(pr));
                g
            })
            .filter(|g| !g.pull_requests.is_empty())
            .collect()
    }
}

pub fn unread_count(pull_requests: &[PullRequest]) -> usize {
    pull_requests.iter().filter(|pr| pr.has_new_activity).count()
}

/// Authors in order of first appearance.
pub fn distinct_authors(pull_requests: &[PullRequest]) -> Vec<User> {
    let mut seen = BTreeSet::new();
    pull_requests
        .iter()
        .filter(|pr| seen.insert(pr.user.login.clone()))
        .map(|pr| pr.user.clone())
        .collect()
}
