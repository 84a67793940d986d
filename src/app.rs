use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::config::InboxConfig;
use crate::domain::{PullRequest, PullRequestId, User};
use crate::error::{RefreshError, Result};
use crate::repo::BlobStore;
use crate::repo::markers::ReadMarkerStore;
use crate::repo::settings::{JsonBlob, Settings, ViewPreferences};
use crate::repo::source::PullRequestSource;
use crate::usecase::activity::Classifier;
use crate::usecase::filter::{Filters, distinct_authors, unread_count};
use crate::usecase::grouping::{
    AuthorGroup, RepositoryGroup, group_by_author, group_by_repository, sorted,
};
use crate::usecase::mutation::{Clock, MutationEngine};

/// Identifies one fetch. Later tickets supersede earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { total: usize, unread: usize },
    /// A newer fetch already landed; this result was dropped.
    Superseded,
}

/// Client-side pull request inbox: the last fetched snapshot, classified against the
/// local read markers, plus the viewer's filters.
pub struct Inbox<B: BlobStore> {
    settings_blob: JsonBlob<B>,
    view_blob: JsonBlob<B>,
    engine: MutationEngine<B>,
    pub settings: Settings,
    pub view: ViewPreferences,
    /// Authors the viewer narrowed the list to; `None` shows everyone.
    pub user_filter: Option<BTreeSet<String>>,
    raw: Vec<PullRequest>,
    classified: Vec<PullRequest>,
    next_ticket: u64,
    applied_ticket: Option<FetchTicket>,
    in_flight: usize,
    pub last_error: Option<String>,
    pub notice: Option<String>,
}

impl<B: BlobStore + Clone> Inbox<B> {
    pub fn open(blobs: B, config: &InboxConfig) -> Self {
        let settings_blob = JsonBlob::new(blobs.clone(), config.settings_key());
        let view_blob = JsonBlob::new(blobs.clone(), config.view_key());
        let settings: Settings = settings_blob.load_or_default();
        let view: ViewPreferences = view_blob.load_or_default();
        let classifier = Classifier::new(settings.viewer.clone(), config.own_review_tolerance);
        let engine = MutationEngine::new(
            ReadMarkerStore::new(blobs, config.read_status_key()),
            classifier,
        );
        Self {
            settings_blob,
            view_blob,
            engine,
            settings,
            view,
            user_filter: None,
            raw: Vec::new(),
            classified: Vec::new(),
            next_ticket: 0,
            applied_ticket: None,
            in_flight: 0,
            last_error: None,
            notice: None,
        }
    }
}

impl<B: BlobStore> Inbox<B> {
    pub fn with_clock(mut self, now: Clock) -> Self {
        self.engine = self.engine.with_clock(now);
        self
    }

    pub fn engine(&self) -> &MutationEngine<B> {
        &self.engine
    }

    pub fn update_settings(&mut self, settings: Settings) {
        self.engine.set_viewer(settings.viewer.clone());
        self.settings_blob.save(&settings);
        self.settings = settings;
        self.reclassify();
    }

    pub fn update_view(&mut self, view: ViewPreferences) {
        self.view_blob.save(&view);
        self.view = view;
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn begin_refresh(&mut self) -> FetchTicket {
        self.next_ticket += 1;
        self.in_flight += 1;
        FetchTicket(self.next_ticket)
    }

    /// Apply a completed fetch. The previous collection stays in place on failure, and
    /// results older than the last applied one are dropped.
    pub fn finish_refresh(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<Vec<PullRequest>>,
    ) -> Result<RefreshOutcome> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.applied_ticket.is_some_and(|applied| applied > ticket) {
            info!("Dropping fetch {:?}, superseded by {:?}", ticket, self.applied_ticket);
            return Ok(RefreshOutcome::Superseded);
        }
        match result {
            Ok(pull_requests) => {
                self.applied_ticket = Some(ticket);
                self.raw = pull_requests;
                self.last_error = None;
                self.reclassify();
                let unread = unread_count(&self.classified);
                if self.raw.is_empty() {
                    self.set_notice("No pull requests found");
                }
                Ok(RefreshOutcome::Applied {
                    total: self.raw.len(),
                    unread,
                })
            }
            Err(e) => {
                warn!("Fetch failed, keeping {} cached pull requests: {e:#}", self.raw.len());
                self.last_error = Some(format!("{e:#}"));
                Err(RefreshError::Source(e))
            }
        }
    }

    pub async fn refresh<S: PullRequestSource>(&mut self, source: &S) -> Result<RefreshOutcome> {
        if !self.settings.is_complete() {
            return Err(RefreshError::NotConfigured);
        }
        let ticket = self.begin_refresh();
        let result = source.fetch(&self.settings).await;
        self.finish_refresh(ticket, result)
    }

    pub fn reclassify(&mut self) {
        self.classified = self.engine.classify(&self.raw);
    }

    fn find(&self, id: PullRequestId) -> Option<&PullRequest> {
        self.classified.iter().find(|pr| pr.id == id)
    }

    /// Flip read state. Returns the new unread flag, or `None` for an unknown id.
    pub fn toggle_read(&mut self, id: PullRequestId) -> Option<bool> {
        let pr = self.find(id)?.clone();
        self.engine.toggle(&pr);
        self.reclassify();
        let unread = self.find(id).is_some_and(|p| p.has_new_activity);
        let state = if unread { "unread" } else { "read" };
        self.set_notice(&format!("\"{}\" is now marked as {state}", pr.title));
        Some(unread)
    }

    pub fn mark_read(&mut self, id: PullRequestId) -> bool {
        let Some(pr) = self.find(id).cloned() else {
            return false;
        };
        self.engine.mark_read(&pr, pr.comments_count);
        self.reclassify();
        self.set_notice(&format!("\"{}\" is now marked as read", pr.title));
        true
    }

    /// Mark everything currently passing the filters as read.
    pub fn mark_all_read(&mut self) -> usize {
        let targets = self.filtered();
        self.engine.mark_all_read(&targets);
        self.reclassify();
        self.set_notice(&format!("Marked {} pull requests as read", targets.len()));
        targets.len()
    }

    pub fn undo(&mut self) -> bool {
        let restored = self.engine.undo();
        if restored {
            self.reclassify();
            self.set_notice("Previous read status has been restored");
        }
        restored
    }

    pub fn filters(&self) -> Filters {
        Filters::from_preferences(&self.view, self.user_filter.clone())
    }

    /// Every classified pull request in the chosen sort order, unfiltered.
    pub fn pull_requests(&self) -> Vec<PullRequest> {
        sorted(&self.classified, self.view.sorting)
    }

    pub fn filtered(&self) -> Vec<PullRequest> {
        self.filters().apply(&self.pull_requests())
    }

    pub fn repository_groups(&self) -> Vec<RepositoryGroup> {
        let groups = group_by_repository(&self.pull_requests(), self.view.sorting);
        self.filters().apply_to_repository_groups(groups)
    }

    pub fn author_groups(&self) -> Vec<AuthorGroup> {
        let groups = group_by_author(&self.pull_requests(), self.view.sorting);
        self.filters().apply_to_author_groups(groups)
    }

    pub fn unread_count(&self) -> usize {
        unread_count(&self.filtered())
    }

    pub fn distinct_authors(&self) -> Vec<User> {
        distinct_authors(&self.classified)
    }

    pub fn set_notice(&mut self, msg: &str) {
        self.notice = Some(msg.to_string());
    }
}
