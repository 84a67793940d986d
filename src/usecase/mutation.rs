use std::collections::BTreeSet;

use time::OffsetDateTime;
use tracing::{debug, info};

use super::activity::{Classifier, classify_all};
use crate::domain::{MarkerMap, PullRequest, PullRequestId, ReadMarker};
use crate::repo::BlobStore;
use crate::repo::markers::ReadMarkerStore;

pub type Clock = fn() -> OffsetDateTime;

/// Marker mapping as it was immediately before a mutation.
pub type MarkerSnapshot = MarkerMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct UndoState {
    markers: MarkerMap,
    exempt: BTreeSet<PullRequestId>,
}

/// Owns the read-marker mapping and applies read/unread transitions to it.
///
/// Every mutating call persists the whole mapping in one write and remembers the
/// previous mapping for a single level of undo. Callers reclassify afterwards.
pub struct MutationEngine<B: BlobStore> {
    store: ReadMarkerStore<B>,
    markers: MarkerMap,
    classifier: Classifier,
    /// Toggled to unread in this session; own-review suppression would otherwise
    /// re-synthesize the marker that was just deleted.
    exempt: BTreeSet<PullRequestId>,
    undo: Option<UndoState>,
    now: Clock,
}

impl<B: BlobStore> MutationEngine<B> {
    pub fn new(store: ReadMarkerStore<B>, classifier: Classifier) -> Self {
        let markers = store.load();
        Self {
            store,
            markers,
            classifier,
            exempt: BTreeSet::new(),
            undo: None,
            now: OffsetDateTime::now_utc,
        }
    }

    pub fn with_clock(mut self, now: Clock) -> Self {
        self.now = now;
        self
    }

    pub fn markers(&self) -> &MarkerMap {
        &self.markers
    }

    pub fn store(&self) -> &ReadMarkerStore<B> {
        &self.store
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn set_viewer(&mut self, viewer: Option<String>) {
        self.classifier.set_viewer(viewer);
    }

    pub fn can_undo(&self) -> bool {
        self.undo.is_some()
    }

    /// Annotate `pull_requests` with verdicts and unread flags.
    ///
    /// Markers synthesized for the viewer's own reviews are persisted before returning.
    pub fn classify(&mut self, pull_requests: &[PullRequest]) -> Vec<PullRequest> {
        let batch = classify_all(
            pull_requests,
            &self.markers,
            &self.classifier,
            &self.exempt,
            (self.now)(),
        );
        if !batch.synthesized.is_empty() {
            debug!(
                "Auto-marking {} pull requests read after own review",
                batch.synthesized.len()
            );
            self.markers.extend(batch.synthesized);
            self.store.save(&self.markers);
        }
        batch.pull_requests
    }

    pub fn is_read(&self, pr: &PullRequest) -> bool {
        let marker = self.markers.get(&pr.id);
        !self
            .classifier
            .evaluate(pr, marker, !self.exempt.contains(&pr.id))
            .has_new_activity()
    }

    pub fn mark_read(&mut self, pr: &PullRequest, comments_count_at_read: u64) -> MarkerSnapshot {
        let previous = self.remember();
        let marker = ReadMarker::new((self.now)(), comments_count_at_read);
        self.markers.insert(pr.id, marker);
        self.exempt.remove(&pr.id);
        self.store.save(&self.markers);
        previous
    }

    /// Flip the pull request between read and unread, judged by its current state
    /// rather than a possibly stale flag on `pr`.
    pub fn toggle(&mut self, pr: &PullRequest) -> MarkerSnapshot {
        let previous = self.remember();
        if self.is_read(pr) {
            self.markers.remove(&pr.id);
            self.exempt.insert(pr.id);
            info!("Marked {} as unread", pr.short_ref());
        } else {
            let marker = ReadMarker::for_pull_request(pr, (self.now)());
            self.markers.insert(pr.id, marker);
            self.exempt.remove(&pr.id);
            info!("Marked {} as read", pr.short_ref());
        }
        self.store.save(&self.markers);
        previous
    }

    /// Mark every given pull request read with one store write.
    pub fn mark_all_read(&mut self, pull_requests: &[PullRequest]) -> MarkerSnapshot {
        let previous = self.remember();
        let now = (self.now)();
        for pr in pull_requests {
            self.markers
                .insert(pr.id, ReadMarker::for_pull_request(pr, now));
            self.exempt.remove(&pr.id);
        }
        self.store.save(&self.markers);
        info!("Marked {} pull requests as read", pull_requests.len());
        previous
    }

    /// Restore the mapping from before the last mutation. Returns false when there is
    /// nothing to undo or the mapping already matches the snapshot.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo.as_ref() else {
            return false;
        };
        if snapshot.markers == self.markers && snapshot.exempt == self.exempt {
            return false;
        }
        self.markers = snapshot.markers.clone();
        self.exempt = snapshot.exempt.clone();
        self.store.save(&self.markers);
        info!("Restored {} read markers", self.markers.len());
        true
    }

    fn remember(&mut self) -> MarkerSnapshot {
        self.undo = Some(UndoState {
            markers: self.markers.clone(),
            exempt: self.exempt.clone(),
        });
        self.markers.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::Duration;

    use super::*;
    use crate::domain::ReviewState;
    use crate::domain::fixtures::{T0, pr, review};
    use crate::repo::memory::MemoryBlobStore;
    use crate::usecase::activity::DEFAULT_OWN_REVIEW_TOLERANCE;

    const KEY: &str = "markers";

    fn later() -> OffsetDateTime {
        T0 + Duration::hours(1)
    }

    fn engine(viewer: Option<&str>) -> (Arc<MemoryBlobStore>, MutationEngine<Arc<MemoryBlobStore>>) {
        let blobs = Arc::new(MemoryBlobStore::default());
        let store = ReadMarkerStore::new(blobs.clone(), KEY);
        let classifier = Classifier::new(viewer.map(str::to_string), DEFAULT_OWN_REVIEW_TOLERANCE);
        (blobs, MutationEngine::new(store, classifier).with_clock(later))
    }

    fn unread(prs: &[PullRequest]) -> Vec<bool> {
        prs.iter().map(|p| p.has_new_activity).collect()
    }

    #[test]
    fn mark_read_then_reclassify_is_stable() {
        let (_, mut engine) = engine(None);
        let item = pr(1, T0);
        assert_eq!(unread(&engine.classify(&[item.clone()])), vec![true]);

        engine.mark_read(&item, item.comments_count);
        assert_eq!(unread(&engine.classify(&[item.clone()])), vec![false]);
        assert_eq!(unread(&engine.classify(&[item])), vec![false]);
    }

    #[test]
    fn mark_read_snapshot_count_is_respected() {
        let (_, mut engine) = engine(None);
        let mut item = pr(1, T0);
        item.comments_count = 5;
        engine.mark_read(&item, 3);
        assert_eq!(unread(&engine.classify(&[item])), vec![true]);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let (_, mut engine) = engine(None);
        let item = pr(1, T0);

        engine.toggle(&item);
        assert!(engine.is_read(&item));
        engine.toggle(&item);
        assert!(!engine.is_read(&item));
        assert!(engine.markers().is_empty());

        engine.mark_read(&item, 0);
        engine.toggle(&item);
        engine.toggle(&item);
        assert!(engine.is_read(&item));
    }

    #[test]
    fn toggle_to_unread_beats_own_review_suppression() {
        let (_, mut engine) = engine(Some("me"));
        let mut item = pr(1, T0);
        item.reviews = vec![review(9, "me", ReviewState::Approved, T0)];

        assert_eq!(unread(&engine.classify(&[item.clone()])), vec![false]);
        assert!(engine.markers().contains_key(&1));

        engine.toggle(&item);
        assert_eq!(unread(&engine.classify(&[item.clone()])), vec![true]);
        assert!(!engine.markers().contains_key(&1));

        engine.toggle(&item);
        assert_eq!(unread(&engine.classify(&[item])), vec![false]);
    }

    #[test]
    fn undo_restores_previous_mapping_once() {
        let (blobs, mut engine) = engine(None);
        let a = pr(1, T0);
        let b = pr(2, T0);
        engine.mark_read(&a, 0);
        let before = engine.markers().clone();

        let snapshot = engine.toggle(&b);
        assert_eq!(snapshot, before);
        assert_ne!(engine.markers(), &before);

        assert!(engine.undo());
        assert_eq!(engine.markers(), &before);
        let writes = blobs.write_count();

        assert!(!engine.undo());
        assert_eq!(engine.markers(), &before);
        assert_eq!(blobs.write_count(), writes);
    }

    #[test]
    fn undo_without_history_does_nothing() {
        let (blobs, mut engine) = engine(None);
        assert!(!engine.can_undo());
        assert!(!engine.undo());
        assert_eq!(blobs.write_count(), 0);
    }

    #[test]
    fn mark_all_read_is_one_write() {
        let (blobs, mut engine) = engine(None);
        let prs: Vec<PullRequest> = (1..=4)
            .map(|id| {
                let mut p = pr(id, T0);
                p.comments_count = id;
                p
            })
            .collect();

        engine.mark_all_read(&prs);

        assert_eq!(blobs.write_count(), 1);
        assert_eq!(unread(&engine.classify(&prs)), vec![false; 4]);
        assert_eq!(engine.markers()[&3].comments_read_count, 3);
    }

    #[test]
    fn undo_reverts_a_whole_mark_all_read() {
        let (blobs, mut engine) = engine(None);
        let prs: Vec<PullRequest> = (1..=4).map(|id| pr(id, T0)).collect();
        engine.mark_read(&prs[0], 0);
        engine.mark_read(&prs[1], 0);
        let before = engine.markers().clone();
        let writes = blobs.write_count();

        let snapshot = engine.mark_all_read(&prs);
        assert_eq!(snapshot, before);
        assert_eq!(blobs.write_count(), writes + 1);
        assert_eq!(engine.markers().len(), 4);

        assert!(engine.undo());
        assert_eq!(engine.markers(), &before);
        assert_eq!(blobs.write_count(), writes + 2);
        assert_eq!(ReadMarkerStore::new(blobs, KEY).load(), before);
    }

    #[test]
    fn markers_survive_a_restart() {
        let (blobs, mut engine) = engine(None);
        engine.mark_read(&pr(1, T0), 2);
        drop(engine);

        let store = ReadMarkerStore::new(blobs, KEY);
        let reopened = MutationEngine::new(store, Classifier::default());
        assert_eq!(reopened.markers()[&1], ReadMarker::new(later(), 2));
    }

    #[test]
    fn failed_save_keeps_in_memory_state() {
        let (blobs, mut engine) = engine(None);
        blobs.set_fail_writes(true);
        let item = pr(1, T0);
        engine.mark_read(&item, 0);
        assert!(engine.is_read(&item));
        assert_eq!(blobs.write_count(), 0);
    }
}
