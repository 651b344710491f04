//! Copy-on-write store of tracked uploads.
//!
//! Every mutation publishes a brand new collection through a `watch`
//! channel. Existing entries are never mutated in place, so an observer can
//! tell whether anything changed by comparing snapshot pointers.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use super::types::{TrackedUpload, UploadId, UploadPhase, UploadStatus};

/// Immutable snapshot of the tracked uploads, in insertion order.
pub type UploadList = Arc<Vec<TrackedUpload>>;

/// Errors returned by store mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The requested status does not follow from the current one.
    #[error("invalid transition for upload {id}: {from} -> {to}")]
    InvalidTransition {
        id: UploadId,
        from: UploadPhase,
        to: UploadPhase,
    },
}

/// What a status update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The collection was replaced with the updated entry.
    Applied,
    /// The id is no longer tracked; nothing changed.
    Stale,
}

/// Per-phase counts of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PhaseCounts {
    pub pending: usize,
    pub processing: usize,
    pub complete: usize,
    pub error: usize,
}

/// Mapping from [`UploadId`] to [`TrackedUpload`] with whole-collection replacement.
pub struct UploadStore {
    tx: watch::Sender<UploadList>,
}

impl Default for UploadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(Vec::new()));
        Self { tx }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> UploadList {
        Arc::clone(&self.tx.borrow())
    }

    /// Receiver notified whenever the collection is replaced.
    pub fn subscribe(&self) -> watch::Receiver<UploadList> {
        self.tx.subscribe()
    }

    pub fn get(&self, id: &UploadId) -> Option<TrackedUpload> {
        self.tx.borrow().iter().find(|u| &u.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    pub fn count_by_phase(&self) -> PhaseCounts {
        let mut counts = PhaseCounts::default();
        for upload in self.tx.borrow().iter() {
            match upload.status.phase() {
                UploadPhase::Pending => counts.pending += 1,
                UploadPhase::Processing => counts.processing += 1,
                UploadPhase::Complete => counts.complete += 1,
                UploadPhase::Error => counts.error += 1,
            }
        }
        counts
    }

    /// Append uploads, preserving their order.
    pub fn add(&self, items: Vec<TrackedUpload>) {
        if items.is_empty() {
            return;
        }
        self.tx.send_modify(|list| {
            let mut next = Vec::with_capacity(list.len() + items.len());
            next.extend(list.iter().cloned());
            next.extend(items);
            *list = Arc::new(next);
        });
    }

    /// Replace the status of an upload.
    ///
    /// Unknown ids are a silent no-op: the upload may have been removed while
    /// its gateway call was in flight.
    pub fn update_status(
        &self,
        id: &UploadId,
        status: UploadStatus,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut outcome = Ok(UpdateOutcome::Stale);

        self.tx.send_if_modified(|list| {
            let Some(index) = list.iter().position(|u| &u.id == id) else {
                return false;
            };

            let current = &list[index];
            if !current.status.can_transition_to(&status) {
                outcome = Err(StoreError::InvalidTransition {
                    id: id.clone(),
                    from: current.status.phase(),
                    to: status.phase(),
                });
                return false;
            }

            let mut next: Vec<TrackedUpload> = (**list).clone();
            next[index] = current.with_status(status);
            *list = Arc::new(next);
            outcome = Ok(UpdateOutcome::Applied);
            true
        });

        if let Ok(UpdateOutcome::Stale) = outcome {
            debug!("Ignoring status update for untracked upload {}", id);
        }
        outcome
    }

    /// Remove an upload, returning it if it was tracked.
    pub fn remove(&self, id: &UploadId) -> Option<TrackedUpload> {
        let mut removed = None;
        self.tx.send_if_modified(|list| {
            let Some(index) = list.iter().position(|u| &u.id == id) else {
                return false;
            };
            let mut next: Vec<TrackedUpload> = (**list).clone();
            removed = Some(next.remove(index));
            *list = Arc::new(next);
            true
        });
        removed
    }

    /// Remove every upload, returning them in insertion order.
    pub fn clear(&self) -> Vec<TrackedUpload> {
        let mut drained = Vec::new();
        self.tx.send_if_modified(|list| {
            if list.is_empty() {
                return false;
            }
            drained = (**list).clone();
            *list = Arc::new(Vec::new());
            true
        });
        drained
    }
}
