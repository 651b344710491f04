//! Types for the transfer orchestrator.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::preview::PreviewStats;
use crate::upload::{PhaseCounts, StoreError, UploadId, UploadPhase};

/// Called on every phase an upload enters, including `pending`.
pub type UploadUpdateCallback = Arc<dyn Fn(&UploadId, UploadPhase) + Send + Sync>;

/// Reasons a batch is refused before anything is tracked.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("batch of {count} files exceeds the limit of {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("{name} is {size} bytes, over the {max} byte limit")]
    FileTooLarge { name: String, size: u64, max: u64 },

    #[error("{name} has unsupported type {media_type}")]
    UnsupportedType { name: String, media_type: String },

    #[error("{name} is empty")]
    EmptyFile { name: String },
}

impl ValidationError {
    /// Short machine-readable reason, used as a metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::BatchTooLarge { .. } => "batch_too_large",
            ValidationError::FileTooLarge { .. } => "file_too_large",
            ValidationError::UnsupportedType { .. } => "unsupported_type",
            ValidationError::EmptyFile { .. } => "empty_file",
        }
    }
}

/// Errors raised while driving a transfer.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("upload store error: {0}")]
    Store(#[from] StoreError),

    #[error("transfer queue closed")]
    QueueClosed,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestratorStatus {
    /// Whether the dispatcher is running.
    pub running: bool,
    /// Items waiting for a transfer slot.
    pub queued: usize,
    /// Gateway calls currently outstanding.
    pub in_flight: usize,
    /// Batches with at least one item not yet finished.
    pub active_batches: usize,
    pub uploads: PhaseCounts,
    pub previews: PreviewStats,
}
