//! Client-side state of user-submitted images.
//!
//! Each [`TrackedUpload`] moves through `pending -> processing -> {complete, error}`
//! and leaves the [`UploadStore`] only by removal.

mod store;
mod types;

pub use store::{PhaseCounts, StoreError, UpdateOutcome, UploadList, UploadStore};
pub use types::{
    media_essence, SourceFile, TrackedUpload, UploadId, UploadPhase, UploadStatus,
};
