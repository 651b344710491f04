//! Local preview handles for not-yet-uploaded images.
//!
//! A [`PreviewHandle`] resolves to the original bytes without any network
//! access. Each handle must be released exactly once, either when its upload
//! is removed or when the owning session is torn down.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::warn;

use crate::metrics::PREVIEWS_OUTSTANDING;
use crate::upload::SourceFile;

/// Revocable, locally resolvable reference to an upload's source bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    /// Mint a new, unregistered handle.
    pub fn new() -> Self {
        Self(format!("preview:{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PreviewHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Create/release counters of a registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PreviewStats {
    pub created: u64,
    pub released: u64,
    pub outstanding: usize,
}

/// Owns every live preview and accounts for their release.
#[derive(Default)]
pub struct PreviewRegistry {
    entries: Mutex<HashMap<PreviewHandle, SourceFile>>,
    created: AtomicU64,
    released: AtomicU64,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a preview for `source`.
    pub fn create(&self, source: &SourceFile) -> PreviewHandle {
        let handle = PreviewHandle::new();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.clone(), source.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        PREVIEWS_OUTSTANDING.inc();
        handle
    }

    /// Resolve a live handle to its source.
    pub fn resolve(&self, handle: &PreviewHandle) -> Option<SourceFile> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned()
    }

    /// Release a handle. Returns `false` if it was unknown or already released.
    pub fn release(&self, handle: &PreviewHandle) -> bool {
        let removed = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(handle)
            .is_some();

        if removed {
            self.released.fetch_add(1, Ordering::SeqCst);
            PREVIEWS_OUTSTANDING.dec();
        } else {
            warn!("Preview {} released twice or never created", handle);
        }
        removed
    }

    pub fn outstanding(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn stats(&self) -> PreviewStats {
        PreviewStats {
            created: self.created.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
            outstanding: self.outstanding(),
        }
    }
}
