//! Mock CDN uploader for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::cdn::{CdnError, CdnUploader};

/// Records uploads and answers with `https://cdn.test/<name>`.
#[derive(Debug, Default)]
pub struct MockCdn {
    uploaded: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MockCdn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following upload fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Names of successful uploads, in order.
    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CdnUploader for MockCdn {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, name: &str, _bytes: Vec<u8>) -> Result<String, CdnError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CdnError::Rejected {
                status: 500,
                message: "mock CDN failure".to_string(),
            });
        }
        self.uploaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_string());
        Ok(format!("https://cdn.test/{}", name))
    }
}
