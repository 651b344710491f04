//! CDN hand-off of optimized images.
//!
//! When configured, the processing endpoint stores its output on the CDN and
//! answers with `optimizedUrl` instead of an inline data URL.

mod cloudinary;
mod config;

pub use cloudinary::{sign_params, CloudinaryUploader};
pub use config::CdnConfig;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdnError {
    #[error("CDN request failed: {0}")]
    Request(String),

    #[error("CDN rejected upload (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid CDN response: {0}")]
    InvalidResponse(String),
}

/// Stores optimized images and returns their public URL.
#[async_trait]
pub trait CdnUploader: Send + Sync {
    /// Uploader name, for logs and metrics.
    fn name(&self) -> &str;

    /// Upload `bytes` stored as `name`; returns the public HTTPS URL.
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<String, CdnError>;
}
