//! Trait definitions for the gateway module.

use async_trait::async_trait;

use super::error::GatewayError;
use super::types::ProcessedImage;
use crate::upload::SourceFile;

/// Remote service that optimizes one image per call.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Returns the name of this gateway implementation.
    fn name(&self) -> &str;

    /// Submit the source bytes and wait for the optimized result.
    async fn process(&self, file: &SourceFile) -> Result<ProcessedImage, GatewayError>;
}
