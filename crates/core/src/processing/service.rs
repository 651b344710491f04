//! The processing endpoint's work: validate, optimize, optionally hand off to a CDN.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::cdn::CdnUploader;
use crate::gateway::{GatewayErrorBody, ProcessedImage, RejectionCode};
use crate::metrics::{BYTES_IN, BYTES_OUT, IMAGES_PROCESSED, IMAGE_REJECTIONS};
use crate::stats::ProcessingStats;
use crate::upload::SourceFile;

use super::{ImageOptimizer, ProcessingConfig, ProcessingError, Rejection, ValidationPolicy};

/// Serves one image per call; shared across requests.
pub struct ImageService {
    policy: ValidationPolicy,
    optimizer: ImageOptimizer,
    cdn: Option<Arc<dyn CdnUploader>>,
    stats: Arc<ProcessingStats>,
    cache_max_age_secs: u64,
}

impl ImageService {
    pub fn new(config: &ProcessingConfig, stats: Arc<ProcessingStats>) -> Self {
        Self {
            policy: ValidationPolicy::from_config(config),
            optimizer: ImageOptimizer::from_config(config),
            cdn: None,
            stats,
            cache_max_age_secs: config.cache_max_age_secs,
        }
    }

    /// Store results on a CDN and answer with its URL.
    pub fn with_cdn(mut self, cdn: Arc<dyn CdnUploader>) -> Self {
        self.cdn = Some(cdn);
        self
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.stats
    }

    pub fn cache_max_age_secs(&self) -> u64 {
        self.cache_max_age_secs
    }

    /// Count a request refused before a file could be read.
    pub fn reject(&self, rejection: Rejection) -> Rejection {
        self.stats.record_request();
        self.record_rejection(&rejection);
        rejection
    }

    /// Validate and optimize one uploaded file.
    pub async fn process(&self, file: SourceFile) -> Result<ProcessedImage, Rejection> {
        self.stats.record_request();

        if let Err(rejection) = self.policy.check(file.media_type(), file.size()) {
            self.record_rejection(&rejection);
            return Err(rejection);
        }
        BYTES_IN.inc_by(file.size());

        let optimizer = self.optimizer;
        let source = file.clone();
        let optimized = tokio::task::spawn_blocking(move || optimizer.optimize(source.bytes()))
            .await
            .map_err(|e| ProcessingError::Task(e.to_string()))
            .and_then(|result| result);

        let optimized = match optimized {
            Ok(optimized) => optimized,
            Err(e) => {
                error!("Error processing image {}: {}", file.name(), e);
                self.stats.record_failed();
                IMAGES_PROCESSED.with_label_values(&["failed"]).inc();
                return Err(Rejection {
                    status: 500,
                    body: GatewayErrorBody::new(
                        RejectionCode::ProcessingFailed,
                        "Failed to process image",
                    ),
                });
            }
        };

        let optimized_size = optimized.bytes.len() as u64;
        let cdn_bytes = self.cdn.as_ref().map(|_| optimized.bytes.clone());
        let mut response = optimized.into_response(file.name(), file.media_type(), file.size());

        if let (Some(cdn), Some(bytes)) = (&self.cdn, cdn_bytes) {
            match cdn.upload(file.name(), bytes).await {
                Ok(url) => response = response.with_optimized_url(url),
                Err(e) => warn!(
                    "{} upload of {} failed, answering inline: {}",
                    cdn.name(),
                    file.name(),
                    e
                ),
            }
        }

        self.stats.record_processed(file.size(), optimized_size);
        BYTES_OUT.inc_by(optimized_size);
        IMAGES_PROCESSED.with_label_values(&["success"]).inc();
        info!(
            "Processed {} ({} -> {} bytes)",
            file.name(),
            file.size(),
            optimized_size
        );
        Ok(response)
    }

    fn record_rejection(&self, rejection: &Rejection) {
        self.stats.record_rejected();
        IMAGES_PROCESSED.with_label_values(&["rejected"]).inc();
        IMAGE_REJECTIONS
            .with_label_values(&[rejection.code().as_str()])
            .inc();
        info!("Rejected upload: {}", rejection.body.error);
    }
}
