use std::sync::Arc;

use squeeze_core::{
    CdnError, CloudinaryUploader, Config, ImageService, ProcessingStats, SanitizedConfig,
};

/// Multipart framing allowed on top of the largest accepted file.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
pub struct AppState {
    config: Config,
    images: ImageService,
    region: Option<String>,
}

impl AppState {
    pub fn new(config: Config, images: ImageService) -> Self {
        Self {
            config,
            images,
            region: None,
        }
    }

    /// Build the image service described by `config`, with a CDN when one is configured.
    pub fn from_config(config: Config) -> Result<Self, CdnError> {
        let stats = Arc::new(ProcessingStats::new());
        let mut images = ImageService::new(&config.processing, stats);
        if let Some(cdn) = &config.cdn {
            images = images.with_cdn(Arc::new(CloudinaryUploader::new(cdn.clone())?));
        }
        Ok(Self::new(config, images))
    }

    /// Deployment region reported by the health endpoint.
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn images(&self) -> &ImageService {
        &self.images
    }

    pub fn stats(&self) -> &ProcessingStats {
        self.images.stats()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Largest request body accepted before the multipart reader gives up.
    pub fn body_limit(&self) -> usize {
        self.images.policy().max_file_size() as usize + MULTIPART_OVERHEAD
    }
}
