//! Decode, downscale and re-encode images as JPEG.

use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, GenericImageView, ImageError, ImageFormat};
use tracing::debug;

use crate::gateway::{Dimensions, ImageMetadata, ProcessedImage};
use crate::metrics::OPTIMIZATION_DURATION;

use super::{ProcessingConfig, ProcessingError};

/// Result of one optimization.
#[derive(Debug, Clone)]
pub struct OptimizedImage {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    /// Dimensions of the source image.
    pub dimensions: Dimensions,
    pub metadata: ImageMetadata,
}

impl OptimizedImage {
    /// Response carrying the result inline as a data URL.
    pub fn into_response(
        self,
        original_name: &str,
        media_type: &str,
        original_size: u64,
    ) -> ProcessedImage {
        let mut response =
            ProcessedImage::inline(original_name, media_type, original_size, &self.bytes);
        response.dimensions = Some(self.dimensions);
        response.metadata = Some(self.metadata);
        response
    }
}

/// Fits images inside a bounding box and encodes them at a fixed quality.
#[derive(Debug, Clone, Copy)]
pub struct ImageOptimizer {
    max_width: u32,
    max_height: u32,
    quality: u8,
}

impl ImageOptimizer {
    pub fn new(max_width: u32, max_height: u32, quality: u8) -> Self {
        Self {
            max_width,
            max_height,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.max_width, config.max_height, config.quality)
    }

    /// Optimize an encoded image. Never enlarges.
    ///
    /// CPU bound; async callers should run it on a blocking thread.
    pub fn optimize(&self, data: &[u8]) -> Result<OptimizedImage, ProcessingError> {
        let start = Instant::now();
        let format = image::guess_format(data).map_err(|_| ProcessingError::UnknownFormat)?;
        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;

        let (width, height) = img.dimensions();
        let color = img.color();
        let metadata = ImageMetadata {
            format: format_name(format),
            space: color_space(color).to_string(),
            has_alpha: color.has_alpha(),
            channels: color.channel_count(),
        };

        let img = if width > self.max_width || height > self.max_height {
            img.resize(self.max_width, self.max_height, FilterType::Lanczos3)
        } else {
            img
        };

        let rgb = img.to_rgb8();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode_image(&rgb)
            .map_err(|e: ImageError| ProcessingError::Encode(e.to_string()))?;

        OPTIMIZATION_DURATION.observe(start.elapsed().as_secs_f64());
        debug!(
            "Optimized {}x{} {} into {}x{} JPEG ({} -> {} bytes)",
            width,
            height,
            metadata.format,
            rgb.width(),
            rgb.height(),
            data.len(),
            bytes.len()
        );

        Ok(OptimizedImage {
            bytes,
            dimensions: Dimensions { width, height },
            metadata,
        })
    }
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        other => format!("{:?}", other).to_ascii_lowercase(),
    }
}

fn color_space(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => "b-w",
        _ => "srgb",
    }
}
