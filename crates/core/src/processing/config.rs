//! Processing endpoint configuration.

use serde::{Deserialize, Serialize};

use crate::config::{default_image_types, default_max_file_size};

/// Limits and optimization settings of the processing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Upload size ceiling in bytes (default: 5 MiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Allow `max_file_size` up to 10 MiB.
    #[serde(default)]
    pub relaxed_limits: bool,

    /// Media types the endpoint accepts.
    #[serde(default = "default_image_types")]
    pub supported_types: Vec<String>,

    /// Images are scaled down to fit inside `max_width` x `max_height`.
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,

    #[serde(default = "default_max_dimension")]
    pub max_height: u32,

    /// JPEG quality, 1-100.
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// `Cache-Control: max-age` of successful responses (default: 7 days).
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_secs: u64,
}

fn default_max_dimension() -> u32 {
    1200
}

fn default_quality() -> u8 {
    80
}

fn default_cache_max_age() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            relaxed_limits: false,
            supported_types: default_image_types(),
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            quality: default_quality(),
            cache_max_age_secs: default_cache_max_age(),
        }
    }
}
