//! Gateway client configuration.

use serde::{Deserialize, Serialize};

/// Where and how to reach the image processing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Full URL of the processing endpoint.
    #[serde(default = "default_url")]
    pub url: String,
    /// Request timeout in seconds (default: 30). A timeout fails the upload.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_url() -> String {
    "http://127.0.0.1:8080/api/process-image".to_string()
}

fn default_timeout() -> u32 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout(),
        }
    }
}
