//! CDN configuration.

use serde::{Deserialize, Serialize};

/// Cloudinary account used for CDN hand-off. Absent means inline responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdnConfig {
    pub cloud_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// API root (default: `https://api.cloudinary.com`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Folder uploads are stored under.
    #[serde(default)]
    pub folder: Option<String>,
    /// Upload timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_base_url() -> String {
    "https://api.cloudinary.com".to_string()
}

fn default_timeout() -> u32 {
    30
}

impl CdnConfig {
    /// Signed upload endpoint for images.
    pub fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.base_url.trim_end_matches('/'),
            self.cloud_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_url() {
        let config: CdnConfig = toml::from_str(
            r#"
cloud_name = "demo"
base_url = "http://localhost:9999/"
"#,
        )
        .unwrap();
        assert_eq!(
            config.upload_url(),
            "http://localhost:9999/v1_1/demo/image/upload"
        );
    }
}
