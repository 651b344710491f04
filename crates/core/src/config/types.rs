use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::cdn::CdnConfig;
use crate::gateway::GatewayConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::processing::ProcessingConfig;

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Default per-file size ceiling.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * MIB;

/// Per-file size ceiling allowed when `relaxed_limits` is enabled.
pub const RELAXED_MAX_FILE_SIZE: u64 = 10 * MIB;

/// Image media types accepted unless configured otherwise.
pub const DEFAULT_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

pub(crate) fn default_image_types() -> Vec<String> {
    DEFAULT_IMAGE_TYPES.iter().map(|t| t.to_string()).collect()
}

pub(crate) fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

/// Largest file size a section may configure given its relaxed flag.
pub fn file_size_ceiling(relaxed_limits: bool) -> u64 {
    if relaxed_limits {
        RELAXED_MAX_FILE_SIZE
    } else {
        DEFAULT_MAX_FILE_SIZE
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub cdn: Option<CdnConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub orchestrator: OrchestratorConfig,
    pub gateway: GatewayConfig,
    pub processing: ProcessingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdn: Option<SanitizedCdnConfig>,
}

/// Sanitized CDN config (API key and secret hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCdnConfig {
    pub cloud_name: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub api_key_configured: bool,
    pub api_secret_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            orchestrator: config.orchestrator.clone(),
            gateway: config.gateway.clone(),
            processing: config.processing.clone(),
            cdn: config.cdn.as_ref().map(|c| SanitizedCdnConfig {
                cloud_name: c.cloud_name.clone(),
                base_url: c.base_url.clone(),
                folder: c.folder.clone(),
                api_key_configured: !c.api_key.is_empty(),
                api_secret_configured: !c.api_secret.is_empty(),
                timeout_secs: c.timeout_secs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.orchestrator.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.processing.supported_types.len(), 4);
        assert_eq!(config.gateway.timeout_secs, 30);
    }

    #[test]
    fn test_deserialize_server_section() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_with_cdn_config() {
        let toml = r#"
[cdn]
cloud_name = "demo"
api_key = "key-123"
api_secret = "secret-456"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let cdn = config.cdn.as_ref().unwrap();
        assert_eq!(cdn.cloud_name, "demo");
        assert_eq!(cdn.base_url, "https://api.cloudinary.com");
        assert_eq!(cdn.timeout_secs, 30);
        assert!(cdn.folder.is_none());
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let toml = r#"
[cdn]
cloud_name = "demo"
api_key = "key-123"
api_secret = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        let cdn = sanitized.cdn.as_ref().unwrap();
        assert!(cdn.api_key_configured);
        assert!(!cdn.api_secret_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("key-123"));
    }

    #[test]
    fn test_sanitized_config_without_cdn() {
        let sanitized = SanitizedConfig::from(&Config::default());
        assert!(sanitized.cdn.is_none());
        assert_eq!(sanitized.server.port, 8080);
        let json = serde_json::to_value(&sanitized).unwrap();
        assert!(json.get("cdn").is_none());
    }

    #[test]
    fn test_file_size_ceiling() {
        assert_eq!(file_size_ceiling(false), 5 * MIB);
        assert_eq!(file_size_ceiling(true), 10 * MIB);
    }
}
