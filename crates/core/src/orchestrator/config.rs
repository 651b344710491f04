//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::config::{default_image_types, default_max_file_size};

/// What to do with a batch larger than `max_batch_size`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOverflowPolicy {
    /// Reject the whole batch; nothing is tracked.
    #[default]
    Reject,
    /// Accept the first `max_batch_size` files and drop the rest.
    Truncate,
}

/// Configuration for the transfer orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of files per batch.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Per-file size ceiling in bytes.
    /// Limited to 5 MiB, or 10 MiB with `relaxed_limits`.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Allow `max_file_size` up to 10 MiB.
    #[serde(default)]
    pub relaxed_limits: bool,

    /// Accepted media types. `image/*` style wildcards are allowed.
    #[serde(default = "default_image_types")]
    pub accepted_types: Vec<String>,

    /// Behaviour for batches over `max_batch_size`.
    #[serde(default)]
    pub batch_overflow: BatchOverflowPolicy,

    /// Gateway calls allowed in flight at once.
    /// With 1, items are sent strictly one after another.
    #[serde(default = "default_max_concurrent_transfers")]
    pub max_concurrent_transfers: usize,
}

fn default_max_batch_size() -> usize {
    5
}

fn default_max_concurrent_transfers() -> usize {
    1
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_file_size: default_max_file_size(),
            relaxed_limits: false,
            accepted_types: default_image_types(),
            batch_overflow: BatchOverflowPolicy::default(),
            max_concurrent_transfers: default_max_concurrent_transfers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIB;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_batch_size, 5);
        assert_eq!(config.max_file_size, 5 * MIB);
        assert!(!config.relaxed_limits);
        assert_eq!(config.batch_overflow, BatchOverflowPolicy::Reject);
        assert_eq!(config.max_concurrent_transfers, 1);
        assert_eq!(
            config.accepted_types,
            vec!["image/jpeg", "image/png", "image/webp", "image/gif"]
        );
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: OrchestratorConfig = toml::from_str("max_batch_size = 2").unwrap();
        assert_eq!(config.max_batch_size, 2);
        assert_eq!(config.max_concurrent_transfers, 1);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            max_batch_size = 10
            max_file_size = 10485760
            relaxed_limits = true
            accepted_types = ["image/*"]
            batch_overflow = "truncate"
            max_concurrent_transfers = 2
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.max_file_size, 10 * MIB);
        assert!(config.relaxed_limits);
        assert_eq!(config.accepted_types, vec!["image/*"]);
        assert_eq!(config.batch_overflow, BatchOverflowPolicy::Truncate);
        assert_eq!(config.max_concurrent_transfers, 2);
    }
}
