pub mod cdn;
pub mod config;
pub mod gateway;
pub mod metrics;
pub mod orchestrator;
pub mod preview;
pub mod processing;
pub mod stats;
pub mod testing;
pub mod upload;

pub use cdn::{CdnConfig, CdnError, CdnUploader, CloudinaryUploader};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use gateway::{Gateway, GatewayConfig, GatewayError, HttpGateway, ProcessedImage, RejectionCode};
pub use orchestrator::{
    BatchHandle, BatchOverflowPolicy, OrchestratorConfig, OrchestratorStatus,
    TransferOrchestrator, ValidationError,
};
pub use preview::{PreviewHandle, PreviewRegistry};
pub use processing::{ImageOptimizer, ImageService, ProcessingConfig, Rejection, ValidationPolicy};
pub use stats::{ProcessingStats, StatsSnapshot};
pub use upload::{SourceFile, TrackedUpload, UploadId, UploadPhase, UploadStatus, UploadStore};
