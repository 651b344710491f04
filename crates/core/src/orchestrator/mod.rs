//! Transfer orchestration.
//!
//! Accepts batches of images, tracks each as an upload and sends them to the
//! [`Gateway`](crate::gateway::Gateway) in submission order.

mod admission;
mod config;
mod runner;
mod types;

pub use admission::{admit_batch, check_file, Admission};
pub use config::{BatchOverflowPolicy, OrchestratorConfig};
pub use runner::{BatchHandle, TransferOrchestrator};
pub use types::{OrchestratorError, OrchestratorStatus, UploadUpdateCallback, ValidationError};
