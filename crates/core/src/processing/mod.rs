//! Server side of the processing endpoint.
//!
//! [`ValidationPolicy`] decides what is accepted, [`ImageOptimizer`] turns
//! the upload into a bounded JPEG, and [`ImageService`] wires both to the
//! optional CDN and the process counters.

mod config;
mod error;
mod optimizer;
mod policy;
mod service;

pub use config::ProcessingConfig;
pub use error::ProcessingError;
pub use optimizer::{ImageOptimizer, OptimizedImage};
pub use policy::{Rejection, ValidationPolicy};
pub use service::ImageService;
