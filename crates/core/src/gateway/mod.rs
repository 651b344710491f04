//! Contract with the remote image processing service.
//!
//! The orchestrator only sees the [`Gateway`] trait: one source file in, a
//! [`ProcessedImage`] or a [`GatewayError`] out. [`HttpGateway`] speaks the
//! multipart/JSON protocol of `POST /api/process-image`.

mod config;
mod error;
mod http;
mod traits;
mod types;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::{decode_response, HttpGateway, IMAGE_FIELD};
pub use traits::Gateway;
pub use types::{
    Dimensions, GatewayErrorBody, ImageMetadata, ProcessedImage, RejectionCode,
    OPTIMIZED_MEDIA_TYPE,
};
