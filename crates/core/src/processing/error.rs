use thiserror::Error;

/// Failures of the decode/resize/encode pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("unrecognized image format")]
    UnknownFormat,

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("image processing task failed: {0}")]
    Task(String),
}
