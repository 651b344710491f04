//! Wire types of the image processing endpoint.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::GatewayError;

/// MIME type of inline optimized images.
pub const OPTIMIZED_MEDIA_TYPE: &str = "image/jpeg";

/// Pixel dimensions of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Decoder-reported properties of the source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    /// Container format (`jpeg`, `png`, `webp`, `gif`).
    pub format: String,
    /// Colour space (`srgb` or `b-w`).
    pub space: String,
    pub has_alpha: bool,
    pub channels: u8,
}

/// Successful response of the processing endpoint.
///
/// Carries either an inline base64 data URL (`processedImage`) or a link to
/// CDN-hosted content (`optimizedUrl`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImage {
    pub original_name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_image: Option<String>,
    #[serde(default, alias = "cdnUrl", skip_serializing_if = "Option::is_none")]
    pub optimized_url: Option<String>,
}

impl ProcessedImage {
    /// Build a response that inlines `optimized` as a JPEG data URL.
    pub fn inline(
        original_name: impl Into<String>,
        media_type: impl Into<String>,
        original_size: u64,
        optimized: impl AsRef<[u8]>,
    ) -> Self {
        let optimized = optimized.as_ref();
        let optimized_size = optimized.len() as u64;
        let compression_ratio = if optimized_size > 0 {
            Some(original_size as f64 / optimized_size as f64)
        } else {
            None
        };

        Self {
            original_name: original_name.into(),
            size: optimized_size,
            media_type: media_type.into(),
            dimensions: None,
            metadata: None,
            optimized_size: Some(optimized_size),
            compression_ratio,
            processed_image: Some(format!(
                "data:{};base64,{}",
                OPTIMIZED_MEDIA_TYPE,
                STANDARD.encode(optimized)
            )),
            optimized_url: None,
        }
    }

    /// Point at CDN-hosted content instead of the inline image.
    pub fn with_optimized_url(mut self, url: impl Into<String>) -> Self {
        self.optimized_url = Some(url.into());
        self.processed_image = None;
        self
    }

    /// Whether the response carries any way to obtain the optimized image.
    pub fn has_payload(&self) -> bool {
        self.processed_image.is_some() || self.optimized_url.is_some()
    }

    /// Where to fetch the optimized image from, CDN first.
    pub fn download_url(&self) -> Option<&str> {
        self.optimized_url
            .as_deref()
            .or(self.processed_image.as_deref())
    }

    /// Suggested file name for saving the optimized image.
    pub fn download_name(&self) -> String {
        format!("compressed-{}", self.original_name)
    }

    /// Decode the inline data URL, if present.
    pub fn inline_bytes(&self) -> Option<Result<Vec<u8>, GatewayError>> {
        self.processed_image.as_deref().map(decode_data_url)
    }
}

fn decode_data_url(url: &str) -> Result<Vec<u8>, GatewayError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| GatewayError::MalformedResponse("inline image is not a data URL".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| GatewayError::MalformedResponse("data URL has no payload".into()))?;
    if !header.ends_with(";base64") {
        return Err(GatewayError::MalformedResponse(
            "data URL is not base64 encoded".into(),
        ));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| GatewayError::MalformedResponse(format!("invalid base64 payload: {}", e)))
}

/// Machine-readable reason attached to a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionCode {
    NoFile,
    InvalidType,
    FileTooLarge,
    ProcessingFailed,
    /// A code this client does not know about, kept verbatim.
    Unknown(String),
}

impl RejectionCode {
    pub fn as_str(&self) -> &str {
        match self {
            RejectionCode::NoFile => "NO_FILE",
            RejectionCode::InvalidType => "INVALID_TYPE",
            RejectionCode::FileTooLarge => "FILE_TOO_LARGE",
            RejectionCode::ProcessingFailed => "PROCESSING_FAILED",
            RejectionCode::Unknown(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "NO_FILE" => RejectionCode::NoFile,
            "INVALID_TYPE" => RejectionCode::InvalidType,
            "FILE_TOO_LARGE" => RejectionCode::FileTooLarge,
            "PROCESSING_FAILED" => RejectionCode::ProcessingFailed,
            other => RejectionCode::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RejectionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RejectionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}

/// Error body of the processing endpoint (HTTP 4xx/5xx).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<RejectionCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_size: Option<u64>,
}

impl GatewayErrorBody {
    pub fn new(code: RejectionCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: Some(code),
            ..Default::default()
        }
    }

    /// Human-readable message, preferring `error` over `message`.
    pub fn display_message(&self) -> Option<&str> {
        if !self.error.is_empty() {
            Some(&self.error)
        } else {
            self.message.as_deref().filter(|m| !m.is_empty())
        }
    }
}
