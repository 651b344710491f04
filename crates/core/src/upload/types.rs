//! Core upload data types.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gateway::ProcessedImage;
use crate::preview::PreviewHandle;

/// Opaque identifier of a tracked upload. Assigned once, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(String);

impl UploadId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Original file content as submitted by the user.
///
/// The bytes are shared and never mutated, so cloning is cheap.
#[derive(Clone)]
pub struct SourceFile {
    name: String,
    media_type: String,
    bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared media type, as given by the caller.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Media type lowercased and stripped of parameters (`image/PNG; q=1` -> `image/png`).
    pub fn media_essence(&self) -> String {
        media_essence(&self.media_type)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Normalize a media type for set membership checks.
pub fn media_essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Lifecycle status of an upload, carrying the payload of terminal states.
#[derive(Debug, Clone)]
pub enum UploadStatus {
    /// Accepted, waiting for its turn.
    Pending,
    /// The gateway call is outstanding.
    Processing,
    /// The gateway returned an optimized image.
    Complete(Arc<ProcessedImage>),
    /// The transfer failed; holds a human-readable message.
    Error(String),
}

impl UploadStatus {
    pub fn phase(&self) -> UploadPhase {
        match self {
            UploadStatus::Pending => UploadPhase::Pending,
            UploadStatus::Processing => UploadPhase::Processing,
            UploadStatus::Complete(_) => UploadPhase::Complete,
            UploadStatus::Error(_) => UploadPhase::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Result of a completed upload.
    pub fn result(&self) -> Option<&ProcessedImage> {
        match self {
            UploadStatus::Complete(result) => Some(result),
            _ => None,
        }
    }

    /// Message of a failed upload.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            UploadStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Whether `next` is a legal successor: pending -> processing -> {complete, error}.
    pub fn can_transition_to(&self, next: &UploadStatus) -> bool {
        matches!(
            (self.phase(), next.phase()),
            (UploadPhase::Pending, UploadPhase::Processing)
                | (UploadPhase::Processing, UploadPhase::Complete)
                | (UploadPhase::Processing, UploadPhase::Error)
        )
    }
}

/// Payload-free discriminant of [`UploadStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Pending,
    Processing,
    Complete,
    Error,
}

impl UploadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPhase::Pending => "pending",
            UploadPhase::Processing => "processing",
            UploadPhase::Complete => "complete",
            UploadPhase::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadPhase::Complete | UploadPhase::Error)
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user-submitted image under management.
#[derive(Debug, Clone)]
pub struct TrackedUpload {
    pub id: UploadId,
    pub source: SourceFile,
    pub preview: PreviewHandle,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
}

impl TrackedUpload {
    /// Create a pending upload.
    pub fn pending(source: SourceFile, preview: PreviewHandle) -> Self {
        Self {
            id: UploadId::new(),
            source,
            preview,
            status: UploadStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// A copy of this upload with a different status.
    pub fn with_status(&self, status: UploadStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed() -> Arc<ProcessedImage> {
        Arc::new(ProcessedImage::inline("a.png", "image/png", 10, vec![1, 2, 3]))
    }

    #[test]
    fn test_upload_ids_are_unique() {
        let a = UploadId::new();
        let b = UploadId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_media_essence() {
        assert_eq!(media_essence("image/PNG"), "image/png");
        assert_eq!(media_essence(" image/jpeg ; charset=x"), "image/jpeg");
        assert_eq!(media_essence(""), "");
    }

    #[test]
    fn test_source_file_debug_hides_bytes() {
        let file = SourceFile::new("cat.png", "image/png", vec![0u8; 2048]);
        let debug = format!("{:?}", file);
        assert!(debug.contains("size: 2048"));
        assert_eq!(file.size(), 2048);
    }

    #[test]
    fn test_legal_transitions() {
        let pending = UploadStatus::Pending;
        let processing = UploadStatus::Processing;
        let complete = UploadStatus::Complete(processed());
        let error = UploadStatus::Error("boom".to_string());

        assert!(pending.can_transition_to(&processing));
        assert!(processing.can_transition_to(&complete));
        assert!(processing.can_transition_to(&error));
    }

    #[test]
    fn test_illegal_transitions() {
        let pending = UploadStatus::Pending;
        let complete = UploadStatus::Complete(processed());
        let error = UploadStatus::Error("boom".to_string());

        // No skipping processing
        assert!(!pending.can_transition_to(&complete));
        assert!(!pending.can_transition_to(&error));
        // Terminal states are final
        assert!(!complete.can_transition_to(&UploadStatus::Processing));
        assert!(!error.can_transition_to(&UploadStatus::Pending));
        assert!(!complete.can_transition_to(&error));
    }

    #[test]
    fn test_payload_accessors_match_status() {
        let complete = UploadStatus::Complete(processed());
        assert!(complete.result().is_some());
        assert!(complete.error_message().is_none());

        let error = UploadStatus::Error("File too large".to_string());
        assert!(error.result().is_none());
        assert_eq!(error.error_message(), Some("File too large"));

        assert!(UploadStatus::Pending.result().is_none());
        assert!(UploadStatus::Pending.error_message().is_none());
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&UploadPhase::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        assert_eq!(UploadPhase::Complete.to_string(), "complete");
    }
}
