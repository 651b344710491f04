//! Server-side admission of uploaded images.
//!
//! Whatever a client checked before sending, these rules decide.

use crate::gateway::{GatewayErrorBody, RejectionCode};
use crate::upload::media_essence;

use super::ProcessingConfig;

/// A refused request: HTTP status plus the JSON error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub body: GatewayErrorBody,
}

impl Rejection {
    pub fn code(&self) -> RejectionCode {
        self.body
            .code
            .clone()
            .unwrap_or_else(|| RejectionCode::Unknown("UNKNOWN".to_string()))
    }
}

/// Type and size rules of the processing endpoint.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    max_file_size: u64,
    supported_types: Vec<String>,
}

impl ValidationPolicy {
    pub fn new(max_file_size: u64, supported_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            supported_types: supported_types.iter().map(|t| media_essence(t)).collect(),
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.max_file_size, config.supported_types.clone())
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn supported_types(&self) -> &[String] {
        &self.supported_types
    }

    /// No `image` field, or a body that is not multipart at all.
    pub fn no_file(&self) -> Rejection {
        Rejection {
            status: 400,
            body: GatewayErrorBody::new(RejectionCode::NoFile, "No image file provided"),
        }
    }

    /// Body over the size ceiling. `actual_size` is known only when the
    /// upload was read completely.
    pub fn too_large(&self, actual_size: Option<u64>) -> Rejection {
        Rejection {
            status: 413,
            body: GatewayErrorBody {
                max_size: Some(self.max_file_size),
                actual_size,
                ..GatewayErrorBody::new(RejectionCode::FileTooLarge, "File too large")
            },
        }
    }

    /// Check a received file.
    pub fn check(&self, media_type: &str, size: u64) -> Result<(), Rejection> {
        if size == 0 {
            return Err(Rejection {
                status: 400,
                body: GatewayErrorBody::new(RejectionCode::NoFile, "Image file is empty"),
            });
        }

        let essence = media_essence(media_type);
        if !self.supported_types.contains(&essence) {
            return Err(Rejection {
                status: 400,
                body: GatewayErrorBody {
                    supported_types: Some(self.supported_types.clone()),
                    ..GatewayErrorBody::new(
                        RejectionCode::InvalidType,
                        format!("Unsupported image type: {}", media_type),
                    )
                },
            });
        }

        if size > self.max_file_size {
            return Err(self.too_large(Some(size)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ValidationPolicy {
        ValidationPolicy::from_config(&ProcessingConfig::default())
    }

    #[test]
    fn test_accepts_supported_image() {
        assert!(policy().check("image/png", 1024).is_ok());
        assert!(policy().check("IMAGE/JPEG", 1024).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let rejection = policy().check("application/pdf", 10).unwrap_err();
        assert_eq!(rejection.status, 400);
        assert_eq!(rejection.code(), RejectionCode::InvalidType);
        assert_eq!(rejection.body.supported_types.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn test_rejects_oversized_file() {
        let policy = ValidationPolicy::new(100, vec!["image/png".to_string()]);
        assert!(policy.check("image/png", 100).is_ok());

        let rejection = policy.check("image/png", 101).unwrap_err();
        assert_eq!(rejection.status, 413);
        assert_eq!(rejection.code(), RejectionCode::FileTooLarge);
        assert_eq!(rejection.body.error, "File too large");
        assert_eq!(rejection.body.max_size, Some(100));
        assert_eq!(rejection.body.actual_size, Some(101));
    }

    #[test]
    fn test_empty_file_is_no_file() {
        let rejection = policy().check("image/png", 0).unwrap_err();
        assert_eq!(rejection.code(), RejectionCode::NoFile);
    }

    #[test]
    fn test_no_file_body() {
        let rejection = policy().no_file();
        let json = serde_json::to_value(&rejection.body).unwrap();
        assert_eq!(json["error"], "No image file provided");
        assert_eq!(json["code"], "NO_FILE");
    }
}
