//! Cloudinary signed uploads.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{CdnConfig, CdnError, CdnUploader};
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Signature of a set of upload parameters.
///
/// Parameters are sorted by name, joined as `k=v&k=v` and hashed together
/// with the API secret.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{:x}", Sha256::digest(format!("{}{}", joined, api_secret).as_bytes()))
}

/// Uploads images to Cloudinary.
pub struct CloudinaryUploader {
    client: Client,
    config: CdnConfig,
}

impl CloudinaryUploader {
    pub fn new(config: CdnConfig) -> Result<Self, CdnError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| CdnError::Request(format!("failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn send(&self, name: &str, bytes: Vec<u8>) -> Result<String, CdnError> {
        let mut params = vec![("timestamp", Utc::now().timestamp().to_string())];
        if let Some(folder) = &self.config.folder {
            params.push(("folder", folder.clone()));
        }
        let signature = sign_params(&params, &self.config.api_secret);

        let file = multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str("image/jpeg")
            .map_err(|e| CdnError::Request(e.to_string()))?;
        let mut form = multipart::Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(self.config.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| CdnError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CdnError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(CdnError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: UploadResponse =
            serde_json::from_str(&body).map_err(|e| CdnError::InvalidResponse(e.to_string()))?;
        parsed
            .secure_url
            .or(parsed.url)
            .ok_or_else(|| CdnError::InvalidResponse("response has no URL".to_string()))
    }
}

#[async_trait]
impl CdnUploader for CloudinaryUploader {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<String, CdnError> {
        let start = Instant::now();
        let size = bytes.len();
        let result = self.send(name, bytes).await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["cdn", "upload"])
            .observe(start.elapsed().as_secs_f64());
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[
                "cdn",
                "upload",
                if result.is_ok() { "success" } else { "error" },
            ])
            .inc();

        if let Ok(url) = &result {
            debug!("Uploaded {} ({} bytes) to {}", name, size, url);
        }
        result
    }
}
