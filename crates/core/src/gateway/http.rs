//! HTTP gateway client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, multipart, Client};
use tracing::debug;

use super::{Gateway, GatewayConfig, GatewayError, GatewayErrorBody, ProcessedImage};
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};
use crate::upload::SourceFile;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Message used when a failed response carries no readable error.
const FALLBACK_FAILURE: &str = "Failed to process image";

/// Gateway reached over HTTP with a multipart POST.
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Create a new HTTP gateway client.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| GatewayError::InvalidRequest(format!("failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Fetch the optimized bytes of a result, from the CDN or the inline data URL.
    pub async fn fetch_optimized(&self, image: &ProcessedImage) -> Result<Vec<u8>, GatewayError> {
        if let Some(url) = image.optimized_url.as_deref() {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(GatewayError::from_reqwest)?;
            let status = response.status();
            if !status.is_success() {
                return Err(GatewayError::Rejected {
                    status: status.as_u16(),
                    message: format!("CDN returned HTTP {}", status),
                    code: None,
                });
            }
            let bytes = response.bytes().await.map_err(GatewayError::from_reqwest)?;
            return Ok(bytes.to_vec());
        }

        image.inline_bytes().unwrap_or_else(|| {
            Err(GatewayError::MalformedResponse(
                "result has no optimized image".to_string(),
            ))
        })
    }

    async fn send(&self, file: &SourceFile) -> Result<ProcessedImage, GatewayError> {
        let part = multipart::Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.media_type())
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        let form = multipart::Form::new().part(IMAGE_FIELD, part);

        let response = self
            .client
            .post(&self.config.url)
            .multipart(form)
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(GatewayError::from_reqwest)?;

        debug!(
            "Gateway answered HTTP {} ({} bytes) for {}",
            status,
            body.len(),
            file.name()
        );
        decode_response(status, content_type.as_deref(), &body)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn process(&self, file: &SourceFile) -> Result<ProcessedImage, GatewayError> {
        let start = Instant::now();
        let result = self.send(file).await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["gateway", "process"])
            .observe(start.elapsed().as_secs_f64());
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[
                "gateway",
                "process",
                if result.is_ok() { "success" } else { "error" },
            ])
            .inc();

        result
    }
}

/// Interpret a gateway response.
///
/// 2xx must be a JSON [`ProcessedImage`] with an inline image or a URL.
/// Anything else becomes [`GatewayError::Rejected`] carrying the server's
/// `error` string when the body is readable.
pub fn decode_response(
    status: u16,
    content_type: Option<&str>,
    body: &str,
) -> Result<ProcessedImage, GatewayError> {
    if !(200..300).contains(&status) {
        let parsed = serde_json::from_str::<GatewayErrorBody>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|b| b.display_message())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("{} (HTTP {})", FALLBACK_FAILURE, status)
                } else {
                    FALLBACK_FAILURE.to_string()
                }
            });
        return Err(GatewayError::Rejected {
            status,
            message,
            code: parsed.and_then(|b| b.code),
        });
    }

    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false);
    if !is_json {
        return Err(GatewayError::MalformedResponse(format!(
            "expected application/json, got {}",
            content_type.unwrap_or("no content type")
        )));
    }

    let image: ProcessedImage = serde_json::from_str(body)
        .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
    if !image.has_payload() {
        return Err(GatewayError::MalformedResponse(
            "response has neither processedImage nor optimizedUrl".to_string(),
        ));
    }
    Ok(image)
}
