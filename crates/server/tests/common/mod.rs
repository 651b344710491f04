//! Common test utilities for the gateway server.
//!
//! [`TestFixture`] drives the router in-process with `oneshot`;
//! [`spawn_server`] binds it to a loopback port for tests that need a real
//! HTTP client.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use squeeze_core::Config;
use squeeze_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use squeeze_core::testing::fixtures;

const BOUNDARY: &str = "squeeze-test-boundary";

/// In-process gateway server.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_png_upload() {
///     let fixture = TestFixture::new();
///     let png = fixtures::png_bytes(32, 32);
///     let response = fixture.upload("image", "a.png", "image/png", &png).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub state: Arc<AppState>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let state = Arc::new(
            AppState::from_config(config)
                .expect("Failed to create state")
                .with_region(Some("test-region".to_string())),
        );
        let router = create_router(Arc::clone(&state));
        Self { router, state }
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// POST one file as a multipart part named `field`.
    pub async fn upload(
        &self,
        field: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> TestResponse {
        let body = multipart_body(field, file_name, content_type, data);
        self.post_raw(
            "/api/process-image",
            &format!("multipart/form-data; boundary={}", BOUNDARY),
            body,
        )
        .await
    }

    /// POST a raw body with the given content type.
    pub async fn post_raw(&self, path: &str, content_type: &str, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }
}

/// Single-part multipart/form-data body.
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        BOUNDARY, field, file_name, content_type
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Serve `router` on a loopback port and return its address.
pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Serve the real gateway on a loopback port.
pub async fn spawn_server(config: Config) -> (SocketAddr, Arc<AppState>) {
    let fixture = TestFixture::with_config(config);
    let addr = spawn_router(fixture.router).await;
    (addr, fixture.state)
}
