//! `POST /api/process-image`: one multipart image in, an optimized JPEG out.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header::CACHE_CONTROL, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use squeeze_core::gateway::IMAGE_FIELD;
use squeeze_core::{Rejection, SourceFile};
use tracing::{debug, warn};

use crate::state::AppState;

/// Media type assumed for parts that do not declare one.
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

pub async fn process_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let images = state.images();

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            debug!("Request is not multipart: {}", e);
            return rejection_response(images.reject(images.policy().no_file()));
        }
    };

    let file = match read_image_field(&mut multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => return rejection_response(images.reject(images.policy().no_file())),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return rejection_response(images.reject(images.policy().too_large(None)));
        }
        Err(e) => {
            warn!("Failed to read multipart body: {}", e);
            return rejection_response(images.reject(images.policy().no_file()));
        }
    };

    match images.process(file).await {
        Ok(image) => (
            [(
                CACHE_CONTROL,
                format!("public, max-age={}", images.cache_max_age_secs()),
            )],
            Json(image),
        )
            .into_response(),
        Err(rejection) => rejection_response(rejection),
    }
}

/// First part named `image`; other parts are skipped.
async fn read_image_field(
    multipart: &mut Multipart,
) -> Result<Option<SourceFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or(IMAGE_FIELD).to_string();
        let media_type = field
            .content_type()
            .unwrap_or(UNKNOWN_MEDIA_TYPE)
            .to_string();
        let data = field.bytes().await?;
        return Ok(Some(SourceFile::new(name, media_type, data.to_vec())));
    }
    Ok(None)
}

fn rejection_response(rejection: Rejection) -> Response {
    let status = StatusCode::from_u16(rejection.status).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(rejection.body)).into_response()
}
