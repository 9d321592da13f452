// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File upload for notice images and attachments.

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::StoredFile;
use crate::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use std::sync::Arc;

const FILE_FIELD: &str = "file";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/upload", post(upload_file))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the maximum file size".to_string())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Accept one file from the multipart field `file`.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<StoredFile>>)> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        let stored = state
            .uploads
            .store(file_name.as_deref(), content_type.as_deref(), &bytes)
            .await?;

        tracing::info!(
            user_id = auth.user_id,
            url = %stored.url,
            size = stored.size,
            "File uploaded"
        );

        return Ok((
            StatusCode::CREATED,
            ApiResponse::with_message(stored, "File uploaded"),
        ));
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}
