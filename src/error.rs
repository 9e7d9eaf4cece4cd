use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Missing '{0}' file in request")]
    MissingFile(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid language code: {0:?}")]
    InvalidLanguage(String),

    #[error("Upload too large: {size} bytes (max: {max} bytes)")]
    UploadTooLarge { size: usize, max: usize },

    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("PDF rasterization failed: {0}")]
    Rasterizer(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServiceError::MissingFile(_) => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            ServiceError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ServiceError::InvalidLanguage(_) => (StatusCode::BAD_REQUEST, "INVALID_LANGUAGE"),
            ServiceError::UploadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "UPLOAD_TOO_LARGE")
            }
            ServiceError::Engine(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENGINE_ERROR"),
            ServiceError::Rasterizer(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RASTERIZER_ERROR"),
            ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
