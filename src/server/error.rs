//! Conversion of library errors into JSON error responses.
//!
//! Body shape: `{"error": "<kind>", "message": "<text>", "details"?: "<text>"}`.
//! Server-side failures log their full detail and, outside debug builds,
//! return only a generic message.

use crate::error::LecSlideError;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    /// A request axum could not extract (bad JSON, wrong content type, body
    /// over the limit, malformed path or query).
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        let error = match status {
            StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
            StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
            StatusCode::UNPROCESSABLE_ENTITY => "invalid_body",
            s if s.is_server_error() => "internal_error",
            _ => "bad_request",
        };
        let message = message.into();
        tracing::debug!("Rejected request ({}): {}", status, message);
        Self::new(status, error, message)
    }

    fn internal(error: &'static str, message: &str, source: &LecSlideError) -> Self {
        tracing::error!("{}: {}", error, source);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
            message: message.to_string(),
            details: cfg!(debug_assertions).then(|| source.to_string()),
        }
    }
}

impl From<LecSlideError> for ApiError {
    fn from(e: LecSlideError) -> Self {
        match &e {
            LecSlideError::UnsupportedFileType { media_type } => {
                tracing::debug!("Rejected upload with media type '{}'", media_type);
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "unsupported_file_type",
                    "Invalid file type. Please upload a PDF or PowerPoint file.",
                )
            }
            LecSlideError::InvalidInput(msg) => Self::bad_request(msg.clone()),
            LecSlideError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "not_found", e.to_string())
            }
            LecSlideError::SessionProcessing { .. } => {
                Self::new(StatusCode::CONFLICT, "processing", e.to_string())
            }
            LecSlideError::ProviderNotConfigured { .. } => {
                tracing::warn!("{}", e);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "provider_not_configured",
                    e.to_string(),
                )
            }
            LecSlideError::Extraction { .. } => Self::internal(
                "extraction_failed",
                "An error occurred while processing your file.",
                &e,
            ),
            LecSlideError::Generation { artifact, .. } => {
                let message = format!("An error occurred while generating the {artifact}.");
                Self::internal("generation_failed", &message, &e)
            }
            LecSlideError::SessionFailed { .. } => {
                Self::internal("processing_failed", "Processing of this session failed.", &e)
            }
            LecSlideError::Export { .. } | LecSlideError::PdfiumBindingFailed(_) => Self::internal(
                "export_failed",
                "An error occurred while generating the export.",
                &e,
            ),
            LecSlideError::ReadFailed { .. }
            | LecSlideError::OutputWriteFailed { .. }
            | LecSlideError::InvalidConfig(_)
            | LecSlideError::Internal(_) => {
                Self::internal("internal_error", "An internal error occurred.", &e)
            }
        }
    }
}

macro_rules! from_rejection {
    ($($rejection:ty),+ $(,)?) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(r: $rejection) -> Self {
                    Self::rejected(r.status(), r.body_text())
                }
            }
        )+
    };
}

from_rejection!(JsonRejection, MultipartRejection, PathRejection, QueryRejection, MultipartError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.error,
            message: &self.message,
            details: self.details.as_deref(),
        });
        (self.status, body).into_response()
    }
}
