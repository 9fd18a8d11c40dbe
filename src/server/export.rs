//! Export and download handlers.
//!
//! `export` only validates the session and hands out a link; the file is
//! rendered when `download` is hit, so edits made in between are included.

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::export::{self, ExportFormat};
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub url: String,
    pub file_name: String,
    pub file_type: &'static str,
}

/// GET /api/slides/:session/export?format=
pub(super) async fn export(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> ApiResult<Json<ExportResponse>> {
    let Path(session_id) = path?;
    let Query(query) = query?;
    state.sessions.slide_data(&session_id)?;
    let format = ExportFormat::from_query(query.format.as_deref());
    let ext = format.extension();

    Ok(Json(ExportResponse {
        url: state.server.download_url(&format!("{session_id}.{ext}")),
        file_name: format!("lecture_notes_{session_id}.{ext}"),
        file_type: format.media_type(),
    }))
}

/// GET /api/download/:file
///
/// `file` is `<session>.<ext>`; the extension picks the format.
pub(super) async fn download(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let Path(file) = path?;
    let (session_id, ext) = file
        .rsplit_once('.')
        .filter(|(id, _)| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("Invalid download name '{file}'")))?;
    let format = ExportFormat::from_extension(ext)
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported file extension '.{ext}'")))?;

    let data = state.sessions.slide_data(session_id)?;
    let bytes = export::render_async(data, format).await?;
    info!("Session {}: exported {} ({} bytes)", session_id, format, bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.replace('"', "")),
            ),
        ],
        bytes,
    )
        .into_response())
}
