//! Upload, session and per-slide handlers.

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::error::LecSlideError;
use crate::extract::{self, SlideFormat};
use crate::model::{Slide, SlidePatch};
use crate::session::SessionState;
use crate::study;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::path::Path as FsPath;
use tracing::{debug, info, warn};

const DEFAULT_SUBJECT: &str = "General";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub session_id: String,
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessingResponse<'a> {
    session_id: &'a str,
    status: &'static str,
}

struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl UploadedFile {
    /// Declared media type, or one inferred from the file name when the
    /// client sent none (or a generic one).
    fn media_type(&self) -> String {
        let declared = self
            .content_type
            .as_deref()
            .filter(|t| !t.is_empty() && *t != "application/octet-stream");
        if let Some(declared) = declared {
            return declared.to_string();
        }
        self.file_name
            .as_deref()
            .and_then(|n| FsPath::new(n).extension())
            .and_then(|e| e.to_str())
            .and_then(SlideFormat::from_extension)
            .map(|f| f.media_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }

    fn deck_title(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|n| FsPath::new(n).file_stem())
            .and_then(|s| s.to_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Untitled Lecture")
            .to_string()
    }
}

/// POST /api/slides/upload
///
/// Validates and extracts the file inside the request, then enhances the
/// slides in a background task. The returned session id is pollable at once.
pub(super) async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart?;
    let mut file: Option<UploadedFile> = None;
    let mut subject: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Failed to read multipart field: {}", e);
        ApiError::from(e)
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    warn!("Failed to read uploaded file: {}", e);
                    ApiError::from(e)
                })?;
                debug!(
                    "Received file {:?} ({:?}, {} bytes)",
                    file_name,
                    content_type,
                    bytes.len()
                );
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "subject" => {
                let text = field.text().await?;
                subject = Some(text.trim().to_string()).filter(|s| !s.is_empty());
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    let file = match file {
        Some(f) if !f.bytes.is_empty() => f,
        _ => return Err(ApiError::bad_request("No file uploaded")),
    };
    let media_type = file.media_type();
    extract::detect_format(&media_type)?;
    let generator = state.generator()?;

    let title = file.deck_title();
    let extracted = extract::extract_slides(file.bytes, &media_type).await?;

    let session_id = state.sessions.create();
    info!(
        "Session {}: '{}' uploaded, {} slides queued for enhancement",
        session_id,
        title,
        extracted.len()
    );

    let subject = subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
    let sessions = state.sessions.clone();
    let study_config = state.study.clone();
    let id = session_id.clone();
    tokio::spawn(async move {
        match study::enhance_slides(extracted, &title, &subject, generator, &study_config).await {
            Ok(data) => {
                info!("Session {}: ready ({} slides)", id, data.slides.len());
                sessions.set_ready(&id, data);
            }
            Err(e) => {
                warn!("Session {}: processing failed: {}", id, e);
                sessions.set_failed(&id, e.to_string());
            }
        }
    });

    Ok(Json(UploadResponse {
        session_id,
        status: "processing",
        message: "File uploaded successfully. Processing started.",
    }))
}

/// GET /api/slides/:session
pub(super) async fn get_session(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let Path(session_id) = path?;
    match state.sessions.state(&session_id)? {
        SessionState::Ready(data) => Ok(Json(data).into_response()),
        SessionState::Processing => Ok((
            StatusCode::ACCEPTED,
            Json(ProcessingResponse {
                session_id: &session_id,
                status: "processing",
            }),
        )
            .into_response()),
        SessionState::Failed(detail) => Err(LecSlideError::SessionFailed {
            session_id,
            detail,
        }
        .into()),
    }
}

/// PATCH /api/slides/:session/:slide
pub(super) async fn update_slide(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Json<SlidePatch>, JsonRejection>,
) -> ApiResult<Json<Slide>> {
    let Path((session_id, slide_id)) = path?;
    let Json(patch) = body?;
    let slide_id = parse_slide_id(&slide_id)?;
    let slide = state.sessions.update_slide(&session_id, slide_id, |slide| {
        patch.apply(slide).map_err(LecSlideError::InvalidInput)
    })?;
    debug!("Session {}: slide {} updated", session_id, slide_id);
    Ok(Json(slide))
}

/// POST /api/slides/:session/:slide/regenerate-summary
pub(super) async fn regenerate_summary(
    state: State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Json<Slide>> {
    regenerate(state, path, Regenerate::Summary).await
}

/// POST /api/slides/:session/:slide/regenerate-questions
pub(super) async fn regenerate_questions(
    state: State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Json<Slide>> {
    regenerate(state, path, Regenerate::Questions).await
}

/// POST /api/slides/:session/:slide/regenerate-visual
pub(super) async fn regenerate_visual(
    state: State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Json<Slide>> {
    regenerate(state, path, Regenerate::VisualAid).await
}

#[derive(Debug, Clone, Copy)]
enum Regenerate {
    Summary,
    Questions,
    VisualAid,
}

async fn regenerate(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    what: Regenerate,
) -> ApiResult<Json<Slide>> {
    let Path((session_id, slide_id)) = path?;
    let slide_id = parse_slide_id(&slide_id)?;
    let current = state.sessions.slide(&session_id, slide_id)?;
    let enhancer = state.enhancer()?;

    info!("Session {}: regenerating {:?} for slide {}", session_id, what, slide_id);
    let fresh = match what {
        Regenerate::Summary => enhancer.regenerate_summary(&current).await?,
        Regenerate::Questions => enhancer.regenerate_questions(&current).await?,
        Regenerate::VisualAid => enhancer.regenerate_visual_aid(&current).await?,
    };

    // Only the regenerated fields are written back, so edits made while the
    // request was in flight survive.
    let slide = state.sessions.update_slide(&session_id, slide_id, move |slide| {
        match what {
            Regenerate::Summary => {
                slide.summary = fresh.summary;
                slide.key_points = fresh.key_points;
            }
            Regenerate::Questions => slide.questions = fresh.questions,
            Regenerate::VisualAid => slide.visual_aid = fresh.visual_aid,
        }
        Ok(())
    })?;
    Ok(Json(slide))
}

fn parse_slide_id(raw: &str) -> Result<u32, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid slide id '{raw}'")))
}
