//! HTTP API.
//!
//! | Method | Path                                           | Handler                 |
//! |--------|------------------------------------------------|-------------------------|
//! | GET    | `/health`, `/api/health`                       | [`health_check`]        |
//! | POST   | `/api/slides/upload`                           | `slides::upload`        |
//! | GET    | `/api/slides/:session`                         | `slides::get_session`   |
//! | PATCH  | `/api/slides/:session/:slide`                  | `slides::update_slide`  |
//! | POST   | `/api/slides/:session/:slide/regenerate-*`     | `slides::regenerate_*`  |
//! | GET    | `/api/slides/:session/export?format=`          | `export::export`        |
//! | GET    | `/api/download/:file`                          | `export::download`      |
//!
//! Uploads are extracted inside the request; enhancement then runs in a
//! spawned task and the client polls the session until it turns ready.

pub mod error;
mod export;
mod slides;

pub use error::ApiError;

use crate::config::{ServerConfig, StudyConfig};
use crate::error::LecSlideError;
use crate::pipeline::enhance::Enhancer;
use crate::pipeline::generate::TextGenerator;
use crate::session::SessionStore;
use axum::extract::DefaultBodyLimit;
use axum::http::{StatusCode, Uri};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Everything a handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// `None` when no LLM provider could be resolved; uploads and
    /// regeneration then answer 503 while fixtures stay browsable.
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub server: Arc<ServerConfig>,
    pub study: Arc<StudyConfig>,
}

impl AppState {
    pub fn new(
        server: ServerConfig,
        study: StudyConfig,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        Self {
            sessions: SessionStore::new(server.fixtures),
            generator,
            server: Arc::new(server),
            study: Arc::new(study),
        }
    }

    pub(crate) fn generator(&self) -> Result<Arc<dyn TextGenerator>, LecSlideError> {
        self.generator
            .clone()
            .ok_or_else(|| LecSlideError::ProviderNotConfigured {
                provider: self
                    .study
                    .provider_name
                    .clone()
                    .unwrap_or_else(|| "auto".to_string()),
                hint: "Set GEMINI_API_KEY or OPENAI_API_KEY (or EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL) and restart the server.".to_string(),
            })
    }

    pub(crate) fn enhancer(&self) -> Result<Enhancer, LecSlideError> {
        Ok(Enhancer::new(self.generator()?, &self.study))
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn unknown_route(uri: Uri) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", format!("No route for {uri}"))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let upload_limit = state.server.max_upload_bytes;

    let api = Router::new()
        .route(
            "/slides/upload",
            post(slides::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/slides/:session", get(slides::get_session))
        .route("/slides/:session/export", get(export::export))
        .route("/slides/:session/:slide", patch(slides::update_slide))
        .route(
            "/slides/:session/:slide/regenerate-summary",
            post(slides::regenerate_summary),
        )
        .route(
            "/slides/:session/:slide/regenerate-questions",
            post(slides::regenerate_questions),
        )
        .route(
            "/slides/:session/:slide/regenerate-visual",
            post(slides::regenerate_visual),
        )
        .route("/download/:file", get(export::download))
        .route("/health", get(health_check));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .fallback(unknown_route)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> Result<(), LecSlideError> {
    let addr = format!("{}:{}", state.server.host, state.server.port);
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| LecSlideError::InvalidConfig(format!("bad listen address '{addr}': {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| LecSlideError::Internal(format!("cannot bind {addr}: {e}")))?;
    tracing::info!("LecSlide listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LecSlideError::Internal(format!("server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
