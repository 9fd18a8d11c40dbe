//! # lecslide
//!
//! Turn lecture slide decks (PDF, PPTX, legacy PPT) into AI-enhanced study
//! materials: a summary with key points, key concepts, practice questions and
//! a flowchart per slide, exportable as Markdown, HTML, PDF or DOCX.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload / file
//!  │
//!  ├─ 1. Extract   PDF (pdfium) · PPTX (zip + quick-xml) · PPT (cfb records)
//!  ├─ 2. Enhance   per slide, 4 concurrent LLM requests → strict JSON decode
//!  ├─ 3. Store     in-memory session: Processing → Ready | Failed
//!  └─ 4. Export    Markdown · HTML · PDF · DOCX
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lecslide::{study_path, write_export, ExportFormat, LlmGenerator, StudyConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / EDGEQUAKE_*
//!     let config = StudyConfig::default();
//!     let generator = Arc::new(LlmGenerator::from_config(&config)?);
//!     let deck = study_path(Path::new("lecture01.pptx"), "Algorithms", generator, &config).await?;
//!     write_export(&deck, ExportFormat::Markdown, Path::new("lecture01.md")).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `lecslide` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | off     | Embed the pdfium shared library at compile time |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! lecslide = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod quiz;
pub mod server;
pub mod session;
pub mod study;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServerConfig, StudyConfig, StudyConfigBuilder};
pub use error::{Artifact, LecSlideError};
pub use export::ExportFormat;
pub use extract::{extract_file, extract_slides, SlideFormat};
pub use model::{
    Concept, ExtractedSlide, FlowEdge, FlowNode, Flowchart, Question, QuestionKind, Slide,
    SlideData, SlidePatch, VisualAid,
};
pub use pipeline::enhance::Enhancer;
pub use pipeline::generate::{BackendError, LlmGenerator, TextGenerator};
pub use progress::{NoopProgressCallback, ProgressCallback, StudyProgressCallback};
pub use quiz::{Answer, QuizSession, Score};
pub use server::{router, AppState};
pub use session::{SessionState, SessionStore};
pub use study::{enhance_slides, study_file, study_path, write_export};
