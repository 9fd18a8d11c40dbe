//! Error types for the lecslide library.
//!
//! One enum, [`LecSlideError`], covers every failure the pipeline and the
//! HTTP layer can surface. The variants follow the four-way taxonomy the API
//! exposes to clients:
//!
//! * **Client input**: [`LecSlideError::UnsupportedFileType`],
//!   [`LecSlideError::InvalidInput`]: the request itself is wrong (HTTP 400).
//! * **Extraction**: [`LecSlideError::Extraction`]: the uploaded file could
//!   not be parsed. All-or-nothing per file (HTTP 500).
//! * **Generation**: [`LecSlideError::Generation`]: the AI backend failed or
//!   answered with something that does not decode into the expected shape.
//!   The [`Artifact`] names which of the four requests failed (HTTP 500).
//! * **Lookup**: [`LecSlideError::NotFound`] (HTTP 404).
//!
//! The HTTP status mapping itself lives in `crate::server::error` so the
//! pipeline stays usable without axum in the picture.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The four generated artefacts of an enhanced slide.
///
/// Carried by [`LecSlideError::Generation`] so a failure message always says
/// *which* request broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Artifact {
    /// Summary paragraph plus key points.
    Summary,
    /// Concept/definition list.
    Concepts,
    /// Practice questions.
    Questions,
    /// Flowchart visual aid.
    VisualAid,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::Summary => "summary",
            Artifact::Concepts => "concepts",
            Artifact::Questions => "questions",
            Artifact::VisualAid => "visual aid",
        };
        f.write_str(name)
    }
}

/// All errors returned by the lecslide library.
#[derive(Debug, Error)]
pub enum LecSlideError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared media type is not a PDF or PowerPoint variant.
    #[error("Unsupported file type: '{media_type}'\nUpload a PDF or PowerPoint file.")]
    UnsupportedFileType { media_type: String },

    /// The request is malformed (missing field, empty file, bad patch…).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The document parser could not load or read the buffer.
    #[error("Failed to extract text from {format} file: {detail}")]
    Extraction { format: String, detail: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The text-generation backend failed for one artefact.
    #[error("Failed to generate {artifact}: {detail}")]
    Generation { artifact: Artifact, detail: String },

    /// No text-generation backend is configured.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Lookup errors ─────────────────────────────────────────────────────
    /// Unknown session or slide.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// The session exists but its slides are still being enhanced.
    #[error("Session '{session_id}' is still processing")]
    SessionProcessing { session_id: String },

    /// Background processing for a session failed.
    #[error("Processing failed for session '{session_id}': {detail}")]
    SessionFailed { session_id: String, detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// A renderer could not produce its output.
    #[error("Failed to export {format}: {detail}")]
    Export { format: String, detail: String },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first use.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LecSlideError {
    /// Shorthand for a generation failure of `artifact`.
    pub fn generation(artifact: Artifact, detail: impl Into<String>) -> Self {
        LecSlideError::Generation {
            artifact,
            detail: detail.into(),
        }
    }

    /// Shorthand for a session lookup miss.
    pub fn session_not_found(id: impl Into<String>) -> Self {
        LecSlideError::NotFound {
            what: "Session",
            id: id.into(),
        }
    }

    /// Shorthand for a slide lookup miss.
    pub fn slide_not_found(id: impl fmt::Display) -> Self {
        LecSlideError::NotFound {
            what: "Slide",
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_names_artifact() {
        let e = LecSlideError::generation(Artifact::VisualAid, "no JSON object in response");
        let msg = e.to_string();
        assert!(msg.contains("visual aid"), "got: {msg}");
        assert!(msg.contains("no JSON object"), "got: {msg}");
    }

    #[test]
    fn unsupported_type_display() {
        let e = LecSlideError::UnsupportedFileType {
            media_type: "text/plain".into(),
        };
        assert!(e.to_string().contains("text/plain"));
    }

    #[test]
    fn not_found_display() {
        let e = LecSlideError::session_not_found("invalid-123");
        assert_eq!(e.to_string(), "Session not found: invalid-123");
        let e = LecSlideError::slide_not_found(7);
        assert_eq!(e.to_string(), "Slide not found: 7");
    }

    #[test]
    fn artifact_serialises_kebab_case() {
        let json = serde_json::to_string(&Artifact::VisualAid).unwrap();
        assert_eq!(json, "\"visual-aid\"");
    }
}
