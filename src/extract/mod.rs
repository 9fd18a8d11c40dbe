//! File Text Extractor: bytes + declared media type → ordered slide texts.
//!
//! ```text
//! media type ──▶ SlideFormat ──▶ pdf  (pdfium, one record per page)
//!                     │       ├─▶ pptx (zip + quick-xml, one per slide part)
//!                     │       └─▶ ppt  (OLE compound file record walk)
//!                     └─ unknown ─▶ UnsupportedFileType (no parsing attempted)
//! ```
//!
//! Extraction is all-or-nothing per file: either every slide comes back, in
//! source order, or a single [`LecSlideError::Extraction`] does. The parsers
//! are synchronous and CPU-bound, so [`extract_slides`] runs them inside
//! `spawn_blocking`.

pub mod pdf;
pub mod ppt;
pub mod pptx;

use crate::error::LecSlideError;
use crate::model::ExtractedSlide;
use std::path::Path;
use tracing::{debug, info};

/// Media type of PDF uploads.
pub const MEDIA_TYPE_PDF: &str = "application/pdf";
/// Media type of legacy PowerPoint 97–2003 uploads.
pub const MEDIA_TYPE_PPT: &str = "application/vnd.ms-powerpoint";
/// Media type of Office Open XML presentations.
pub const MEDIA_TYPE_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Every media type the upload endpoint accepts.
pub const ALLOWED_MEDIA_TYPES: [&str; 3] = [MEDIA_TYPE_PDF, MEDIA_TYPE_PPT, MEDIA_TYPE_PPTX];

/// A recognised slide-deck container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideFormat {
    Pdf,
    Pptx,
    Ppt,
}

impl SlideFormat {
    /// Match a declared media type. Parameters (`; charset=…`) and case are
    /// ignored.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            MEDIA_TYPE_PDF => Some(Self::Pdf),
            MEDIA_TYPE_PPTX => Some(Self::Pptx),
            MEDIA_TYPE_PPT => Some(Self::Ppt),
            _ => None,
        }
    }

    /// Guess from a file extension (used by the CLI, which has no declared type).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            _ => None,
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Pdf => MEDIA_TYPE_PDF,
            Self::Pptx => MEDIA_TYPE_PPTX,
            Self::Ppt => MEDIA_TYPE_PPT,
        }
    }

    /// Short label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Pptx => "PPTX",
            Self::Ppt => "PPT",
        }
    }

    pub(crate) fn error(&self, detail: impl Into<String>) -> LecSlideError {
        LecSlideError::Extraction {
            format: self.label().to_string(),
            detail: detail.into(),
        }
    }
}

/// Resolve a declared media type or fail with `UnsupportedFileType`.
pub fn detect_format(media_type: &str) -> Result<SlideFormat, LecSlideError> {
    SlideFormat::from_media_type(media_type).ok_or_else(|| LecSlideError::UnsupportedFileType {
        media_type: media_type.to_string(),
    })
}

/// Extract slide texts from an in-memory file.
///
/// The media type is checked before any parsing; an unsupported type never
/// reaches a parser.
pub async fn extract_slides(
    bytes: Vec<u8>,
    media_type: &str,
) -> Result<Vec<ExtractedSlide>, LecSlideError> {
    let format = detect_format(media_type)?;
    info!("Extracting {} ({} bytes)", format.label(), bytes.len());

    tokio::task::spawn_blocking(move || extract_blocking(&bytes, format))
        .await
        .map_err(|e| LecSlideError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Read a local file and extract it, choosing the parser from the extension.
pub async fn extract_file(path: &Path) -> Result<Vec<ExtractedSlide>, LecSlideError> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(SlideFormat::from_extension)
        .ok_or_else(|| LecSlideError::UnsupportedFileType {
            media_type: path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| "unknown".to_string()),
        })?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| LecSlideError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

    extract_slides(bytes, format.media_type()).await
}

/// Synchronous extraction for a known format.
pub fn extract_blocking(
    bytes: &[u8],
    format: SlideFormat,
) -> Result<Vec<ExtractedSlide>, LecSlideError> {
    if bytes.is_empty() {
        return Err(format.error("file is empty"));
    }

    let slides = match format {
        SlideFormat::Pdf => pdf::extract(bytes)?,
        SlideFormat::Pptx => pptx::extract(bytes)?,
        SlideFormat::Ppt => ppt::extract(bytes)?,
    };

    if slides.is_empty() {
        return Err(format.error("document contains no pages or slides"));
    }
    debug!("Extracted {} slides from {}", slides.len(), format.label());
    Ok(slides)
}
