//! Export Renderer: [`SlideData`] → study-material file bytes.
//!
//! ```text
//! SlideData ──▶ markdown  (text, deterministic)
//!           ├─▶ html      (self-contained page, escaped)
//!           └─▶ layout ──▶ pdf   (pdfium page objects)
//!                      └─▶ docx  (WordprocessingML via zip + quick-xml)
//! ```
//!
//! Every renderer is a pure function of its input: no clock reads, no
//! network. PDF and DOCX share [`layout::layout`], whose block order is the
//! HTML section order.

pub mod docx;
pub mod html;
pub mod layout;
pub mod markdown;
pub mod pdf;

use crate::error::LecSlideError;
use crate::model::SlideData;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media type of WordprocessingML documents.
pub const MEDIA_TYPE_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A downloadable study-material format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Html,
    Pdf,
    Docx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [Self::Markdown, Self::Html, Self::Pdf, Self::Docx];

    /// Parse a format name. Case-insensitive; `md` and `htm` are accepted.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// The export endpoint's reading of `?format=`: PDF when absent or unknown.
    pub fn from_query(name: Option<&str>) -> Self {
        name.and_then(Self::parse).unwrap_or(Self::Pdf)
    }

    /// Match a download file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// Bare media type, as reported in the export response's `fileType`.
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown",
            Self::Html => "text/html",
            Self::Pdf => "application/pdf",
            Self::Docx => MEDIA_TYPE_DOCX,
        }
    }

    /// `Content-Type` header value for downloads.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
            Self::Pdf => "application/pdf",
            Self::Docx => MEDIA_TYPE_DOCX,
        }
    }

    fn error(&self, detail: impl Into<String>) -> LecSlideError {
        LecSlideError::Export {
            format: self.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = LecSlideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            LecSlideError::InvalidInput(format!(
                "unknown export format '{s}' (expected markdown, html, pdf or docx)"
            ))
        })
    }
}

/// Render synchronously. PDF binds pdfium, so call this off the async
/// runtime (or use [`render_async`]).
pub fn render(data: &SlideData, format: ExportFormat) -> Result<Vec<u8>, LecSlideError> {
    match format {
        ExportFormat::Markdown => Ok(markdown::render(data).into_bytes()),
        ExportFormat::Html => Ok(html::render(data).into_bytes()),
        ExportFormat::Pdf => pdf::render(data),
        ExportFormat::Docx => docx::render(data),
    }
}

/// Render on the blocking pool.
pub async fn render_async(data: SlideData, format: ExportFormat) -> Result<Vec<u8>, LecSlideError> {
    match format {
        ExportFormat::Markdown | ExportFormat::Html => render(&data, format),
        ExportFormat::Pdf | ExportFormat::Docx => {
            tokio::task::spawn_blocking(move || render(&data, format))
                .await
                .map_err(|e| format.error(format!("render task panicked: {e}")))?
        }
    }
}

/// Shared fixture mirroring the deck the export renderers are specified against.
#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::*;
    use chrono::{TimeZone, Utc};

    pub(crate) fn sample_deck() -> SlideData {
        SlideData {
            title: "Test Presentation".into(),
            subject: "Testing".into(),
            created_at: Utc.with_ymd_and_hms(2023, 10, 15, 10, 30, 0).unwrap(),
            slides: vec![
                Slide {
                    id: 1,
                    title: "Test Slide 1".into(),
                    content: "This is the content of test slide 1.".into(),
                    summary: "A summary of test slide 1.".into(),
                    key_points: vec!["Key point 1".into(), "Key point 2".into()],
                    concepts: vec![
                        Concept {
                            id: "concept1".into(),
                            name: "Concept 1".into(),
                            definition: "Definition of concept 1".into(),
                        },
                        Concept {
                            id: "concept2".into(),
                            name: "Concept 2".into(),
                            definition: "Definition of concept 2".into(),
                        },
                    ],
                    questions: vec![Question::multiple_choice(
                        "q1",
                        "Test question 1?",
                        vec![
                            "Option 1".into(),
                            "Option 2".into(),
                            "Option 3".into(),
                            "Option 4".into(),
                        ],
                        2,
                    )],
                    visual_aid: Some(VisualAid::Flowchart(Flowchart {
                        nodes: vec![
                            FlowNode {
                                id: "node1".into(),
                                label: "Node 1".into(),
                            },
                            FlowNode {
                                id: "node2".into(),
                                label: "Node 2".into(),
                            },
                        ],
                        edges: vec![FlowEdge {
                            from: "node1".into(),
                            to: "node2".into(),
                        }],
                    })),
                },
                Slide {
                    id: 2,
                    title: "Test Slide 2".into(),
                    content: "This is the content of test slide 2.".into(),
                    summary: "A summary of test slide 2.".into(),
                    key_points: vec!["Key point 3".into(), "Key point 4".into()],
                    concepts: vec![Concept {
                        id: "concept3".into(),
                        name: "Concept 3".into(),
                        definition: "Definition of concept 3".into(),
                    }],
                    questions: vec![Question::true_false("q2", "Test question 2?", true)],
                    visual_aid: Some(VisualAid::Flowchart(Flowchart::default())),
                },
            ],
        }
    }
}
