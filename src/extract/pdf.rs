//! PDF text extraction via pdfium: one slide record per page.
//!
//! Lecture decks exported to PDF keep one slide per page, and the slide title
//! is almost always the first line pdfium returns for the page, so
//! [`ExtractedSlide::from_text`] does the title/content split.
//!
//! pdfium keeps thread-local state; callers run this inside `spawn_blocking`
//! (see [`crate::extract::extract_slides`]).

use super::SlideFormat;
use crate::error::LecSlideError;
use crate::model::ExtractedSlide;
use pdfium_render::prelude::*;
use tracing::debug;

/// Bind to the pdfium shared library, downloading it on first use.
///
/// Shared by extraction and the PDF exporter.
pub(crate) fn bind_pdfium() -> Result<Pdfium, LecSlideError> {
    pdfium_auto::bind_pdfium_silent()
        .map_err(|e| LecSlideError::PdfiumBindingFailed(e.to_string()))
}

/// Extract the text of every page.
pub fn extract(bytes: &[u8]) -> Result<Vec<ExtractedSlide>, LecSlideError> {
    let pdfium = bind_pdfium()?;
    extract_with(&pdfium, bytes)
}

/// Extract using an already-bound pdfium instance.
pub fn extract_with(pdfium: &Pdfium, bytes: &[u8]) -> Result<Vec<ExtractedSlide>, LecSlideError> {
    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.contains("Password") || detail.contains("password") {
            SlideFormat::Pdf.error("document is encrypted and requires a password")
        } else {
            SlideFormat::Pdf.error(detail)
        }
    })?;

    let pages = document.pages();
    let mut slides = Vec::with_capacity(pages.len() as usize);

    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| SlideFormat::Pdf.error(format!("page {}: {:?}", idx + 1, e)))?
            .all();
        debug!("Page {}: {} chars of text", idx + 1, text.len());
        slides.push(ExtractedSlide::from_text(&text, idx + 1));
    }

    Ok(slides)
}
