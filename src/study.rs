//! Whole-file study pipeline: extract → enhance every slide → [`SlideData`].
//!
//! Slides are enhanced with bounded concurrency
//! ([`StudyConfig::slide_concurrency`]) using `buffered`, so results come
//! back in source order without a sort. The pipeline is all-or-nothing: the
//! first slide that fails stops the stream and its error is returned.

use crate::config::StudyConfig;
use crate::error::LecSlideError;
use crate::export::{self, ExportFormat};
use crate::extract;
use crate::model::{ExtractedSlide, Slide, SlideData};
use crate::pipeline::enhance::Enhancer;
use crate::pipeline::generate::TextGenerator;
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Extract and enhance an in-memory file.
pub async fn study_file(
    bytes: Vec<u8>,
    media_type: &str,
    title: &str,
    subject: &str,
    generator: Arc<dyn TextGenerator>,
    config: &StudyConfig,
) -> Result<SlideData, LecSlideError> {
    let extracted = extract::extract_slides(bytes, media_type).await?;
    enhance_slides(extracted, title, subject, generator, config).await
}

/// Extract and enhance a local file. The deck title is the file stem.
pub async fn study_path(
    path: &Path,
    subject: &str,
    generator: Arc<dyn TextGenerator>,
    config: &StudyConfig,
) -> Result<SlideData, LecSlideError> {
    let extracted = extract::extract_file(path).await?;
    let title = deck_title(path, &extracted);
    enhance_slides(extracted, &title, subject, generator, config).await
}

/// Enhance already-extracted slides. Slide ids are 1-based positions.
pub async fn enhance_slides(
    extracted: Vec<ExtractedSlide>,
    title: &str,
    subject: &str,
    generator: Arc<dyn TextGenerator>,
    config: &StudyConfig,
) -> Result<SlideData, LecSlideError> {
    let total = extracted.len();
    let enhancer = Enhancer::new(generator, config);
    let progress = config.progress_callback.clone();
    let succeeded = AtomicUsize::new(0);

    info!(
        "Enhancing {} slides ({} at a time)",
        total, config.slide_concurrency
    );
    if let Some(ref cb) = progress {
        cb.on_study_start(total);
    }

    let result: Result<Vec<Slide>, LecSlideError> = stream::iter(0..total)
        .map(|idx| {
            let source = &extracted[idx];
            let enhancer = &enhancer;
            let progress = progress.clone();
            let succeeded = &succeeded;
            async move {
                let slide_num = idx + 1;
                if let Some(ref cb) = progress {
                    cb.on_slide_start(slide_num, total);
                }
                let result = enhancer.enhance_slide(slide_num as u32, source).await;
                match (&result, &progress) {
                    (Ok(slide), Some(cb)) => {
                        cb.on_slide_complete(slide_num, total, slide.questions.len())
                    }
                    (Err(e), Some(cb)) => cb.on_slide_error(slide_num, total, &e.to_string()),
                    _ => {}
                }
                match &result {
                    Ok(_) => {
                        succeeded.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => warn!("Slide {}/{} failed: {}", slide_num, total, e),
                }
                result
            }
        })
        .buffered(config.slide_concurrency.max(1))
        .try_collect()
        .await;

    if let Some(ref cb) = progress {
        cb.on_study_complete(total, succeeded.load(Ordering::SeqCst));
    }

    let slides = result?;
    info!("Enhanced {} slides", slides.len());

    Ok(SlideData {
        title: title.to_string(),
        subject: subject.to_string(),
        created_at: Utc::now(),
        slides,
    })
}

/// Render `data` and write it to `path` atomically (temp file + rename).
pub async fn write_export(
    data: &SlideData,
    format: ExportFormat,
    path: &Path,
) -> Result<(), LecSlideError> {
    let bytes = export::render_async(data.clone(), format).await?;

    let write_err = |source: std::io::Error| LecSlideError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension(format!("{}.tmp", format.extension()));
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn deck_title(path: &Path, extracted: &[ExtractedSlide]) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| extracted.first().map(|s| s.title.clone()))
        .unwrap_or_else(|| "Untitled Lecture".to_string())
}
