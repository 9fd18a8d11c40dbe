//! Content Enhancer: one extracted slide in, one fully enhanced slide out.
//!
//! ```text
//!                   ┌─▶ summary   ─▶ parse_summary   ─┐
//! (title, content) ─┼─▶ concepts  ─▶ parse_concepts  ─┼─▶ Slide
//!                   ├─▶ questions ─▶ parse_questions ─┤
//!                   └─▶ visual    ─▶ parse_visual_aid ┘
//! ```
//!
//! The four requests run concurrently and are joined with `try_join!`: the
//! first failure cancels the rest and the slide fails as a whole. There is no
//! retry; a per-request timeout turns a hung backend into a
//! [`LecSlideError::Generation`] for the artifact that stalled.

use super::generate::TextGenerator;
use super::parse;
use crate::config::StudyConfig;
use crate::error::{Artifact, LecSlideError};
use crate::model::{ExtractedSlide, Question, Slide, VisualAid};
use crate::prompts;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Drives a [`TextGenerator`] to build and refresh slide study materials.
#[derive(Clone)]
pub struct Enhancer {
    generator: Arc<dyn TextGenerator>,
    timeout: Option<Duration>,
}

impl Enhancer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &StudyConfig) -> Self {
        let timeout = (config.api_timeout_secs > 0).then(|| Duration::from_secs(config.api_timeout_secs));
        Self { generator, timeout }
    }

    /// Enhance one slide. `id` is its 1-based position in the deck.
    pub async fn enhance_slide(&self, id: u32, source: &ExtractedSlide) -> Result<Slide, LecSlideError> {
        let (title, content) = (source.title.as_str(), source.content.as_str());
        debug!("Slide {}: sending 4 generation requests", id);

        let (summary, concepts, questions, visual_aid) = tokio::try_join!(
            async {
                let raw = self.request(Artifact::Summary, prompts::summary_prompt(title, content)).await?;
                parse::parse_summary(&raw)
            },
            async {
                let raw = self.request(Artifact::Concepts, prompts::concepts_prompt(title, content)).await?;
                parse::parse_concepts(&raw, id)
            },
            async {
                let raw = self.request(Artifact::Questions, prompts::questions_prompt(title, content)).await?;
                parse::parse_questions(&raw, id)
            },
            async {
                let raw = self.request(Artifact::VisualAid, prompts::visual_aid_prompt(title, content)).await?;
                parse::parse_visual_aid(&raw)
            },
        )?;

        Ok(Slide {
            id,
            title: source.title.clone(),
            content: source.content.clone(),
            summary: summary.summary,
            key_points: summary.key_points,
            concepts,
            questions,
            visual_aid: Some(visual_aid),
        })
    }

    /// The slide with a fresh summary and key points; nothing else changes.
    pub async fn regenerate_summary(&self, slide: &Slide) -> Result<Slide, LecSlideError> {
        let raw = self
            .request(Artifact::Summary, prompts::summary_prompt(&slide.title, &slide.content))
            .await?;
        let fresh = parse::parse_summary(&raw)?;
        Ok(Slide {
            summary: fresh.summary,
            key_points: fresh.key_points,
            ..slide.clone()
        })
    }

    /// The slide with fresh practice questions; nothing else changes.
    pub async fn regenerate_questions(&self, slide: &Slide) -> Result<Slide, LecSlideError> {
        let questions = self.fresh_questions(slide).await?;
        Ok(Slide {
            questions,
            ..slide.clone()
        })
    }

    /// The slide with a fresh flowchart; nothing else changes.
    pub async fn regenerate_visual_aid(&self, slide: &Slide) -> Result<Slide, LecSlideError> {
        let aid = self.fresh_visual_aid(slide).await?;
        Ok(Slide {
            visual_aid: Some(aid),
            ..slide.clone()
        })
    }

    async fn fresh_questions(&self, slide: &Slide) -> Result<Vec<Question>, LecSlideError> {
        let raw = self
            .request(Artifact::Questions, prompts::questions_prompt(&slide.title, &slide.content))
            .await?;
        parse::parse_questions(&raw, slide.id)
    }

    async fn fresh_visual_aid(&self, slide: &Slide) -> Result<VisualAid, LecSlideError> {
        let raw = self
            .request(Artifact::VisualAid, prompts::visual_aid_prompt(&slide.title, &slide.content))
            .await?;
        parse::parse_visual_aid(&raw)
    }

    /// One backend call, bounded by the configured timeout.
    async fn request(&self, artifact: Artifact, prompt: String) -> Result<String, LecSlideError> {
        let call = self.generator.generate(&prompt);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                warn!("{} request timed out after {:?}", artifact, limit);
                LecSlideError::generation(artifact, format!("backend did not respond within {limit:?}"))
            })?,
            None => call.await,
        };
        result.map_err(|e| {
            warn!("{} request failed: {}", artifact, e);
            LecSlideError::generation(artifact, e.to_string())
        })
    }
}
