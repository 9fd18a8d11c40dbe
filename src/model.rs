//! Study-material records: what the pipeline produces and the API serves.
//!
//! JSON field names are camelCase so the wire shape matches what the browser
//! client already consumes (`keyPoints`, `correctAnswer`, `visualAid`, …).
//!
//! Every record that can arrive from outside the process (the AI backend or
//! a client patch) has a `validate` method. Decoding with serde only proves
//! the *shape*; `validate` proves the cross-field invariants serde cannot
//! express, such as a multiple-choice answer index pointing into `options`.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;

/// One page/slide of raw text as it came out of the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSlide {
    pub title: String,
    pub content: String,
}

impl ExtractedSlide {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Build a record from a block of text: the first non-empty line is the
    /// title, everything after it is the content.
    ///
    /// `position` is 1-based and only used for the `Slide N` fallback title.
    pub fn from_text(text: &str, position: usize) -> Self {
        let mut lines = text.lines().map(str::trim_end);
        let title = lines
            .by_ref()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Slide {position}"));
        let content = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        Self { title, content }
    }
}

/// A slide after enhancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    /// 1-based position in the source deck.
    pub id: u32,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub concepts: Vec<Concept>,
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_aid: Option<VisualAid>,
}

/// A named concept with its definition. Owned by exactly one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub definition: String,
}

impl Concept {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("concept name is empty".into());
        }
        Ok(())
    }
}

/// A practice question.
///
/// The `type` discriminator and the answer representation travel together in
/// [`QuestionKind`], so a true/false question can never carry an option index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub question: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Question variants. `short-answer`/`open-ended` are reserved and not decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        /// Index into `options`.
        #[serde(rename = "correctAnswer")]
        correct_answer: usize,
    },
    TrueFalse {
        #[serde(rename = "correctAnswer")]
        correct_answer: bool,
    },
}

impl Question {
    pub fn multiple_choice(
        id: impl Into<String>,
        question: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            kind: QuestionKind::MultipleChoice {
                options,
                correct_answer,
            },
        }
    }

    pub fn true_false(id: impl Into<String>, question: impl Into<String>, correct_answer: bool) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            kind: QuestionKind::TrueFalse { correct_answer },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question text is empty".into());
        }
        if let QuestionKind::MultipleChoice {
            options,
            correct_answer,
        } = &self.kind
        {
            if options.len() < 2 {
                return Err(format!(
                    "multiple-choice question needs at least 2 options, got {}",
                    options.len()
                ));
            }
            if *correct_answer >= options.len() {
                return Err(format!(
                    "correctAnswer {} is out of range for {} options",
                    correct_answer,
                    options.len()
                ));
            }
        }
        Ok(())
    }
}

/// A generated visual aid. Only flowcharts exist today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum VisualAid {
    Flowchart(Flowchart),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flowchart {
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
}

impl VisualAid {
    /// Node ids must be unique and every edge must join declared nodes.
    /// Cycles and disconnected nodes are allowed.
    pub fn validate(&self) -> Result<(), String> {
        let VisualAid::Flowchart(chart) = self;
        let mut ids = HashSet::with_capacity(chart.nodes.len());
        for node in &chart.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(format!("duplicate node id '{}'", node.id));
            }
        }
        for edge in &chart.edges {
            for end in [&edge.from, &edge.to] {
                if !ids.contains(end.as_str()) {
                    return Err(format!(
                        "edge {} -> {} references undeclared node '{}'",
                        edge.from, edge.to, end
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Summary paragraph and key points, produced and regenerated together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideSummary {
    pub summary: String,
    pub key_points: Vec<String>,
}

impl SlideSummary {
    pub fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("summary is empty".into());
        }
        Ok(())
    }
}

/// A whole study session: the deck plus its enhanced slides.
///
/// Serialises with a derived `slideCount` so clients never see a count that
/// disagrees with `slides`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideData {
    pub title: String,
    pub subject: String,
    pub created_at: DateTime<Utc>,
    pub slides: Vec<Slide>,
}

impl Serialize for SlideData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SlideData", 5)?;
        s.serialize_field("slideCount", &self.slides.len())?;
        s.serialize_field("title", &self.title)?;
        s.serialize_field("subject", &self.subject)?;
        s.serialize_field("createdAt", &self.created_at)?;
        s.serialize_field("slides", &self.slides)?;
        s.end()
    }
}

impl SlideData {
    pub fn slide(&self, id: u32) -> Option<&Slide> {
        self.slides.iter().find(|s| s.id == id)
    }

    pub fn slide_mut(&mut self, id: u32) -> Option<&mut Slide> {
        self.slides.iter_mut().find(|s| s.id == id)
    }
}

/// A partial update to a slide. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub key_points: Option<Vec<String>>,
    pub concepts: Option<Vec<Concept>>,
    pub questions: Option<Vec<Question>>,
    pub visual_aid: Option<VisualAid>,
}

impl SlidePatch {
    /// Validate every supplied field, then apply. Nothing is written if any
    /// field fails validation.
    pub fn apply(self, slide: &mut Slide) -> Result<(), String> {
        if let Some(concepts) = &self.concepts {
            concepts.iter().try_for_each(Concept::validate)?;
        }
        if let Some(questions) = &self.questions {
            questions.iter().try_for_each(Question::validate)?;
        }
        if let Some(aid) = &self.visual_aid {
            aid.validate()?;
        }
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err("title is empty".into());
            }
        }

        if let Some(v) = self.title {
            slide.title = v;
        }
        if let Some(v) = self.content {
            slide.content = v;
        }
        if let Some(v) = self.summary {
            slide.summary = v;
        }
        if let Some(v) = self.key_points {
            slide.key_points = v;
        }
        if let Some(v) = self.concepts {
            slide.concepts = v;
        }
        if let Some(v) = self.questions {
            slide.questions = v;
        }
        if let Some(v) = self.visual_aid {
            slide.visual_aid = Some(v);
        }
        Ok(())
    }
}
