//! Format-neutral block layout shared by the PDF and DOCX exporters.
//!
//! [`layout`] flattens a deck into a list of typed blocks in exactly the
//! order the HTML page shows them, so paginated formats carry the same
//! content in the same sequence.

use crate::model::{Flowchart, QuestionKind, SlideData, VisualAid};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Deck title.
    Title(String),
    /// Subject and generation date lines under the title.
    Meta(String),
    /// `Slide k: title`.
    SlideHeading(String),
    /// Section heading inside a slide (Summary, Key Points, …).
    Section(&'static str),
    Paragraph(String),
    Bullet(String),
    Concept { name: String, definition: String },
    /// `Qn: question`.
    Question(String),
    Choice { text: String, correct: bool },
    Answer(bool),
    /// Slide separator.
    Rule,
}

/// Flatten a deck into blocks.
pub fn layout(data: &SlideData) -> Vec<Block> {
    let mut blocks = vec![
        Block::Title(data.title.clone()),
        Block::Meta(format!("Subject: {}", data.subject)),
        Block::Meta(format!(
            "Generated with LecSlide on {}",
            data.created_at.format("%B %-d, %Y")
        )),
    ];

    for (index, slide) in data.slides.iter().enumerate() {
        blocks.push(Block::SlideHeading(format!("Slide {}: {}", index + 1, slide.title)));

        let content = slide.content.trim();
        if !content.is_empty() {
            blocks.extend(content.lines().map(|l| Block::Paragraph(l.trim_end().to_string())));
        }

        blocks.push(Block::Section("Summary"));
        blocks.push(Block::Paragraph(slide.summary.clone()));

        blocks.push(Block::Section("Key Points"));
        blocks.extend(slide.key_points.iter().cloned().map(Block::Bullet));

        blocks.push(Block::Section("Key Concepts"));
        blocks.extend(slide.concepts.iter().map(|c| Block::Concept {
            name: c.name.clone(),
            definition: c.definition.clone(),
        }));

        blocks.push(Block::Section("Practice Questions"));
        for (q_index, question) in slide.questions.iter().enumerate() {
            blocks.push(Block::Question(format!("Q{}: {}", q_index + 1, question.question)));
            match &question.kind {
                QuestionKind::MultipleChoice {
                    options,
                    correct_answer,
                } => {
                    blocks.extend(options.iter().enumerate().map(|(i, text)| Block::Choice {
                        text: text.clone(),
                        correct: i == *correct_answer,
                    }));
                }
                QuestionKind::TrueFalse { correct_answer } => {
                    blocks.push(Block::Answer(*correct_answer));
                }
            }
        }

        if let Some(VisualAid::Flowchart(chart)) = &slide.visual_aid {
            if !chart.nodes.is_empty() {
                blocks.push(Block::Section("Visual Aid"));
                blocks.extend(flow_lines(chart).into_iter().map(Block::Bullet));
            }
        }

        blocks.push(Block::Rule);
    }

    blocks
}

/// One `From → To` line per edge, then any node no edge touches.
pub fn flow_lines(chart: &Flowchart) -> Vec<String> {
    fn label<'a>(chart: &'a Flowchart, id: &'a str) -> &'a str {
        chart
            .nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.label.as_str())
            .unwrap_or(id)
    }

    let mut lines: Vec<String> = chart
        .edges
        .iter()
        .map(|e| format!("{} → {}", label(chart, &e.from), label(chart, &e.to)))
        .collect();

    lines.extend(
        chart
            .nodes
            .iter()
            .filter(|n| !chart.edges.iter().any(|e| e.from == n.id || e.to == n.id))
            .map(|n| n.label.clone()),
    );
    lines
}
