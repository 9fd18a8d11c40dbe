//! Markdown export.
//!
//! One `## Slide k: title` heading per slide, in order, and no other level-2
//! headings: slide content lines that would parse as headings are escaped.
//! The generation date is taken from `created_at`, so the same deck always
//! renders to the same text.

use crate::model::{QuestionKind, SlideData, VisualAid};
use std::fmt::Write;

/// Render a deck as Markdown.
pub fn render(data: &SlideData) -> String {
    let mut md = String::with_capacity(2048 * data.slides.len().max(1));

    // `write!` into a String cannot fail.
    let _ = write!(
        md,
        "# {}\n\nSubject: {}\n\nGenerated with LecSlide on {}\n\n",
        single_line(&data.title),
        single_line(&data.subject),
        data.created_at.format("%B %-d, %Y")
    );

    for (index, slide) in data.slides.iter().enumerate() {
        let _ = write!(md, "## Slide {}: {}\n\n", index + 1, single_line(&slide.title));

        if !slide.content.trim().is_empty() {
            md.push_str(&escape_block(&slide.content));
            md.push_str("\n\n");
        }

        md.push_str("### Summary\n\n");
        md.push_str(&escape_block(&slide.summary));
        md.push_str("\n\n");

        md.push_str("### Key Points\n\n");
        for point in &slide.key_points {
            let _ = writeln!(md, "- {}", inline(point));
        }
        md.push('\n');

        md.push_str("### Key Concepts\n\n");
        for concept in &slide.concepts {
            let _ = writeln!(
                md,
                "- **{}**: {}",
                single_line(&concept.name),
                single_line(&concept.definition)
            );
        }
        md.push('\n');

        md.push_str("### Practice Questions\n\n");
        for (q_index, question) in slide.questions.iter().enumerate() {
            let _ = write!(md, "**Q{}: {}**\n\n", q_index + 1, single_line(&question.question));
            match &question.kind {
                QuestionKind::MultipleChoice {
                    options,
                    correct_answer,
                } => {
                    for (i, option) in options.iter().enumerate() {
                        if i == *correct_answer {
                            let _ = writeln!(md, "✓ {} ✓", inline(option));
                        } else {
                            let _ = writeln!(md, "{}", inline(option));
                        }
                    }
                    md.push('\n');
                }
                QuestionKind::TrueFalse { correct_answer } => {
                    let _ = write!(
                        md,
                        "Answer: {}\n\n",
                        if *correct_answer { "True" } else { "False" }
                    );
                }
            }
        }

        if let Some(aid) = &slide.visual_aid {
            if let Some(chart) = mermaid(aid) {
                md.push_str("### Visual Aid\n\n```mermaid\n");
                md.push_str(&chart);
                md.push_str("```\n\n");
            }
        }

        md.push_str("---\n\n");
    }

    md
}

/// Mermaid `flowchart TD` source, or `None` for an empty chart.
///
/// Node ids are renumbered (`n1`, `n2`, …) so arbitrary generator ids can
/// never break Mermaid syntax.
pub fn mermaid(aid: &VisualAid) -> Option<String> {
    let VisualAid::Flowchart(chart) = aid;
    if chart.nodes.is_empty() {
        return None;
    }

    let index_of = |id: &str| chart.nodes.iter().position(|n| n.id == id);
    let mut out = String::from("flowchart TD\n");
    for (i, node) in chart.nodes.iter().enumerate() {
        let label = single_line(&node.label).replace('"', "#quot;");
        let _ = writeln!(out, "    n{}[\"{}\"]", i + 1, label);
    }
    for edge in &chart.edges {
        if let (Some(from), Some(to)) = (index_of(&edge.from), index_of(&edge.to)) {
            let _ = writeln!(out, "    n{} --> n{}", from + 1, to + 1);
        }
    }
    Some(out)
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse to one line, then escape it as a line start.
fn inline(text: &str) -> String {
    escape_line(&single_line(text))
}

/// Escape lines that Markdown would read as headings or setext underlines.
fn escape_block(text: &str) -> String {
    text.trim()
        .lines()
        .map(escape_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line(line: &str) -> String {
    let trimmed = line.trim_start();
    let heading = trimmed.starts_with('#');
    let underline = !trimmed.is_empty() && trimmed.chars().all(|c| c == '=' || c == '-');
    if heading || underline {
        format!("\\{trimmed}")
    } else {
        line.to_string()
    }
}
