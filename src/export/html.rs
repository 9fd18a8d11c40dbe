//! HTML export: a single self-contained page with an inline stylesheet.
//!
//! Every piece of deck text passes through `html_escape` before it is
//! written, so slide content can never inject markup.

use crate::model::{QuestionKind, SlideData, VisualAid};
use html_escape::encode_text;
use std::fmt::Write;

const STYLE: &str = r#"    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif;
      line-height: 1.6;
      color: #333;
      max-width: 800px;
      margin: 0 auto;
      padding: 2rem;
    }
    h1 { color: #2563eb; }
    h2 { color: #1e40af; border-bottom: 1px solid #e5e7eb; padding-bottom: 0.5rem; }
    h3 { color: #374151; }
    h4 { color: #4b5563; }
    .metadata { color: #6b7280; font-size: 0.875rem; margin-bottom: 2rem; }
    .slide { margin-bottom: 3rem; border: 1px solid #e5e7eb; padding: 1.5rem; border-radius: 0.5rem; }
    .content p { white-space: pre-line; }
    .summary { background-color: #eff6ff; padding: 1rem; border-radius: 0.25rem; }
    .concepts { display: grid; grid-template-columns: repeat(auto-fill, minmax(300px, 1fr)); gap: 1rem; }
    .concept { background-color: #f3f4f6; padding: 1rem; border-radius: 0.25rem; }
    .flow li { list-style: none; }
    .correct { color: #047857; }
"#;

/// Render a deck as a complete HTML document.
pub fn render(data: &SlideData) -> String {
    let title = encode_text(&data.title);
    let mut html = String::with_capacity(4096 * data.slides.len().max(1));

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"UTF-8\">\n  \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n  \
         <title>{title}</title>\n  <style>\n{STYLE}  </style>\n</head>\n<body>\n  \
         <h1>{title}</h1>\n  <div class=\"metadata\">\n    <p>Subject: {}</p>\n    \
         <p>Generated with LecSlide on {}</p>\n  </div>\n",
        encode_text(&data.subject),
        data.created_at.format("%B %-d, %Y"),
    );

    for (index, slide) in data.slides.iter().enumerate() {
        let _ = write!(
            html,
            "  <div class=\"slide\">\n    <h2>Slide {}: {}</h2>\n",
            index + 1,
            encode_text(&slide.title)
        );

        if !slide.content.trim().is_empty() {
            let _ = write!(
                html,
                "    <div class=\"content\">\n      <p>{}</p>\n    </div>\n",
                encode_text(slide.content.trim())
            );
        }

        let _ = write!(
            html,
            "    <div class=\"summary\">\n      <h3>Summary</h3>\n      <p>{}</p>\n    </div>\n",
            encode_text(&slide.summary)
        );

        html.push_str("    <div class=\"key-points\">\n      <h3>Key Points</h3>\n      <ul>");
        for point in &slide.key_points {
            let _ = write!(html, "<li>{}</li>", encode_text(point));
        }
        html.push_str("</ul>\n    </div>\n");

        html.push_str(
            "    <div class=\"key-concepts\">\n      <h3>Key Concepts</h3>\n      <div class=\"concepts\">\n",
        );
        for concept in &slide.concepts {
            let _ = write!(
                html,
                "        <div class=\"concept\">\n          <h4>{}</h4>\n          <p>{}</p>\n        </div>\n",
                encode_text(&concept.name),
                encode_text(&concept.definition)
            );
        }
        html.push_str("      </div>\n    </div>\n");

        html.push_str("    <div class=\"practice-questions\">\n      <h3>Practice Questions</h3>\n");
        for (q_index, question) in slide.questions.iter().enumerate() {
            let _ = write!(
                html,
                "      <div class=\"question\">\n        <p><strong>Q{}:</strong> {}</p>\n",
                q_index + 1,
                encode_text(&question.question)
            );
            match &question.kind {
                QuestionKind::MultipleChoice {
                    options,
                    correct_answer,
                } => {
                    html.push_str("        <ol>");
                    for (i, option) in options.iter().enumerate() {
                        if i == *correct_answer {
                            let _ = write!(html, "<li class=\"correct\">{} ✓</li>", encode_text(option));
                        } else {
                            let _ = write!(html, "<li>{}</li>", encode_text(option));
                        }
                    }
                    html.push_str("</ol>\n");
                }
                QuestionKind::TrueFalse { correct_answer } => {
                    let _ = writeln!(
                        html,
                        "        <p>Answer: <span class=\"correct\">{}</span></p>",
                        if *correct_answer { "True" } else { "False" }
                    );
                }
            }
            html.push_str("      </div>\n");
        }
        html.push_str("    </div>\n");

        if let Some(VisualAid::Flowchart(chart)) = &slide.visual_aid {
            if !chart.nodes.is_empty() {
                html.push_str("    <div class=\"visual-aid\">\n      <h3>Visual Aid</h3>\n      <ul class=\"flow\">");
                for line in super::layout::flow_lines(chart) {
                    let _ = write!(html, "<li>{}</li>", encode_text(&line));
                }
                html.push_str("</ul>\n    </div>\n");
            }
        }

        html.push_str("  </div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
