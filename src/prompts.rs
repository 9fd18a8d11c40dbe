//! Prompt templates for slide enhancement.
//!
//! Every prompt lives here so that a change to the expected JSON shape is made
//! in exactly one place, and unit tests can assert on the text without a
//! backend. Each builder embeds the slide title and content and describes the
//! exact JSON document the decoder in [`crate::pipeline::parse`] accepts.
//!
//! Callers can override the system prompt via
//! [`crate::config::StudyConfig::system_prompt`]; the per-artifact prompts are
//! fixed because the decoder depends on them.

/// Default system prompt sent ahead of every request.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an experienced teaching assistant who turns lecture slides into study materials for university students.

Rules:
- Base everything strictly on the slide you are given. Do not invent facts that the slide does not support.
- Write in clear, plain English aimed at a student revising for an exam.
- Respond with a single JSON document exactly in the requested shape.
- Do NOT wrap the JSON in markdown fences and do NOT add commentary before or after it."#;

fn slide_block(title: &str, content: &str) -> String {
    let content = if content.trim().is_empty() {
        "(this slide has no text beyond its title)"
    } else {
        content
    };
    format!("Slide title: {title}\n\nSlide content:\n\"\"\"\n{content}\n\"\"\"")
}

/// Summary paragraph plus four key points.
pub fn summary_prompt(title: &str, content: &str) -> String {
    format!(
        r#"{slide}

Write a concise summary of this slide (2-3 sentences) and extract exactly 4 key points a student should remember.

Respond with JSON in this exact shape:
{{"summary": "…", "keyPoints": ["…", "…", "…", "…"]}}"#,
        slide = slide_block(title, content)
    )
}

/// Two to four named concepts with definitions.
pub fn concepts_prompt(title: &str, content: &str) -> String {
    format!(
        r#"{slide}

Identify 2-4 key concepts introduced on this slide. For each, give the concept name and a one-sentence definition.

Respond with a JSON array in this exact shape:
[{{"id": "c1", "name": "…", "definition": "…"}}]"#,
        slide = slide_block(title, content)
    )
}

/// One multiple-choice question and one true/false question.
pub fn questions_prompt(title: &str, content: &str) -> String {
    format!(
        r#"{slide}

Write exactly 2 practice questions that test understanding of this slide:
1. One multiple-choice question with exactly 4 options. "correctAnswer" is the zero-based index of the correct option.
2. One true/false question. "correctAnswer" is a boolean.

Respond with a JSON array in this exact shape:
[
  {{"id": "q1", "type": "multiple-choice", "question": "…", "options": ["…", "…", "…", "…"], "correctAnswer": 0}},
  {{"id": "q2", "type": "true-false", "question": "…", "correctAnswer": true}}
]"#,
        slide = slide_block(title, content)
    )
}

/// A 5–7 node flowchart of the slide's main process or idea.
pub fn visual_aid_prompt(title: &str, content: &str) -> String {
    format!(
        r#"{slide}

Design a flowchart that visualises the main process or relationship on this slide, using 5-7 nodes with short labels (at most 5 words each). Every edge must connect two node ids that you declared.

Respond with JSON in this exact shape:
{{"type": "flowchart", "data": {{"nodes": [{{"id": "n1", "label": "…"}}], "edges": [{{"from": "n1", "to": "n2"}}]}}}}"#,
        slide = slide_block(title, content)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_embed_slide_text() {
        for prompt in [
            summary_prompt("Recursion", "A function calling itself"),
            concepts_prompt("Recursion", "A function calling itself"),
            questions_prompt("Recursion", "A function calling itself"),
            visual_aid_prompt("Recursion", "A function calling itself"),
        ] {
            assert!(prompt.contains("Slide title: Recursion"));
            assert!(prompt.contains("A function calling itself"));
        }
    }

    #[test]
    fn prompts_name_the_wire_fields() {
        assert!(summary_prompt("t", "c").contains(r#""keyPoints""#));
        assert!(questions_prompt("t", "c").contains(r#""correctAnswer""#));
        assert!(questions_prompt("t", "c").contains("true-false"));
        assert!(visual_aid_prompt("t", "c").contains(r#""type": "flowchart""#));
    }

    #[test]
    fn empty_content_is_called_out() {
        assert!(summary_prompt("Title only", "  ").contains("no text beyond its title"));
    }

    #[test]
    fn system_prompt_forbids_fences() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("JSON"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("markdown fences"));
    }
}
