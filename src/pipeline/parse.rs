//! Decoding AI responses into study-material records.
//!
//! Models are asked for bare JSON but routinely wrap it in Markdown fences or
//! a sentence of preamble. Decoding therefore runs in three steps:
//!
//! 1. take the body of the first fenced code block, if there is one;
//! 2. locate the first balanced JSON value of the expected kind (object or
//!    array), matching brackets outside string literals only;
//! 3. decode that value with serde into the strict record type, then
//!    `validate` it.
//!
//! Any step failing yields [`LecSlideError::Generation`] naming the artifact.
//! Nothing is guessed or defaulted beyond filling in missing ids.

use crate::error::{Artifact, LecSlideError};
use crate::model::{Concept, Question, SlideSummary, VisualAid};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

/// The top-level JSON shape an artifact is delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Object,
    Array,
}

impl JsonKind {
    fn open(self) -> u8 {
        match self {
            JsonKind::Object => b'{',
            JsonKind::Array => b'[',
        }
    }
}

static RE_FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Body of the first fenced code block, or the whole text.
pub fn strip_code_fences(raw: &str) -> &str {
    match RE_FENCED_BLOCK.captures(raw).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => raw,
    }
}

/// The first balanced JSON value of `kind` in `text`.
pub fn extract_json(text: &str, kind: JsonKind) -> Option<&str> {
    let bytes = text.as_bytes();
    let open = kind.open();
    let mut from = 0;
    while let Some(rel) = bytes[from..].iter().position(|&b| b == open) {
        let start = from + rel;
        if let Some(end) = balanced_end(bytes, start) {
            return Some(&text[start..=end]);
        }
        from = start + 1;
    }
    None
}

/// Index of the bracket closing the one at `start`, ignoring brackets inside
/// string literals.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn decode<T: DeserializeOwned>(
    raw: &str,
    kind: JsonKind,
    artifact: Artifact,
) -> Result<T, LecSlideError> {
    let body = strip_code_fences(raw);
    let json = extract_json(body, kind).ok_or_else(|| {
        let what = match kind {
            JsonKind::Object => "no JSON object",
            JsonKind::Array => "no JSON array",
        };
        LecSlideError::generation(artifact, format!("{what} in response: {}", preview(raw)))
    })?;
    serde_json::from_str(json)
        .map_err(|e| LecSlideError::generation(artifact, format!("malformed response: {e}")))
}

fn preview(raw: &str) -> String {
    const MAX: usize = 120;
    let trimmed = raw.trim();
    if trimmed.chars().count() <= MAX {
        format!("{trimmed:?}")
    } else {
        let head: String = trimmed.chars().take(MAX).collect();
        format!("{head:?}…")
    }
}

/// Summary paragraph and key points.
pub fn parse_summary(raw: &str) -> Result<SlideSummary, LecSlideError> {
    let mut summary: SlideSummary = decode(raw, JsonKind::Object, Artifact::Summary)?;
    summary.summary = summary.summary.trim().to_string();
    summary.key_points = summary
        .key_points
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    summary
        .validate()
        .map_err(|e| LecSlideError::generation(Artifact::Summary, e))?;
    Ok(summary)
}

/// Concept list; missing ids become `c{slide}-{n}`.
pub fn parse_concepts(raw: &str, slide_id: u32) -> Result<Vec<Concept>, LecSlideError> {
    let mut concepts: Vec<Concept> = decode(raw, JsonKind::Array, Artifact::Concepts)?;
    if concepts.is_empty() {
        return Err(LecSlideError::generation(Artifact::Concepts, "response listed no concepts"));
    }
    for (n, concept) in concepts.iter_mut().enumerate() {
        concept
            .validate()
            .map_err(|e| LecSlideError::generation(Artifact::Concepts, e))?;
        if concept.id.trim().is_empty() {
            concept.id = format!("c{}-{}", slide_id, n + 1);
        }
    }
    Ok(concepts)
}

/// Practice questions; missing ids become `q{slide}-{n}`.
pub fn parse_questions(raw: &str, slide_id: u32) -> Result<Vec<Question>, LecSlideError> {
    let mut questions: Vec<Question> = decode(raw, JsonKind::Array, Artifact::Questions)?;
    if questions.is_empty() {
        return Err(LecSlideError::generation(Artifact::Questions, "response listed no questions"));
    }
    for (n, question) in questions.iter_mut().enumerate() {
        question
            .validate()
            .map_err(|e| LecSlideError::generation(Artifact::Questions, e))?;
        if question.id.trim().is_empty() {
            question.id = format!("q{}-{}", slide_id, n + 1);
        }
    }
    Ok(questions)
}

/// Flowchart visual aid.
pub fn parse_visual_aid(raw: &str) -> Result<VisualAid, LecSlideError> {
    let aid: VisualAid = decode(raw, JsonKind::Object, Artifact::VisualAid)?;
    aid.validate()
        .map_err(|e| LecSlideError::generation(Artifact::VisualAid, e))?;
    Ok(aid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;

    fn artifact_of(err: LecSlideError) -> Artifact {
        match err {
            LecSlideError::Generation { artifact, .. } => artifact,
            other => panic!("expected a generation error, got {other:?}"),
        }
    }

    #[test]
    fn strips_fences_with_language_tag() {
        let raw = "Sure!\n```json\n{\"a\": 1}\n```\nHope this helps.";
        assert_eq!(strip_code_fences(raw).trim(), "{\"a\": 1}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn extract_json_skips_brackets_in_strings() {
        let text = r#"Here you go: {"summary": "uses } and { freely", "keyPoints": []} trailing"#;
        assert_eq!(
            extract_json(text, JsonKind::Object),
            Some(r#"{"summary": "uses } and { freely", "keyPoints": []}"#)
        );
    }

    #[test]
    fn extract_json_handles_escaped_quotes() {
        let text = r#"[{"name": "say \"hi\" ]", "definition": "d"}]"#;
        assert_eq!(extract_json(text, JsonKind::Array), Some(text));
    }

    #[test]
    fn extract_json_none_when_unbalanced() {
        assert_eq!(extract_json(r#"{"summary": "cut off"#, JsonKind::Object), None);
    }

    #[test]
    fn summary_decodes_from_fenced_response() {
        let raw = "```json\n{\"summary\": \" An overview. \", \"keyPoints\": [\"a\", \"\", \"b\"]}\n```";
        let s = parse_summary(raw).unwrap();
        assert_eq!(s.summary, "An overview.");
        assert_eq!(s.key_points, vec!["a", "b"]);
    }

    #[test]
    fn prose_only_response_fails_closed() {
        let err = parse_summary("I'm sorry, I can't help with that.").unwrap_err();
        assert_eq!(artifact_of(err), Artifact::Summary);
    }

    #[test]
    fn wrong_shape_fails_closed() {
        let err = parse_summary(r#"{"text": "no summary field"}"#).unwrap_err();
        assert_eq!(artifact_of(err), Artifact::Summary);
    }

    #[test]
    fn concept_ids_are_filled_deterministically() {
        let raw = r#"[{"name": "Algorithm", "definition": "A finite sequence of steps"},
                      {"id": "given", "name": "Complexity", "definition": "Resource usage"}]"#;
        let concepts = parse_concepts(raw, 3).unwrap();
        assert_eq!(concepts[0].id, "c3-1");
        assert_eq!(concepts[1].id, "given");
    }

    #[test]
    fn blank_concept_name_is_rejected() {
        let err = parse_concepts(r#"[{"name": " ", "definition": "d"}]"#, 1).unwrap_err();
        assert_eq!(artifact_of(err), Artifact::Concepts);
    }

    #[test]
    fn questions_decode_both_kinds() {
        let raw = r#"[
            {"type": "multiple-choice", "question": "Which is O(log n)?", "options": ["Linear", "Binary", "Bubble", "Bogo"], "correctAnswer": 1},
            {"type": "true-false", "question": "Merge sort is stable.", "correctAnswer": true}
        ]"#;
        let qs = parse_questions(raw, 2).unwrap();
        assert_eq!(qs[0].id, "q2-1");
        assert_eq!(qs[1].id, "q2-2");
        assert!(matches!(qs[0].kind, QuestionKind::MultipleChoice { correct_answer: 1, .. }));
        assert_eq!(qs[1].kind, QuestionKind::TrueFalse { correct_answer: true });
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        let raw = r#"[{"type": "multiple-choice", "question": "?", "options": ["a", "b"], "correctAnswer": 5}]"#;
        let err = parse_questions(raw, 1).unwrap_err();
        assert_eq!(artifact_of(err), Artifact::Questions);
    }

    #[test]
    fn empty_question_list_is_rejected() {
        assert!(parse_questions("[]", 1).is_err());
    }

    #[test]
    fn flowchart_with_dangling_edge_is_rejected() {
        let raw = r#"{"type": "flowchart", "data": {"nodes": [{"id": "a", "label": "A"}], "edges": [{"from": "a", "to": "b"}]}}"#;
        let err = parse_visual_aid(raw).unwrap_err();
        assert_eq!(artifact_of(err), Artifact::VisualAid);
    }

    #[test]
    fn flowchart_decodes() {
        let raw = r#"Flowchart:
{"type": "flowchart", "data": {"nodes": [{"id": "a", "label": "Start"}, {"id": "b", "label": "End"}], "edges": [{"from": "a", "to": "b"}]}}"#;
        let VisualAid::Flowchart(chart) = parse_visual_aid(raw).unwrap();
        assert_eq!(chart.nodes.len(), 2);
        assert_eq!(chart.edges.len(), 1);
    }
}
