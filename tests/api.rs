//! HTTP API tests: the full router driven through axum-test with a scripted
//! text generator, so no network or API key is needed.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use lecslide::{
    router, AppState, BackendError, ServerConfig, SessionStore, StudyConfig, TextGenerator,
};
use serde_json::{json, Value};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Canned JSON for each of the four requests, keyed off the prompt text.
#[derive(Default)]
struct Scripted {
    fail_questions: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for Scripted {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("keyPoints") {
            Ok(format!(
                r#"{{"summary": "Fresh summary {n}.", "keyPoints": ["Point A", "Point B"]}}"#
            ))
        } else if prompt.contains("key concepts") {
            Ok(r#"[{"name": "Invariant", "definition": "A property that always holds."}]"#.into())
        } else if prompt.contains("practice questions") {
            if self.fail_questions {
                return Err(BackendError("quota exceeded".into()));
            }
            Ok(r#"Here you go:
```json
[{"type": "true-false", "question": "Binary search needs sorted input.", "correctAnswer": true}]
```"#
                .into())
        } else {
            Ok(r#"{"type": "flowchart", "data": {"nodes": [{"id": "a", "label": "Split"}, {"id": "b", "label": "Search half"}], "edges": [{"from": "a", "to": "b"}]}}"#.into())
        }
    }
}

/// Never answers; keeps uploaded sessions in `processing`.
struct Stalled;

#[async_trait]
impl TextGenerator for Stalled {
    async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
        std::future::pending().await
    }
}

fn server_with(generator: Option<Arc<dyn TextGenerator>>, fixtures: bool) -> TestServer {
    let config = ServerConfig {
        fixtures,
        ..ServerConfig::default()
    };
    server_with_config(config, generator).0
}

fn server_with_config(
    config: ServerConfig,
    generator: Option<Arc<dyn TextGenerator>>,
) -> (TestServer, SessionStore) {
    let study = StudyConfig::builder()
        .api_timeout_secs(0)
        .build()
        .unwrap();
    let state = AppState::new(config, study, generator);
    let sessions = state.sessions.clone();
    (TestServer::new(router(state)).unwrap(), sessions)
}

fn server() -> TestServer {
    server_with(Some(Arc::new(Scripted::default())), true)
}

/// A two-slide .pptx built in memory.
fn pptx() -> Vec<u8> {
    let slide = |title: &str, body: &str| {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>{title}</a:t></a:r></a:p></p:txBody></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Body"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:txBody><a:p><a:r><a:t>{body}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
        )
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default();
    let parts = [
        (
            "ppt/presentation.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/></p:sldIdLst></p:presentation>"#.to_string(),
        ),
        (
            "ppt/_rels/presentation.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide2.xml"/></Relationships>"#.to_string(),
        ),
        ("ppt/slides/slide1.xml", slide("Binary Search", "Halve the range each step")),
        ("ppt/slides/slide2.xml", slide("Complexity", "O(log n) comparisons")),
    ];
    for (name, body) in parts {
        zip.start_file(name, opts).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn upload_form(bytes: Vec<u8>, file_name: &str, mime: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("subject", "Algorithms")
        .add_part("file", Part::bytes(bytes).file_name(file_name).mime_type(mime))
}

/// Poll a session until it stops answering 202.
async fn wait_ready(server: &TestServer, session_id: &str) -> axum_test::TestResponse {
    for _ in 0..200 {
        let res = server.get(&format!("/api/slides/{session_id}")).await;
        if res.status_code() != StatusCode::ACCEPTED {
            return res;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session {session_id} never finished processing");
}

// ── Health ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_version() {
    let server = server();
    for path in ["/health", "/api/health"] {
        let res = server.get(path).await;
        res.assert_status_ok();
        let body: Value = res.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}

// ── Upload ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_then_poll_until_ready() {
    let server = server();
    let res = server
        .post("/api/slides/upload")
        .multipart(upload_form(pptx(), "week3-search.pptx", PPTX))
        .await;
    res.assert_status_ok();
    let body: Value = res.json();
    assert_eq!(body["status"], "processing");
    assert_eq!(body["message"], "File uploaded successfully. Processing started.");
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let res = wait_ready(&server, &session_id).await;
    res.assert_status_ok();
    let deck: Value = res.json();
    assert_eq!(deck["title"], "week3-search");
    assert_eq!(deck["subject"], "Algorithms");
    assert_eq!(deck["slideCount"], 2);
    assert_eq!(deck["slides"][0]["title"], "Binary Search");
    assert_eq!(deck["slides"][1]["title"], "Complexity");
    assert_eq!(deck["slides"][0]["keyPoints"], json!(["Point A", "Point B"]));
    assert_eq!(deck["slides"][0]["questions"][0]["type"], "true-false");
    assert_eq!(deck["slides"][0]["visualAid"]["type"], "flowchart");
}

#[tokio::test]
async fn upload_infers_type_from_file_name() {
    let server = server();
    let res = server
        .post("/api/slides/upload")
        .multipart(upload_form(pptx(), "deck.pptx", "application/octet-stream"))
        .await;
    res.assert_status_ok();
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let server = server();
    let res = server
        .post("/api/slides/upload")
        .multipart(MultipartForm::new().add_text("subject", "Algorithms"))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = res.json();
    assert_eq!(body["message"], "No file uploaded");
    assert!(body.get("sessionId").is_none());
}

#[tokio::test]
async fn upload_of_empty_file_is_rejected() {
    let server = server();
    let res = server
        .post("/api/slides/upload")
        .multipart(upload_form(Vec::new(), "deck.pptx", PPTX))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_of_unsupported_type_is_rejected() {
    let generator = Arc::new(Scripted::default());
    let server = server_with(Some(generator.clone()), true);
    let res = server
        .post("/api/slides/upload")
        .multipart(upload_form(b"plain text".to_vec(), "notes.txt", "text/plain"))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = res.json();
    assert_eq!(body["error"], "unsupported_file_type");
    assert_eq!(
        body["message"],
        "Invalid file type. Please upload a PDF or PowerPoint file."
    );
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upload_of_corrupt_deck_is_an_extraction_error() {
    let server = server();
    let res = server
        .post("/api/slides/upload")
        .multipart(upload_form(b"not a zip".to_vec(), "deck.pptx", PPTX))
        .await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json();
    assert_eq!(body["error"], "extraction_failed");
}

#[tokio::test]
async fn upload_without_provider_is_unavailable() {
    let server = server_with(None, true);
    let res = server
        .post("/api/slides/upload")
        .multipart(upload_form(pptx(), "deck.pptx", PPTX))
        .await;
    assert_eq!(res.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn failed_enhancement_marks_the_session_failed() {
    let generator = Arc::new(Scripted {
        fail_questions: true,
        ..Default::default()
    });
    let server = server_with(Some(generator), false);
    let res = server
        .post("/api/slides/upload")
        .multipart(upload_form(pptx(), "deck.pptx", PPTX))
        .await;
    let body: Value = res.json();
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let res = wait_ready(&server, &session_id).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json();
    assert_eq!(body["error"], "processing_failed");
}

#[tokio::test]
async fn processing_sessions_answer_202_and_refuse_export() {
    let server = server_with(Some(Arc::new(Stalled)), false);
    let res = server
        .post("/api/slides/upload")
        .multipart(upload_form(pptx(), "deck.pptx", PPTX))
        .await;
    let body: Value = res.json();
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let res = server.get(&format!("/api/slides/{session_id}")).await;
    assert_eq!(res.status_code(), StatusCode::ACCEPTED);
    let body: Value = res.json();
    assert_eq!(body["status"], "processing");
    assert_eq!(body["sessionId"], session_id.as_str());

    let res = server.get(&format!("/api/slides/{session_id}/export")).await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);
}

// ── Sessions ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_sessions_serve_the_demo_deck() {
    let server = server();
    let res = server.get("/api/slides/demo-123").await;
    res.assert_status_ok();
    let deck: Value = res.json();
    assert_eq!(deck["title"], "Introduction to Computer Science");
    assert_eq!(deck["slideCount"], 2);
    assert_eq!(deck["slides"][0]["questions"][0]["correctAnswer"], 1);
    assert_eq!(deck["slides"][0]["questions"][1]["correctAnswer"], false);
}

#[tokio::test]
async fn invalid_sessions_are_not_found() {
    let server = server();
    let res = server.get("/api/slides/invalid-session").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    let body: Value = res.json();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn browsing_fixture_sessions_stores_nothing() {
    let (server, sessions) = server_with_config(ServerConfig::default(), None);
    for n in 0..20 {
        server.get(&format!("/api/slides/browse-{n}")).await.assert_status_ok();
        server.get(&format!("/api/slides/browse-{n}/export")).await.assert_status_ok();
        server.get(&format!("/api/download/browse-{n}.md")).await.assert_status_ok();
    }
    assert!(sessions.is_empty());

    server
        .patch("/api/slides/browse-0/1")
        .json(&json!({"summary": "Kept."}))
        .await
        .assert_status_ok();
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn unknown_sessions_are_not_found_without_fixtures() {
    let server = server_with(Some(Arc::new(Scripted::default())), false);
    let res = server.get("/api/slides/demo-123").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

// ── Slide edits and regeneration ─────────────────────────────────────────────

#[tokio::test]
async fn patch_updates_only_the_given_fields() {
    let server = server();
    let res = server
        .patch("/api/slides/s1/1")
        .json(&json!({"summary": "My own words.", "keyPoints": ["One", "Two"]}))
        .await;
    res.assert_status_ok();
    let slide: Value = res.json();
    assert_eq!(slide["summary"], "My own words.");
    assert_eq!(slide["title"], "Introduction to Algorithms");

    let deck: Value = server.get("/api/slides/s1").await.json();
    assert_eq!(deck["slides"][0]["keyPoints"], json!(["One", "Two"]));
}

#[tokio::test]
async fn invalid_patch_is_rejected_without_changes() {
    let server = server();
    let res = server
        .patch("/api/slides/s2/1")
        .json(&json!({
            "summary": "Should not stick.",
            "questions": [{"type": "multiple-choice", "question": "Q?", "options": ["a", "b"], "correctAnswer": 5}]
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

    let deck: Value = server.get("/api/slides/s2").await.json();
    assert_ne!(deck["slides"][0]["summary"], "Should not stick.");
}

#[tokio::test]
async fn malformed_patch_bodies_get_json_errors() {
    let server = server();

    let res = server
        .patch("/api/slides/b1/1")
        .json(&json!({"questions": "not a list"}))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json();
    assert_eq!(body["error"], "invalid_body");
    assert!(!body["message"].as_str().unwrap().is_empty());

    let res = server.patch("/api/slides/b1/1").text("summary=plain").await;
    assert_eq!(res.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = res.json();
    assert_eq!(body["error"], "unsupported_media_type");
}

#[tokio::test]
async fn upload_without_multipart_body_gets_json_error() {
    let server = server();
    let res = server
        .post("/api/slides/upload")
        .json(&json!({"file": "deck.pptx"}))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = res.json();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn upload_over_the_limit_is_payload_too_large() {
    let config = ServerConfig {
        max_upload_bytes: 1024,
        ..ServerConfig::default()
    };
    let (server, sessions) = server_with_config(config, Some(Arc::new(Scripted::default())));
    let res = server
        .post("/api/slides/upload")
        .multipart(upload_form(vec![b'x'; 64 * 1024], "deck.pptx", PPTX))
        .await;
    assert_eq!(res.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = res.json();
    assert_eq!(body["error"], "payload_too_large");
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn unknown_routes_get_json_errors() {
    let server = server();
    let res = server.get("/api/nothing-here").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    let body: Value = res.json();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn patch_of_unknown_slide_is_not_found() {
    let server = server();
    let res = server
        .patch("/api/slides/s3/42")
        .json(&json!({"summary": "x"}))
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    let res = server
        .patch("/api/slides/s3/first")
        .json(&json!({"summary": "x"}))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn regenerate_summary_replaces_summary_and_key_points() {
    let server = server();
    let before: Value = server.get("/api/slides/r1").await.json();

    let res = server.post("/api/slides/r1/2/regenerate-summary").await;
    res.assert_status_ok();
    let slide: Value = res.json();
    assert!(slide["summary"].as_str().unwrap().starts_with("Fresh summary"));
    assert_eq!(slide["keyPoints"], json!(["Point A", "Point B"]));
    assert_eq!(slide["questions"], before["slides"][1]["questions"]);
    assert_eq!(slide["concepts"], before["slides"][1]["concepts"]);

    let after: Value = server.get("/api/slides/r1").await.json();
    assert_eq!(after["slides"][1]["summary"], slide["summary"]);
}

#[tokio::test]
async fn regenerate_questions_and_visual() {
    let server = server();
    let slide: Value = server
        .post("/api/slides/r2/1/regenerate-questions")
        .await
        .json();
    assert_eq!(slide["questions"].as_array().unwrap().len(), 1);
    assert_eq!(slide["questions"][0]["id"], "q1-1");

    let slide: Value = server.post("/api/slides/r2/1/regenerate-visual").await.json();
    assert_eq!(slide["visualAid"]["data"]["nodes"][1]["label"], "Search half");
    assert_eq!(slide["questions"][0]["id"], "q1-1");
}

#[tokio::test]
async fn regenerate_failure_names_the_artifact() {
    let generator = Arc::new(Scripted {
        fail_questions: true,
        ..Default::default()
    });
    let server = server_with(Some(generator), true);
    let res = server.post("/api/slides/r3/1/regenerate-questions").await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json();
    assert_eq!(body["error"], "generation_failed");
    assert!(body["message"].as_str().unwrap().contains("questions"));
}

// ── Export and download ──────────────────────────────────────────────────────

#[tokio::test]
async fn export_defaults_to_pdf() {
    let server = server();
    let body: Value = server.get("/api/slides/e1/export").await.json();
    assert_eq!(body["url"], "/api/download/e1.pdf");
    assert_eq!(body["fileName"], "lecture_notes_e1.pdf");
    assert_eq!(body["fileType"], "application/pdf");

    let body: Value = server
        .get("/api/slides/e1/export")
        .add_query_param("format", "epub")
        .await
        .json();
    assert_eq!(body["fileType"], "application/pdf");
}

#[tokio::test]
async fn export_markdown_and_docx_links() {
    let server = server();
    let body: Value = server
        .get("/api/slides/e2/export")
        .add_query_param("format", "markdown")
        .await
        .json();
    assert_eq!(body["url"], "/api/download/e2.md");
    assert_eq!(body["fileType"], "text/markdown");

    let body: Value = server
        .get("/api/slides/e2/export")
        .add_query_param("format", "docx")
        .await
        .json();
    assert_eq!(body["fileName"], "lecture_notes_e2.docx");
    assert_eq!(
        body["fileType"],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
}

#[tokio::test]
async fn export_of_invalid_session_is_not_found() {
    let server = server();
    let res = server.get("/api/slides/invalid-9/export").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_markdown_renders_the_session() {
    let server = server();
    server
        .patch("/api/slides/d1/1")
        .json(&json!({"title": "Edited Title"}))
        .await
        .assert_status_ok();

    let res = server.get("/api/download/d1.md").await;
    res.assert_status_ok();
    assert_eq!(res.header("content-type"), "text/markdown; charset=utf-8");
    assert_eq!(
        res.header("content-disposition"),
        "attachment; filename=\"d1.md\""
    );
    let md = res.text();
    assert!(md.starts_with("# Introduction to Computer Science"));
    assert!(md.contains("## Slide 1: Edited Title"));
    assert!(md.contains("## Slide 2: Types of Algorithms"));
    assert!(md.contains("✓ A step-by-step procedure for solving problems ✓"));
    assert!(md.contains("Answer: False"));
}

#[tokio::test]
async fn download_html_and_docx() {
    let server = server();
    let res = server.get("/api/download/d2.html").await;
    res.assert_status_ok();
    assert!(res.text().contains("<li class=\"correct\">Storage algorithm ✓</li>"));

    let res = server.get("/api/download/d2.docx").await;
    res.assert_status_ok();
    assert!(res.as_bytes().starts_with(b"PK"));
}

#[tokio::test]
async fn download_with_unknown_extension_is_rejected() {
    let server = server();
    let res = server.get("/api/download/d3.exe").await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    let res = server.get("/api/download/noextension").await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}
