//! DOCX export: a minimal WordprocessingML package.
//!
//! Parts written:
//!
//! | part                     | contents                               |
//! |--------------------------|----------------------------------------|
//! | `[Content_Types].xml`    | defaults and overrides                 |
//! | `_rels/.rels`            | officeDocument and core-properties rels |
//! | `docProps/core.xml`      | deck title and subject                 |
//! | `word/document.xml`      | one paragraph per layout block         |
//!
//! Formatting is applied directly on runs (bold, size) so no styles part is
//! needed. Slides are separated by page breaks.

use super::layout::{layout, Block};
use super::ExportFormat;
use crate::error::LecSlideError;
use crate::model::SlideData;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

/// Run formatting: bold flag and size in half-points.
#[derive(Clone, Copy)]
struct Run {
    bold: bool,
    half_points: u32,
}

const TITLE: Run = Run { bold: true, half_points: 40 };
const HEADING: Run = Run { bold: true, half_points: 30 };
const SECTION: Run = Run { bold: true, half_points: 24 };
const STRONG: Run = Run { bold: true, half_points: 22 };
const BODY: Run = Run { bold: false, half_points: 22 };

/// Render a deck as DOCX bytes.
pub fn render(data: &SlideData) -> Result<Vec<u8>, LecSlideError> {
    let document = document_xml(&layout(data))?;
    let core = core_xml(data)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("docProps/core.xml", core.as_slice()),
        ("word/document.xml", document.as_slice()),
    ] {
        zip.start_file(name, options).map_err(fail)?;
        zip.write_all(body).map_err(fail)?;
    }

    Ok(zip.finish().map_err(fail)?.into_inner())
}

fn fail(e: impl std::fmt::Display) -> LecSlideError {
    ExportFormat::Docx.error(e.to_string())
}

fn document_xml(blocks: &[Block]) -> Result<Vec<u8>, LecSlideError> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(fail)?;
    w.write_event(Event::Start(
        BytesStart::new("w:document").with_attributes([("xmlns:w", NS_W)]),
    ))
    .map_err(fail)?;
    w.write_event(Event::Start(BytesStart::new("w:body"))).map_err(fail)?;

    for (i, block) in blocks.iter().enumerate() {
        match block {
            Block::Title(t) => paragraph(&mut w, 0, &[(TITLE, t.as_str())])?,
            Block::Meta(t) => paragraph(&mut w, 0, &[(BODY, t.as_str())])?,
            Block::SlideHeading(t) => paragraph(&mut w, 0, &[(HEADING, t.as_str())])?,
            Block::Section(t) => paragraph(&mut w, 0, &[(SECTION, *t)])?,
            Block::Paragraph(t) => paragraph(&mut w, 0, &[(BODY, t.as_str())])?,
            Block::Bullet(t) => paragraph(&mut w, 360, &[(BODY, format!("• {t}").as_str())])?,
            Block::Concept { name, definition } => paragraph(
                &mut w,
                360,
                &[(STRONG, format!("{name}: ").as_str()), (BODY, definition.as_str())],
            )?,
            Block::Question(t) => paragraph(&mut w, 0, &[(STRONG, t.as_str())])?,
            Block::Choice { text, correct } => {
                if *correct {
                    paragraph(&mut w, 720, &[(STRONG, format!("{text} ✓").as_str())])?
                } else {
                    paragraph(&mut w, 720, &[(BODY, text.as_str())])?
                }
            }
            Block::Answer(value) => paragraph(
                &mut w,
                720,
                &[(BODY, "Answer: "), (STRONG, if *value { "True" } else { "False" })],
            )?,
            Block::Rule => {
                if i + 1 < blocks.len() {
                    page_break(&mut w)?;
                }
            }
        }
    }

    w.write_event(Event::End(BytesEnd::new("w:body"))).map_err(fail)?;
    w.write_event(Event::End(BytesEnd::new("w:document"))).map_err(fail)?;
    Ok(w.into_inner())
}

fn paragraph(w: &mut Writer<Vec<u8>>, indent_twips: u32, runs: &[(Run, &str)]) -> Result<(), LecSlideError> {
    w.write_event(Event::Start(BytesStart::new("w:p"))).map_err(fail)?;
    if indent_twips > 0 {
        let left = indent_twips.to_string();
        w.write_event(Event::Start(BytesStart::new("w:pPr"))).map_err(fail)?;
        w.write_event(Event::Empty(
            BytesStart::new("w:ind").with_attributes([("w:left", left.as_str())]),
        ))
        .map_err(fail)?;
        w.write_event(Event::End(BytesEnd::new("w:pPr"))).map_err(fail)?;
    }

    for (style, text) in runs {
        let size = style.half_points.to_string();
        w.write_event(Event::Start(BytesStart::new("w:r"))).map_err(fail)?;
        w.write_event(Event::Start(BytesStart::new("w:rPr"))).map_err(fail)?;
        if style.bold {
            w.write_event(Event::Empty(BytesStart::new("w:b"))).map_err(fail)?;
        }
        w.write_event(Event::Empty(
            BytesStart::new("w:sz").with_attributes([("w:val", size.as_str())]),
        ))
        .map_err(fail)?;
        w.write_event(Event::End(BytesEnd::new("w:rPr"))).map_err(fail)?;
        w.write_event(Event::Start(
            BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
        ))
        .map_err(fail)?;
        w.write_event(Event::Text(BytesText::new(&xml_chars(text)))).map_err(fail)?;
        w.write_event(Event::End(BytesEnd::new("w:t"))).map_err(fail)?;
        w.write_event(Event::End(BytesEnd::new("w:r"))).map_err(fail)?;
    }

    w.write_event(Event::End(BytesEnd::new("w:p"))).map_err(fail)?;
    Ok(())
}

/// Drop characters XML 1.0 cannot carry at all (C0 controls other than tab,
/// newline and carriage return, and the U+FFFE/U+FFFF non-characters).
/// Escaping cannot help here: Word rejects them even as references.
fn xml_chars(text: &str) -> Cow<'_, str> {
    let allowed = |c: char| match c {
        '\t' | '\n' | '\r' => true,
        '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => false,
        _ => true,
    };
    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| allowed(c)).collect())
    }
}

fn page_break(w: &mut Writer<Vec<u8>>) -> Result<(), LecSlideError> {
    w.write_event(Event::Start(BytesStart::new("w:p"))).map_err(fail)?;
    w.write_event(Event::Start(BytesStart::new("w:r"))).map_err(fail)?;
    w.write_event(Event::Empty(
        BytesStart::new("w:br").with_attributes([("w:type", "page")]),
    ))
    .map_err(fail)?;
    w.write_event(Event::End(BytesEnd::new("w:r"))).map_err(fail)?;
    w.write_event(Event::End(BytesEnd::new("w:p"))).map_err(fail)?;
    Ok(())
}

fn core_xml(data: &SlideData) -> Result<Vec<u8>, LecSlideError> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(fail)?;
    w.write_event(Event::Start(BytesStart::new("cp:coreProperties").with_attributes([
        (
            "xmlns:cp",
            "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
        ),
        ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
    ])))
    .map_err(fail)?;
    for (tag, value) in [
        ("dc:title", data.title.as_str()),
        ("dc:subject", data.subject.as_str()),
        ("dc:creator", "LecSlide"),
    ] {
        w.write_event(Event::Start(BytesStart::new(tag))).map_err(fail)?;
        w.write_event(Event::Text(BytesText::new(&xml_chars(value)))).map_err(fail)?;
        w.write_event(Event::End(BytesEnd::new(tag))).map_err(fail)?;
    }
    w.write_event(Event::End(BytesEnd::new("cp:coreProperties")))
        .map_err(fail)?;
    Ok(w.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::sample_deck;
    use quick_xml::Reader;
    use std::io::Read;
    use zip::ZipArchive;

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    /// Concatenated `w:t` text, one entry per paragraph.
    fn paragraphs(xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut out = Vec::new();
        let mut current = String::new();
        let mut in_text = false;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
                Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
                Event::Text(t) if in_text => current.push_str(&t.unescape().unwrap()),
                Event::End(e) if e.name().as_ref() == b"w:p" => {
                    out.push(std::mem::take(&mut current))
                }
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn package_has_required_parts() {
        let bytes = render(&sample_deck()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for required in ["[Content_Types].xml", "_rels/.rels", "word/document.xml", "docProps/core.xml"] {
            assert!(names.contains(&required), "missing {required}");
        }
    }

    #[test]
    fn document_carries_slides_in_order() {
        let bytes = render(&sample_deck()).unwrap();
        let text = paragraphs(&part(&bytes, "word/document.xml"));

        assert_eq!(text[0], "Test Presentation");
        let first = text.iter().position(|t| t == "Slide 1: Test Slide 1").unwrap();
        let second = text.iter().position(|t| t == "Slide 2: Test Slide 2").unwrap();
        assert!(first < second);
        assert!(text.contains(&"Concept 1: Definition of concept 1".to_string()));
        assert!(text.contains(&"Option 3 ✓".to_string()));
        assert!(text.contains(&"Answer: True".to_string()));
        assert!(text.contains(&"• Node 1 → Node 2".to_string()));
    }

    #[test]
    fn text_is_xml_escaped() {
        let mut deck = sample_deck();
        deck.slides[0].summary = "a < b & c".into();
        let bytes = render(&deck).unwrap();
        let xml = part(&bytes, "word/document.xml");
        assert!(xml.contains("a &lt; b &amp; c"));
        assert!(paragraphs(&xml).contains(&"a < b & c".to_string()));
    }

    #[test]
    fn control_characters_are_dropped() {
        let mut deck = sample_deck();
        deck.title = "Deck\u{1}".into();
        deck.slides[0].content = "Line\u{1}one\u{8}\u{c}\ttabbed".into();
        let bytes = render(&deck).unwrap();

        let document = part(&bytes, "word/document.xml");
        assert!(!document.contains('\u{1}'));
        assert!(!document.contains('\u{8}'));
        assert!(!document.contains('\u{c}'));
        assert!(paragraphs(&document).contains(&"Lineone\ttabbed".to_string()));
        assert!(!part(&bytes, "docProps/core.xml").contains('\u{1}'));
    }

    #[test]
    fn xml_chars_borrows_clean_text() {
        assert!(matches!(xml_chars("plain → text"), Cow::Borrowed(_)));
        assert_eq!(xml_chars("a\u{1f}b\u{ffff}c\r\n"), "abc\r\n");
    }

    #[test]
    fn core_properties_name_the_deck() {
        let bytes = render(&sample_deck()).unwrap();
        let core = part(&bytes, "docProps/core.xml");
        assert!(core.contains("<dc:title>Test Presentation</dc:title>"));
        assert!(core.contains("<dc:subject>Testing</dc:subject>"));
    }
}
