//! PPTX (Office Open XML) text extraction.
//!
//! Slide order comes from `ppt/presentation.xml` (`<p:sldIdLst>`), resolved
//! through `ppt/_rels/presentation.xml.rels`. Decks missing the list fall back
//! to the relationship targets sorted by slide number.
//!
//! Within a slide every `<p:sp>` shape becomes one text block positioned by
//! its `<a:off>`. The title is the `title`/`ctrTitle` placeholder when there is
//! one, otherwise the top-most block.

use super::SlideFormat;
use crate::error::LecSlideError;
use crate::model::ExtractedSlide;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_REL_TYPE_SUFFIX: &str = "/relationships/slide";

/// Largest inflated size accepted for a single XML part.
const MAX_PART_BYTES: u64 = 16 * 1024 * 1024;
/// Largest inflated size accepted for all slide parts together.
const MAX_DECK_BYTES: u64 = 128 * 1024 * 1024;

fn err(detail: impl Into<String>) -> LecSlideError {
    SlideFormat::Pptx.error(detail)
}

/// Extract every slide, in presentation order.
pub fn extract(bytes: &[u8]) -> Result<Vec<ExtractedSlide>, LecSlideError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| err(format!("not a zip archive: {e}")))?;

    let order = slide_order(&mut archive)?;
    let mut slides = Vec::with_capacity(order.len());
    let mut budget = MAX_DECK_BYTES;
    for (idx, path) in order.iter().enumerate() {
        let xml = read_part_limited(&mut archive, path, MAX_PART_BYTES.min(budget))?;
        budget -= xml.len() as u64;
        let blocks = parse_slide_xml(&xml).map_err(|e| err(format!("{path}: {e}")))?;
        slides.push(assemble(blocks, idx + 1));
    }
    Ok(slides)
}

/// Slide part paths (`ppt/slides/slideN.xml`) in presentation order.
fn slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>, LecSlideError> {
    let rels_xml = read_part(archive, PRESENTATION_RELS)?;
    let rels = parse_slide_relationships(&rels_xml)?;

    let listed = match read_part(archive, PRESENTATION_PART) {
        Ok(xml) => parse_slide_id_list(&xml)?,
        Err(_) => Vec::new(),
    };

    let mut ordered: Vec<String> = listed
        .iter()
        .filter_map(|rid| rels.get(rid))
        .map(|target| resolve_target(target))
        .collect();

    if ordered.is_empty() {
        let mut by_number: Vec<(Option<usize>, String)> = rels
            .values()
            .map(|t| (trailing_number(t), resolve_target(t)))
            .collect();
        by_number.sort();
        ordered = by_number.into_iter().map(|(_, path)| path).collect();
    }

    Ok(ordered)
}

/// `rId → target` for slide relationships only (layouts and masters excluded).
fn parse_slide_relationships(xml: &str) -> Result<HashMap<String, String>, LecSlideError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = attr(e, b"Id");
                let target = attr(e, b"Target");
                let rel_type = attr(e, b"Type");
                if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                    if rel_type.ends_with(SLIDE_REL_TYPE_SUFFIX) {
                        rels.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(err(format!("{PRESENTATION_RELS}: {e}"))),
            _ => {}
        }
    }
    Ok(rels)
}

/// Relationship ids from `<p:sldIdLst>`, in order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>, LecSlideError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"sldId" =>
            {
                // `r:id`, namespaced; the bare `id` is the numeric slide id.
                let rid = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() != b"id" && a.key.local_name().as_ref() == b"id")
                    .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                if let Some(rid) = rid {
                    ids.push(rid);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(err(format!("{PRESENTATION_PART}: {e}"))),
            _ => {}
        }
    }
    Ok(ids)
}

/// A shape's text with its position on the slide, in EMUs.
#[derive(Debug, Default)]
struct TextBlock {
    text: String,
    x: i64,
    y: i64,
    positioned: bool,
    is_title: bool,
}

fn parse_slide_xml(xml: &str) -> Result<Vec<TextBlock>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    // Leading and trailing spaces inside runs are significant.
    reader.trim_text(false);

    let mut blocks = Vec::new();
    let mut current: Option<TextBlock> = None;
    let mut in_run_text = false;
    let mut paragraph_has_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"sp" => current = Some(TextBlock::default()),
                b"t" => in_run_text = true,
                b"p" => paragraph_has_text = false,
                b"off" => set_offset(current.as_mut(), e),
                b"ph" => set_placeholder(current.as_mut(), e),
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"off" => set_offset(current.as_mut(), e),
                b"ph" => set_placeholder(current.as_mut(), e),
                b"br" => {
                    if let Some(block) = current.as_mut() {
                        block.text.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(ref e) if in_run_text => {
                if let Some(block) = current.as_mut() {
                    block.text.push_str(&e.unescape()?);
                    paragraph_has_text = true;
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => {
                    if let (Some(block), true) = (current.as_mut(), paragraph_has_text) {
                        block.text.push('\n');
                    }
                }
                b"sp" => {
                    if let Some(mut block) = current.take() {
                        block.text = block.text.trim().to_string();
                        if !block.text.is_empty() {
                            blocks.push(block);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(blocks)
}

fn set_offset(block: Option<&mut TextBlock>, e: &BytesStart<'_>) {
    let Some(block) = block else { return };
    // Only the shape's own transform counts, not nested text-frame offsets.
    if block.positioned {
        return;
    }
    let parse = |key: &[u8]| attr(e, key).and_then(|v| v.parse::<i64>().ok());
    if let (Some(x), Some(y)) = (parse(b"x"), parse(b"y")) {
        block.x = x;
        block.y = y;
        block.positioned = true;
    }
}

fn set_placeholder(block: Option<&mut TextBlock>, e: &BytesStart<'_>) {
    if let Some(block) = block {
        if matches!(attr(e, b"type").as_deref(), Some("title") | Some("ctrTitle")) {
            block.is_title = true;
        }
    }
}

/// Pick the title, order the rest top-to-bottom then left-to-right.
fn assemble(mut blocks: Vec<TextBlock>, position: usize) -> ExtractedSlide {
    blocks.sort_by_key(|b| (b.y, b.x));

    let title_idx = blocks
        .iter()
        .position(|b| b.is_title)
        .or_else(|| (!blocks.is_empty()).then_some(0));

    let title = match title_idx {
        Some(i) => {
            let block = blocks.remove(i);
            block
                .text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        }
        None => String::new(),
    };

    let content = blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if title.is_empty() {
        ExtractedSlide::new(format!("Slide {position}"), content)
    } else {
        ExtractedSlide::new(title, content)
    }
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<String, LecSlideError> {
    read_part_limited(archive, path, MAX_PART_BYTES)
}

/// Read a part, refusing anything that inflates past `limit` bytes. The
/// declared size is checked first, then the stream itself is capped since
/// the header can lie.
fn read_part_limited<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
    limit: u64,
) -> Result<String, LecSlideError> {
    let file = archive
        .by_name(path)
        .map_err(|e| err(format!("missing part '{path}': {e}")))?;
    let too_large = || err(format!("part '{path}' inflates past {limit} bytes"));
    if file.size() > limit {
        return Err(too_large());
    }

    let mut content = String::new();
    file.take(limit + 1)
        .read_to_string(&mut content)
        .map_err(|e| err(format!("failed to read '{path}': {e}")))?;
    if content.len() as u64 > limit {
        return Err(too_large());
    }
    Ok(content)
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Relationship targets are relative to `ppt/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(abs) => abs.to_string(),
        None => format!("ppt/{}", target.trim_start_matches("./")),
    }
}

/// `slides/slide12.xml` → 12.
fn trailing_number(s: &str) -> Option<usize> {
    let stem = s.trim_end_matches(".xml");
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}
