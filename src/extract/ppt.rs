//! Legacy PowerPoint 97–2003 (.ppt) text extraction.
//!
//! A `.ppt` is an OLE compound file whose `PowerPoint Document` stream is a
//! tree of binary records, each with an 8-byte header:
//!
//! ```text
//! u16  recVer (low 4 bits) | recInstance (high 12 bits)
//! u16  recType
//! u32  recLen
//! ```
//!
//! Containers have `recVer == 0xF` and hold child records. Slide text lives
//! in the `SlideListWithText` container (instance 0) of the `Document`: each
//! `SlidePersistAtom` opens a slide, and the text atoms that follow belong to
//! it, typed by the preceding `TextHeaderAtom`. Decks that keep text only in
//! the slide drawings are handled by a second pass over `Slide` containers.

use super::SlideFormat;
use crate::error::LecSlideError;
use crate::model::ExtractedSlide;
use std::io::{Cursor, Read};
use tracing::debug;

const POWERPOINT_STREAM: &str = "/PowerPoint Document";

/// Deepest container nesting followed by the drawing scan. Real decks stay
/// well under a dozen levels; anything deeper is skipped.
const MAX_NESTING: usize = 64;

mod record_type {
    pub const DOCUMENT: u16 = 0x03E8;
    pub const SLIDE: u16 = 0x03EE;
    pub const SLIDE_PERSIST_ATOM: u16 = 0x03F3;
    pub const SLIDE_LIST_WITH_TEXT: u16 = 0x0FF0;
    pub const TEXT_HEADER_ATOM: u16 = 0x0F9F;
    pub const TEXT_CHARS_ATOM: u16 = 0x0FA0;
    pub const TEXT_BYTES_ATOM: u16 = 0x0FA8;
}

/// `TextHeaderAtom.textType` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextType {
    Title,
    Body,
    Notes,
    Other,
    CenterTitle,
    Unused,
}

impl TextType {
    fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Title,
            1 | 5 | 7 | 8 => Self::Body,
            2 => Self::Notes,
            4 => Self::Other,
            6 => Self::CenterTitle,
            _ => Self::Unused,
        }
    }

    fn is_title(self) -> bool {
        matches!(self, Self::Title | Self::CenterTitle)
    }

    fn is_slide_text(self) -> bool {
        !matches!(self, Self::Notes | Self::Unused)
    }
}

#[derive(Debug, Clone, Copy)]
struct Header {
    ver: u16,
    instance: u16,
    rec_type: u16,
    body_start: usize,
    body_end: usize,
}

impl Header {
    fn is_container(&self) -> bool {
        self.ver == 0x0F
    }
}

/// Iterate the records directly inside `data[start..end]`. Stops at the first
/// record whose length would run past the range.
fn records(data: &[u8], start: usize, end: usize) -> impl Iterator<Item = Header> + '_ {
    let mut pos = start;
    std::iter::from_fn(move || {
        if pos + 8 > end {
            return None;
        }
        let ver_instance = read_u16_le(data, pos);
        let rec_type = read_u16_le(data, pos + 2);
        let len = read_u32_le(data, pos + 4) as usize;
        let body_start = pos + 8;
        let body_end = body_start.checked_add(len)?;
        if body_end > end {
            return None;
        }
        pos = body_end;
        Some(Header {
            ver: ver_instance & 0x0F,
            instance: ver_instance >> 4,
            rec_type,
            body_start,
            body_end,
        })
    })
}

#[derive(Debug, Default)]
struct SlideText {
    title: Vec<String>,
    body: Vec<String>,
}

impl SlideText {
    fn push(&mut self, text_type: TextType, text: String) {
        let text = normalize(&text);
        if text.is_empty() || !text_type.is_slide_text() {
            return;
        }
        if text_type.is_title() {
            self.title.push(text);
        } else {
            self.body.push(text);
        }
    }

    fn into_slide(self, position: usize) -> ExtractedSlide {
        let mut body = self.body.into_iter();
        let title = match self.title.first() {
            Some(t) => t.replace('\n', " "),
            // No typed title: promote the first line of the first body block.
            None => match body.next() {
                Some(first) => {
                    let rest: Vec<String> = body.collect();
                    let mut promoted = ExtractedSlide::from_text(&first, position);
                    if !rest.is_empty() {
                        if !promoted.content.is_empty() {
                            promoted.content.push('\n');
                        }
                        promoted.content.push_str(&rest.join("\n"));
                    }
                    return promoted;
                }
                None => return ExtractedSlide::new(format!("Slide {position}"), ""),
            },
        };
        ExtractedSlide::new(title, body.collect::<Vec<_>>().join("\n"))
    }
}

/// Extract every slide from a `.ppt` file.
pub fn extract(bytes: &[u8]) -> Result<Vec<ExtractedSlide>, LecSlideError> {
    let mut compound = cfb::CompoundFile::open(Cursor::new(bytes))
        .map_err(|e| SlideFormat::Ppt.error(format!("not an OLE compound file: {e}")))?;

    let mut stream = compound
        .open_stream(POWERPOINT_STREAM)
        .map_err(|e| SlideFormat::Ppt.error(format!("missing PowerPoint Document stream: {e}")))?;
    let mut data = Vec::new();
    stream
        .read_to_end(&mut data)
        .map_err(|e| SlideFormat::Ppt.error(format!("failed to read stream: {e}")))?;

    Ok(parse_stream(&data))
}

fn parse_stream(data: &[u8]) -> Vec<ExtractedSlide> {
    let mut slides = slides_from_text_list(data);
    if slides.is_empty() {
        debug!("No SlideListWithText text, scanning slide drawings");
        slides = slides_from_drawings(data);
    }
    slides
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.into_slide(i + 1))
        .collect()
}

fn slides_from_text_list(data: &[u8]) -> Vec<SlideText> {
    let mut slides = Vec::new();

    for doc in records(data, 0, data.len()).filter(|h| h.rec_type == record_type::DOCUMENT) {
        let lists = records(data, doc.body_start, doc.body_end)
            .filter(|h| h.rec_type == record_type::SLIDE_LIST_WITH_TEXT && h.instance == 0);

        for list in lists {
            let mut current: Option<SlideText> = None;
            let mut text_type = TextType::Body;

            for rec in records(data, list.body_start, list.body_end) {
                match rec.rec_type {
                    record_type::SLIDE_PERSIST_ATOM => {
                        if let Some(done) = current.take() {
                            slides.push(done);
                        }
                        current = Some(SlideText::default());
                        text_type = TextType::Body;
                    }
                    record_type::TEXT_HEADER_ATOM => {
                        text_type = text_header(data, &rec).unwrap_or(TextType::Body);
                    }
                    record_type::TEXT_CHARS_ATOM | record_type::TEXT_BYTES_ATOM => {
                        if let (Some(slide), Some(text)) = (current.as_mut(), atom_text(data, &rec)) {
                            slide.push(text_type, text);
                        }
                    }
                    _ => {}
                }
            }
            if let Some(done) = current.take() {
                slides.push(done);
            }
        }
    }

    slides
}

fn slides_from_drawings(data: &[u8]) -> Vec<SlideText> {
    let mut slides = Vec::new();
    collect_slide_containers(data, 0, data.len(), 0, &mut slides);
    slides
}

fn collect_slide_containers(
    data: &[u8],
    start: usize,
    end: usize,
    depth: usize,
    out: &mut Vec<SlideText>,
) {
    if depth > MAX_NESTING {
        debug!("Record nesting deeper than {} levels, skipping", MAX_NESTING);
        return;
    }
    for rec in records(data, start, end) {
        if rec.rec_type == record_type::SLIDE {
            let mut slide = SlideText::default();
            let mut text_type = TextType::Body;
            collect_text(data, rec.body_start, rec.body_end, depth + 1, &mut text_type, &mut slide);
            out.push(slide);
        } else if rec.is_container() {
            collect_slide_containers(data, rec.body_start, rec.body_end, depth + 1, out);
        }
    }
}

fn collect_text(
    data: &[u8],
    start: usize,
    end: usize,
    depth: usize,
    text_type: &mut TextType,
    slide: &mut SlideText,
) {
    if depth > MAX_NESTING {
        debug!("Record nesting deeper than {} levels, skipping", MAX_NESTING);
        return;
    }
    for rec in records(data, start, end) {
        match rec.rec_type {
            record_type::TEXT_HEADER_ATOM => {
                *text_type = text_header(data, &rec).unwrap_or(TextType::Body);
            }
            record_type::TEXT_CHARS_ATOM | record_type::TEXT_BYTES_ATOM => {
                if let Some(text) = atom_text(data, &rec) {
                    slide.push(*text_type, text);
                }
            }
            _ if rec.is_container() => {
                collect_text(data, rec.body_start, rec.body_end, depth + 1, text_type, slide);
            }
            _ => {}
        }
    }
}

fn text_header(data: &[u8], rec: &Header) -> Option<TextType> {
    (rec.body_end - rec.body_start >= 4).then(|| TextType::from_u32(read_u32_le(data, rec.body_start)))
}

fn atom_text(data: &[u8], rec: &Header) -> Option<String> {
    let body = &data[rec.body_start..rec.body_end];
    let text: String = if rec.rec_type == record_type::TEXT_CHARS_ATOM {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    } else {
        // TextBytesAtom stores the low byte of each UTF-16 code unit.
        body.iter().map(|&b| char::from(b)).collect()
    };
    (!text.is_empty()).then_some(text)
}

/// PowerPoint uses `\r` for paragraph breaks and `\x0b` for line breaks.
/// Other control characters (field markers, stray bytes) are dropped.
fn normalize(text: &str) -> String {
    text.replace(['\r', '\u{0b}'], "\n")
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(ver: u16, instance: u16, rec_type: u16, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + body.len());
        out.extend_from_slice(&(ver | (instance << 4)).to_le_bytes());
        out.extend_from_slice(&rec_type.to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn container(rec_type: u16, instance: u16, children: &[Vec<u8>]) -> Vec<u8> {
        record(0x0F, instance, rec_type, &children.concat())
    }

    fn header(text_type: u32) -> Vec<u8> {
        record(0, 0, record_type::TEXT_HEADER_ATOM, &text_type.to_le_bytes())
    }

    fn chars(text: &str) -> Vec<u8> {
        let body: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        record(0, 0, record_type::TEXT_CHARS_ATOM, &body)
    }

    fn bytes_atom(text: &str) -> Vec<u8> {
        record(0, 0, record_type::TEXT_BYTES_ATOM, text.as_bytes())
    }

    fn persist() -> Vec<u8> {
        record(0, 0, record_type::SLIDE_PERSIST_ATOM, &[0u8; 20])
    }

    fn sample_stream() -> Vec<u8> {
        let list = container(
            record_type::SLIDE_LIST_WITH_TEXT,
            0,
            &[
                persist(),
                header(0),
                chars("Stacks"),
                header(1),
                bytes_atom("Last in\rfirst out"),
                persist(),
                header(6),
                bytes_atom("Queues"),
                header(2),
                chars("speaker notes"),
            ],
        );
        // Master text list (instance 1) must be ignored.
        let masters = container(
            record_type::SLIDE_LIST_WITH_TEXT,
            1,
            &[persist(), header(0), chars("Click to edit Master title style")],
        );
        container(record_type::DOCUMENT, 0, &[masters, list])
    }

    #[test]
    fn text_list_yields_typed_slides() {
        let slides = parse_stream(&sample_stream());
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0], ExtractedSlide::new("Stacks", "Last in\nfirst out"));
        assert_eq!(slides[1], ExtractedSlide::new("Queues", ""));
    }

    #[test]
    fn drawings_are_scanned_when_list_is_empty() {
        let slide = container(
            record_type::SLIDE,
            0,
            &[container(0xF000, 0, &[header(1), chars("Heaps\rPriority queues")])],
        );
        let slides = parse_stream(&slide);
        assert_eq!(slides, vec![ExtractedSlide::new("Heaps", "Priority queues")]);
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(normalize("\u{1}Graphs\u{7}\rDFS\u{b}BFS\0"), "Graphs\nDFS\nBFS");
    }

    #[test]
    fn truncated_record_stops_the_walk() {
        let mut data = sample_stream();
        data.truncate(data.len() - 3);
        // The outer Document container is now too long for the buffer.
        assert!(parse_stream(&data).is_empty());
    }

    /// A chain of containers, each the only child of the previous one.
    fn nested_chain(levels: usize, rec_type: u16) -> Vec<u8> {
        let total = levels * 8;
        let mut data = Vec::with_capacity(total);
        for level in 0..levels {
            let remaining = (total - (level + 1) * 8) as u32;
            data.extend_from_slice(&0x000Fu16.to_le_bytes());
            data.extend_from_slice(&rec_type.to_le_bytes());
            data.extend_from_slice(&remaining.to_le_bytes());
        }
        data
    }

    #[test]
    fn deeply_nested_containers_do_not_overflow() {
        let data = nested_chain(200_000, 0x0FFF);
        // A small stack makes an unbounded walk abort the process.
        let slides = std::thread::Builder::new()
            .stack_size(512 * 1024)
            .spawn(move || parse_stream(&data))
            .unwrap()
            .join()
            .unwrap();
        assert!(slides.is_empty());
    }

    #[test]
    fn deeply_nested_slide_text_is_skipped() {
        let mut data = record(0x0F, 0, record_type::SLIDE, &[]);
        let inner = nested_chain(100_000, 0xF000);
        data.truncate(4);
        data.extend_from_slice(&(inner.len() as u32).to_le_bytes());
        data.extend_from_slice(&inner);
        let slides = std::thread::Builder::new()
            .stack_size(512 * 1024)
            .spawn(move || parse_stream(&data))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(slides, vec![ExtractedSlide::new("Slide 1", "")]);
    }

    #[test]
    fn shallow_nesting_is_still_walked() {
        let mut inner = container(0xF000, 0, &[header(1), chars("Tries")]);
        for _ in 0..10 {
            inner = container(0xF000, 0, &[inner]);
        }
        let slide = container(record_type::SLIDE, 0, &[inner]);
        let slides = parse_stream(&slide);
        assert_eq!(slides[0].title, "Tries");
    }

    #[test]
    fn reads_compound_file() {
        let mut compound = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        {
            let mut stream = compound.create_stream(POWERPOINT_STREAM).unwrap();
            stream.write_all(&sample_stream()).unwrap();
        }
        compound.flush().unwrap();
        let bytes = compound.into_inner().into_inner();

        let slides = extract(&bytes).unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].title, "Stacks");
    }

    #[test]
    fn non_ole_input_is_an_extraction_error() {
        let err = extract(b"plain text, not a compound file").unwrap_err();
        assert!(matches!(err, LecSlideError::Extraction { .. }));
    }
}
