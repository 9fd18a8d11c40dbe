//! PDF export through pdfium's page-object API.
//!
//! Two phases:
//!
//! 1. [`paginate`] turns layout blocks into positioned text lines on A4
//!    pages: word-wrapped by an estimated Helvetica advance width, with each
//!    slide starting on a fresh page. Pure, so it is tested without pdfium.
//! 2. [`render`] draws those lines with the standard Helvetica fonts.
//!
//! The standard fonts only cover WinAnsi, so text is folded to that
//! repertoire first and the correct option carries a `(correct)` suffix
//! instead of a check mark.

use super::layout::{layout, Block};
use super::ExportFormat;
use crate::error::LecSlideError;
use crate::extract::pdf::bind_pdfium;
use crate::model::SlideData;
use pdfium_render::prelude::*;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const LINE_SPACING: f32 = 1.35;
/// Mean Helvetica advance width as a fraction of the font size.
const AVG_CHAR_WIDTH: f32 = 0.5;

/// One line of text, positioned at its baseline in PDF points.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub bold: bool,
    pub text: String,
}

struct Style {
    size: f32,
    bold: bool,
    indent: f32,
    space_before: f32,
}

impl Style {
    const fn new(size: f32, bold: bool, indent: f32, space_before: f32) -> Self {
        Self {
            size,
            bold,
            indent,
            space_before,
        }
    }
}

const TITLE: Style = Style::new(20.0, true, 0.0, 0.0);
const META: Style = Style::new(10.0, false, 0.0, 2.0);
const SLIDE_HEADING: Style = Style::new(15.0, true, 0.0, 10.0);
const SECTION: Style = Style::new(12.0, true, 0.0, 8.0);
const BODY: Style = Style::new(10.5, false, 0.0, 2.0);
const BULLET: Style = Style::new(10.5, false, 12.0, 1.0);
const TERM: Style = Style::new(10.5, true, 12.0, 3.0);
const DEFINITION: Style = Style::new(10.5, false, 24.0, 0.0);
const QUESTION: Style = Style::new(10.5, true, 0.0, 5.0);
const CHOICE: Style = Style::new(10.5, false, 18.0, 1.0);

/// Lay out blocks onto pages.
pub fn paginate(blocks: &[Block]) -> Vec<Vec<Line>> {
    let mut cursor = Cursor::new();

    for (i, block) in blocks.iter().enumerate() {
        match block {
            Block::Title(t) => cursor.write(&TITLE, t),
            Block::Meta(t) => cursor.write(&META, t),
            Block::SlideHeading(t) => cursor.write(&SLIDE_HEADING, t),
            Block::Section(t) => cursor.write(&SECTION, t),
            Block::Paragraph(t) => cursor.write(&BODY, t),
            Block::Bullet(t) => cursor.write(&BULLET, &format!("• {t}")),
            Block::Concept { name, definition } => {
                cursor.write(&TERM, name);
                cursor.write(&DEFINITION, definition);
            }
            Block::Question(t) => cursor.write(&QUESTION, t),
            Block::Choice { text, correct } => {
                let line = if *correct {
                    format!("- {text} (correct)")
                } else {
                    format!("- {text}")
                };
                cursor.write(&CHOICE, &line);
            }
            Block::Answer(value) => {
                cursor.write(&CHOICE, if *value { "Answer: True" } else { "Answer: False" })
            }
            Block::Rule => {
                if i + 1 < blocks.len() {
                    cursor.new_page();
                }
            }
        }
    }

    cursor.finish()
}

struct Cursor {
    pages: Vec<Vec<Line>>,
    current: Vec<Line>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn write(&mut self, style: &Style, text: &str) {
        let x = MARGIN + style.indent;
        let max_chars = ((PAGE_WIDTH - MARGIN - x) / (style.size * AVG_CHAR_WIDTH)) as usize;
        let line_height = style.size * LINE_SPACING;

        if !self.current.is_empty() {
            self.y -= style.space_before;
        }

        for (n, piece) in wrap(&winansi(text), max_chars.max(8)).into_iter().enumerate() {
            if self.y - line_height < MARGIN {
                self.new_page();
            }
            self.y -= line_height;
            // Continuation lines of a bullet hang under its text.
            let hang = if n > 0 && text.starts_with("• ") { style.size } else { 0.0 };
            self.current.push(Line {
                x: x + hang,
                y: self.y,
                size: style.size,
                bold: style.bold,
                text: piece,
            });
        }
    }

    fn finish(mut self) -> Vec<Vec<Line>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Greedy word wrap; words longer than a line are split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if len > 0 {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let wlen = word.len();
        if len > 0 && len + 1 + wlen > max_chars {
            lines.push(std::mem::take(&mut line));
            len = 0;
        }
        if len > 0 {
            line.push(' ');
            len += 1;
        }
        line.extend(word);
        len += wlen;
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Fold text into what the standard 14 fonts can show.
fn winansi(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '→' | '⇒' => "->".to_string(),
            '←' => "<-".to_string(),
            '✓' | '✔' => "v".to_string(),
            '≤' => "<=".to_string(),
            '≥' => ">=".to_string(),
            '≠' => "!=".to_string(),
            '\t' => " ".to_string(),
            c if (c as u32) < 0x100 || "•–—‘’“”…€™".contains(c) => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

/// Render a deck as PDF bytes.
pub fn render(data: &SlideData) -> Result<Vec<u8>, LecSlideError> {
    let pages = paginate(&layout(data));
    let pdfium = bind_pdfium()?;
    let err = |e: PdfiumError| ExportFormat::Pdf.error(format!("{e:?}"));

    let mut document = pdfium.create_new_pdf().map_err(err)?;
    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();

    for lines in &pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(err)?;
        for line in lines {
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(line.x),
                    PdfPoints::new(line.y),
                    &line.text,
                    if line.bold { bold } else { regular },
                    PdfPoints::new(line.size),
                )
                .map_err(err)?;
        }
    }

    document.save_to_bytes().map_err(err)
}
