//! Render the visible text of PDF pages from their content streams.

use crate::{ExtractError, Result};
use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use unicode_normalization::UnicodeNormalization;

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `TJ` adjustments (thousandths of an em) wider than this become a space.
const TJ_SPACE_THRESHOLD: f64 = 200.0;

/// Fragments whose start positions differ by less than this share a column.
const SAME_X_EPSILON: f64 = 0.01;

/// Render every page of `document`, in page order, NFC-normalized.
///
/// The first page that cannot be rendered aborts the whole extraction.
pub fn extract_pages(document: &Document, sort_by_position: bool) -> Result<Vec<String>> {
    let page_count = document.get_pages().len() as u32;
    let mut stripper = PageTextStripper {
        sort_by_position,
        ..Default::default()
    };

    let mut pages = Vec::with_capacity(page_count as usize);
    for page in 1..=page_count {
        stripper.start_page = page;
        stripper.end_page = page;
        let text = stripper.get_text(document)?;
        pages.push(text.nfc().collect::<String>());
    }
    Ok(pages)
}

// ── PageTextStripper ─────────────────────────────────────────────────────────

/// Extracts the text of an inclusive, 1-based page range.
#[derive(Debug, Clone)]
pub struct PageTextStripper {
    pub start_page: u32,
    pub end_page: u32,
    /// Order fragments top-to-bottom then left-to-right instead of in
    /// content-stream order.
    pub sort_by_position: bool,
}

impl Default for PageTextStripper {
    fn default() -> Self {
        Self {
            start_page: 1,
            end_page: u32::MAX,
            sort_by_position: false,
        }
    }
}

impl PageTextStripper {
    pub fn get_text(&self, document: &Document) -> Result<String> {
        let pages = document.get_pages();
        let last = self.end_page.min(pages.len() as u32);

        let mut text = String::new();
        for page in self.start_page..=last {
            let page_id = pages.get(&page).copied().ok_or_else(|| ExtractError::PageText {
                page,
                reason: "page not found in page tree".into(),
            })?;
            text.push_str(&self.page_text(document, page, page_id)?);
        }
        Ok(text)
    }

    fn page_text(&self, document: &Document, page: u32, page_id: ObjectId) -> Result<String> {
        let fail = |reason: String| ExtractError::PageText { page, reason };

        let fonts = document.get_page_fonts(page_id).unwrap_or_else(|e| {
            warn!("page {page}: cannot read font resources ({e}); decoding text as UTF-8");
            BTreeMap::new()
        });
        let data = page_content(document, page_id).map_err(|reason| fail(reason))?;
        let content =
            Content::decode(&data).map_err(|e| fail(format!("cannot decode content stream: {e}")))?;
        if content.operations.is_empty() && has_content(&data) {
            return Err(fail("content stream has no parseable operators".into()));
        }

        let mut collector = TextCollector::new(document, fonts);
        for operation in &content.operations {
            collector.apply(operation);
        }
        debug!("page {page}: {} text fragments", collector.fragments.len());

        Ok(render(collector.fragments, self.sort_by_position))
    }
}

/// Concatenated, filter-decoded bytes of every `/Contents` stream of a page.
fn page_content(document: &Document, page_id: ObjectId) -> std::result::Result<Vec<u8>, String> {
    let mut data = Vec::new();
    for id in document.get_page_contents(page_id) {
        let stream = document
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(|e| format!("content stream {} {} is unreadable: {e}", id.0, id.1))?;

        if stream.dict.has(b"Filter") {
            let decoded = stream
                .decompressed_content()
                .map_err(|e| format!("cannot decompress content stream {} {}: {e}", id.0, id.1))?;
            data.extend_from_slice(&decoded);
        } else {
            data.extend_from_slice(&stream.content);
        }
        data.push(b'\n');
    }
    Ok(data)
}

/// Whether `data` holds anything besides whitespace and comments.
fn has_content(data: &[u8]) -> bool {
    data.split(|&b| b == b'\n' || b == b'\r').any(|line| {
        let first = line.iter().find(|b| !b.is_ascii_whitespace());
        matches!(first, Some(b) if *b != b'%')
    })
}

// ── Text state machine ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct TextFragment {
    x: f64,
    y: f64,
    height: f64,
    text: String,
}

struct TextCollector<'a> {
    document: &'a Document,
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    current_font: Option<&'a Dictionary>,
    font_size: f64,
    leading: f64,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    fragments: Vec<TextFragment>,
}

impl<'a> TextCollector<'a> {
    fn new(document: &'a Document, fonts: BTreeMap<Vec<u8>, &'a Dictionary>) -> Self {
        Self {
            document,
            fonts,
            current_font: None,
            font_size: 1.0,
            leading: 0.0,
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            tm: IDENTITY,
            tlm: IDENTITY,
            fragments: Vec::new(),
        }
    }

    fn apply(&mut self, operation: &Operation) {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix(operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }
            "BT" => {
                self.tm = IDENTITY;
                self.tlm = IDENTITY;
            }
            "Tf" => {
                self.current_font = operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .and_then(|name| self.fonts.get(name).copied());
                if let Some(size) = number(operands, 1) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = number(operands, 0) {
                    self.leading = leading;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    if operation.operator == "TD" {
                        self.leading = -ty;
                    }
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = matrix(operands) {
                    self.tlm = m;
                    self.tm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => self.show(operands.first()),
            "'" => {
                self.next_line();
                self.show(operands.first());
            }
            "\"" => {
                self.next_line();
                self.show(operands.get(2));
            }
            "TJ" => {
                if let Some(items) = operands.first().and_then(|o| o.as_array().ok()) {
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&self.decode(bytes)),
                            other => {
                                let adjustment = other.as_float().map(f64::from).unwrap_or(0.0);
                                if adjustment < -TJ_SPACE_THRESHOLD && !text.ends_with(' ') {
                                    text.push(' ');
                                }
                            }
                        }
                    }
                    self.emit(text);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn show(&mut self, operand: Option<&Object>) {
        if let Some(Object::String(bytes, _)) = operand {
            let text = self.decode(bytes);
            self.emit(text);
        }
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let decoded = self.current_font.and_then(|font| {
            let encoding = font.get_font_encoding(self.document).ok()?;
            Document::decode_text(&encoding, bytes).ok()
        });
        decoded.unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
    }

    fn emit(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let m = multiply(&self.tm, &self.ctm);
        let scale = (m[2] * m[2] + m[3] * m[3]).sqrt();
        self.fragments.push(TextFragment {
            x: m[4],
            y: m[5],
            height: (self.font_size * scale).abs(),
            text,
        });
    }
}

fn number(operands: &[Object], index: usize) -> Option<f64> {
    operands.get(index)?.as_float().ok().map(f64::from)
}

fn matrix(operands: &[Object]) -> Option<Matrix> {
    let mut m = IDENTITY;
    for (i, slot) in m.iter_mut().enumerate() {
        *slot = number(operands, i)?;
    }
    Some(m)
}

/// `a × b` in PDF's row-vector convention.
fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

// ── Layout ───────────────────────────────────────────────────────────────────

fn same_line(anchor: &TextFragment, fragment: &TextFragment) -> bool {
    let tolerance = anchor.height.max(fragment.height).max(1.0) * 0.5;
    (anchor.y - fragment.y).abs() <= tolerance
}

/// Group fragments into lines and join them into text, one `\n` per line.
fn render(mut fragments: Vec<TextFragment>, sort_by_position: bool) -> String {
    if sort_by_position {
        // Stable: fragments at the same height keep content-stream order.
        fragments.sort_by(|a, b| b.y.total_cmp(&a.y));
    }

    let mut lines: Vec<Vec<TextFragment>> = Vec::new();
    for fragment in fragments {
        let starts_line = lines
            .last()
            .map_or(true, |line| !same_line(&line[0], &fragment));
        if starts_line {
            lines.push(vec![fragment]);
        } else if let Some(line) = lines.last_mut() {
            line.push(fragment);
        }
    }

    let mut out = String::new();
    for mut line in lines {
        if sort_by_position {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
        }

        let mut previous_x: Option<f64> = None;
        for fragment in line {
            if let Some(x) = previous_x {
                let new_column = (fragment.x - x).abs() > SAME_X_EPSILON;
                if new_column
                    && !out.ends_with(char::is_whitespace)
                    && !fragment.text.starts_with(char::is_whitespace)
                {
                    out.push(' ');
                }
            }
            out.push_str(&fragment.text);
            previous_x = Some(fragment.x);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(x: f64, y: f64, text: &str) -> TextFragment {
        TextFragment {
            x,
            y,
            height: 12.0,
            text: text.into(),
        }
    }

    #[test]
    fn multiply_applies_translation_after_scale() {
        let scale = [2.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let translate = [1.0, 0.0, 0.0, 1.0, 10.0, 20.0];
        assert_eq!(multiply(&scale, &translate), [2.0, 0.0, 0.0, 2.0, 10.0, 20.0]);
        assert_eq!(multiply(&translate, &scale), [2.0, 0.0, 0.0, 2.0, 20.0, 40.0]);
    }

    #[test]
    fn render_sorts_top_to_bottom_then_left_to_right() {
        let fragments = vec![
            fragment(300.0, 700.0, "Total"),
            fragment(72.0, 600.0, "Footer"),
            fragment(72.0, 700.0, "Item"),
            fragment(72.0, 750.0, "Header"),
        ];
        assert_eq!(render(fragments, true), "Header\nItem Total\nFooter\n");
    }

    #[test]
    fn render_keeps_stream_order_when_unsorted() {
        let fragments = vec![
            fragment(72.0, 600.0, "Footer"),
            fragment(72.0, 750.0, "Header"),
        ];
        assert_eq!(render(fragments, false), "Footer\nHeader\n");
    }

    #[test]
    fn render_joins_same_position_fragments_without_space() {
        let fragments = vec![fragment(72.0, 700.0, "Hel"), fragment(72.0, 700.0, "lo")];
        assert_eq!(render(fragments, true), "Hello\n");
    }

    #[test]
    fn render_tolerates_baseline_jitter() {
        let fragments = vec![fragment(72.0, 700.0, "a"), fragment(90.0, 702.0, "b")];
        assert_eq!(render(fragments, true), "a b\n");
    }

    #[test]
    fn render_empty_page() {
        assert_eq!(render(Vec::new(), true), "");
    }

    #[test]
    fn comments_and_whitespace_are_not_content() {
        assert!(!has_content(b""));
        assert!(!has_content(b"  \n% producer note\r\n\t"));
        assert!(has_content(b"% note\n(unterminated Tj ET"));
    }

    #[test]
    fn collector_tracks_td_and_tj_positions() {
        let doc = Document::with_version("1.5");
        let mut collector = TextCollector::new(&doc, BTreeMap::new());
        let content = Content::decode(b"BT 12 TL 72 720 Td (First) Tj T* [(Sec) -300 (ond)] TJ ET").unwrap();
        for op in &content.operations {
            collector.apply(op);
        }

        let texts: Vec<_> = collector.fragments.iter().map(|f| (f.x, f.y, f.text.as_str())).collect();
        assert_eq!(texts, [(72.0, 720.0, "First"), (72.0, 708.0, "Sec ond")]);
    }

    #[test]
    fn collector_applies_cm_and_restores_on_q() {
        let doc = Document::with_version("1.5");
        let mut collector = TextCollector::new(&doc, BTreeMap::new());
        let content =
            Content::decode(b"q 1 0 0 1 100 0 cm BT 10 10 Td (a) Tj ET Q BT 10 10 Td (b) Tj ET").unwrap();
        for op in &content.operations {
            collector.apply(op);
        }

        let xs: Vec<_> = collector.fragments.iter().map(|f| f.x).collect();
        assert_eq!(xs, [110.0, 10.0]);
    }
}
