//! Lays a profile document out on a fixed-width canvas.
//!
//! The canvas is the print rendition of the document: one continuous strip
//! measured in source pixels, top-down, which the export pipeline then slices
//! into pages. Layout never depends on anything but the document and the
//! configured width.

use crate::document::renderer::{
    BodyZone, FieldBlock, FieldContent, FooterZone, HeaderZone, PhotoBlock, ProfileDocument,
    QrBlock,
};

pub const DEFAULT_SOURCE_WIDTH: f32 = 800.0;

const MARGIN: f32 = 40.0;
const ZONE_GAP: f32 = 24.0;
const LINE_SPACING: f32 = 1.35;
const PHOTO_SIZE: f32 = 120.0;
const LOGO_MAX_WIDTH: f32 = 160.0;
const LOGO_MAX_HEIGHT: f32 = 64.0;
// Average Helvetica glyph advance, in em.
const GLYPH_WIDTH_EM: f32 = 0.52;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasItem {
    Text {
        x: f32,
        y: f32,
        size: f32,
        weight: TextWeight,
        /// 0.0 is black, 1.0 white.
        gray: f32,
        text: String,
    },
    Rule {
        x: f32,
        y: f32,
        width: f32,
    },
    /// An embedded image fitted inside the `width` x `height` box.
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        data_uri: String,
    },
    /// Placeholder glyph drawn in an outlined square.
    Initial {
        x: f32,
        y: f32,
        size: f32,
        letter: String,
    },
}

impl CanvasItem {
    pub fn top(&self) -> f32 {
        match self {
            CanvasItem::Text { y, .. }
            | CanvasItem::Rule { y, .. }
            | CanvasItem::Image { y, .. }
            | CanvasItem::Initial { y, .. } => *y,
        }
    }

    pub fn bottom(&self) -> f32 {
        match self {
            CanvasItem::Text { y, size, .. } => y + size * LINE_SPACING,
            CanvasItem::Rule { y, .. } => *y,
            CanvasItem::Image { y, height, .. } => y + height,
            CanvasItem::Initial { y, size, .. } => y + size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
    pub items: Vec<CanvasItem>,
}

impl Canvas {
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            CanvasItem::Image { data_uri, .. } => Some(data_uri.as_str()),
            _ => None,
        })
    }
}

struct Cursor {
    width: f32,
    y: f32,
    items: Vec<CanvasItem>,
}

impl Cursor {
    fn content_width(&self) -> f32 {
        self.width - 2.0 * MARGIN
    }

    /// Writes wrapped text starting at the current line; returns the height used.
    fn text(&mut self, x: f32, y: f32, max_width: f32, size: f32, weight: TextWeight, gray: f32, text: &str) -> f32 {
        let lines = wrap_text(text, max_width, size);
        let line_height = size * LINE_SPACING;
        for (i, line) in lines.iter().enumerate() {
            self.items.push(CanvasItem::Text {
                x,
                y: y + i as f32 * line_height,
                size,
                weight,
                gray,
                text: line.clone(),
            });
        }
        lines.len() as f32 * line_height
    }

    fn rule(&mut self) {
        self.items.push(CanvasItem::Rule {
            x: MARGIN,
            y: self.y,
            width: self.content_width(),
        });
    }

    fn qr(&mut self, x: f32, y: f32, qr: &QrBlock) -> f32 {
        let size = qr.size as f32;
        self.items.push(CanvasItem::Image {
            x,
            y,
            width: size,
            height: size,
            data_uri: qr.data_uri.clone(),
        });
        size
    }
}

/// Lays `doc` out at `width` source pixels.
pub fn layout_document(doc: &ProfileDocument, width: f32) -> Canvas {
    let width = width.max(2.0 * MARGIN + PHOTO_SIZE + 160.0);
    let mut cursor = Cursor {
        width,
        y: MARGIN,
        items: Vec::new(),
    };

    if let Some(header) = &doc.header {
        layout_header(&mut cursor, header);
    }
    layout_body(&mut cursor, &doc.body);
    if let Some(footer) = &doc.footer {
        layout_footer(&mut cursor, footer);
    }

    Canvas {
        width,
        height: cursor.y + MARGIN,
        items: cursor.items,
    }
}

fn layout_header(cursor: &mut Cursor, header: &HeaderZone) {
    let top = cursor.y;
    let mut x = MARGIN;
    let mut height: f32 = 0.0;

    if let Some(logo) = &header.logo {
        cursor.items.push(CanvasItem::Image {
            x,
            y: top,
            width: LOGO_MAX_WIDTH,
            height: LOGO_MAX_HEIGHT,
            data_uri: logo.clone(),
        });
        x += LOGO_MAX_WIDTH + 16.0;
        height = height.max(LOGO_MAX_HEIGHT);
    }

    let qr_width = header.qr.as_ref().map(|qr| qr.size as f32 + 16.0).unwrap_or(0.0);
    if let Some(text) = &header.text {
        let max_width = cursor.width - MARGIN - x - qr_width;
        let used = cursor.text(x, top, max_width, 20.0, TextWeight::Bold, 0.0, text);
        height = height.max(used);
    }

    if let Some(qr) = &header.qr {
        let qr_x = cursor.width - MARGIN - qr.size as f32;
        height = height.max(cursor.qr(qr_x, top, qr));
    }

    cursor.y = top + height + 12.0;
    cursor.rule();
    cursor.y += ZONE_GAP;
}

fn layout_body(cursor: &mut Cursor, body: &BodyZone) {
    let top = cursor.y;
    match &body.photo {
        PhotoBlock::Image { data_uri } => cursor.items.push(CanvasItem::Image {
            x: MARGIN,
            y: top,
            width: PHOTO_SIZE,
            height: PHOTO_SIZE,
            data_uri: data_uri.clone(),
        }),
        PhotoBlock::Initial { letter } => cursor.items.push(CanvasItem::Initial {
            x: MARGIN,
            y: top,
            size: PHOTO_SIZE,
            letter: letter.clone(),
        }),
    }

    let column_x = MARGIN + PHOTO_SIZE + 24.0;
    let column_width = cursor.width - MARGIN - column_x;
    let mut y = top;
    y += cursor.text(column_x, y, column_width, 24.0, TextWeight::Bold, 0.0, print_text(&body.name));
    if let Some(status) = &body.status {
        y += cursor.text(column_x, y, column_width, 11.0, TextWeight::Regular, 0.4, status);
    }
    y += 8.0;

    // Fields run in the right-hand column, then continue full width below the photo.
    for block in &body.fields {
        let (x, max_width) = if y < top + PHOTO_SIZE {
            (column_x, column_width)
        } else {
            (MARGIN, cursor.content_width())
        };
        y += cursor.text(x, y, max_width, 10.0, TextWeight::Regular, 0.45, &block.label);
        let gray = match block.content {
            FieldContent::Placeholder { .. } => 0.55,
            _ => 0.0,
        };
        y += cursor.text(x, y, max_width, 13.0, TextWeight::Regular, gray, print_text(block));
        y += 6.0;
    }

    y = y.max(top + PHOTO_SIZE);
    if let Some(qr) = &body.qr {
        y += 12.0;
        y += cursor.qr(MARGIN, y, qr);
    }
    cursor.y = y + ZONE_GAP;
}

fn layout_footer(cursor: &mut Cursor, footer: &FooterZone) {
    cursor.rule();
    cursor.y += 12.0;
    let top = cursor.y;
    let qr_width = footer.qr.as_ref().map(|qr| qr.size as f32 + 16.0).unwrap_or(0.0);
    let max_width = cursor.content_width() - qr_width;

    let mut y = top;
    if let Some(text) = &footer.text {
        y += cursor.text(MARGIN, y, max_width, 11.0, TextWeight::Bold, 0.2, text);
    }
    for line in &footer.contact {
        let text = format!("{} : {}", line.label, line.value);
        y += cursor.text(MARGIN, y, max_width, 10.0, TextWeight::Regular, 0.2, &text);
    }
    if let Some(address) = &footer.address {
        y += cursor.text(MARGIN, y, max_width, 10.0, TextWeight::Regular, 0.2, address);
    }
    if let Some(qr) = &footer.qr {
        let qr_x = cursor.width - MARGIN - qr.size as f32;
        let used = cursor.qr(qr_x, top, qr);
        y = y.max(top + used);
    }
    cursor.y = y;
}

/// Print never shows controls: inputs read as their value, or the placeholder
/// when empty.
fn print_text(block: &FieldBlock) -> &str {
    match &block.content {
        FieldContent::Input { value } if value.trim().is_empty() => block.field.placeholder(),
        content => content.display_text(),
    }
}

/// Greedy word wrap using an average glyph width. Always returns at least one
/// line; words wider than the line are split.
pub fn wrap_text(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * GLYPH_WIDTH_EM)).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0usize;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > max_chars && current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::qr::QrCodeProvider;
    use crate::document::renderer::DocumentRenderer;
    use crate::profile::controller::EditMode;
    use crate::profile::model::ProfileEmployee;
    use crate::template::model::seed_templates;

    fn document(notes: &str, template_index: usize) -> ProfileDocument {
        let employee = ProfileEmployee {
            id: "5".to_string(),
            name: "Jean Dupont".to_string(),
            notes: Some(notes.to_string()),
            ..Default::default()
        };
        let qr = QrCodeProvider::new("https://rh.example.org").render("5", 96).unwrap();
        DocumentRenderer::new("adresse").render(
            &employee,
            EditMode::Viewing,
            &seed_templates()[template_index],
            Some(&qr),
        )
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap_text("un deux trois quatre cinq six", 10.5 * 0.52 * 10.0, 10.0);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "un deux trois quatre cinq six");
    }

    #[test]
    fn test_wrap_splits_long_words_and_keeps_paragraphs() {
        let lines = wrap_text("abcdefghijkl\nfin", 5.5 * 0.52 * 10.0, 10.0);
        assert_eq!(lines, vec!["abcde", "fghij", "kl", "fin"]);
        assert_eq!(wrap_text("", 100.0, 10.0), vec![String::new()]);
    }

    #[test]
    fn test_layout_is_deterministic_and_within_canvas() {
        let doc = document("Courte note", 0);
        let a = layout_document(&doc, DEFAULT_SOURCE_WIDTH);
        let b = layout_document(&doc, DEFAULT_SOURCE_WIDTH);
        assert_eq!(a, b);
        assert_eq!(a.width, DEFAULT_SOURCE_WIDTH);
        assert!(a.items.iter().all(|item| item.bottom() <= a.height));
    }

    #[test]
    fn test_long_notes_grow_the_canvas() {
        let short = layout_document(&document("ok", 0), DEFAULT_SOURCE_WIDTH);
        let long_notes = "Très longue note de suivi. ".repeat(800);
        let long = layout_document(&document(&long_notes, 0), DEFAULT_SOURCE_WIDTH);
        assert!(long.height > short.height * 3.0);
    }

    #[test]
    fn test_qr_laid_out_once() {
        let canvas = layout_document(&document("ok", 3), DEFAULT_SOURCE_WIDTH);
        assert_eq!(canvas.images().count(), 1);
    }

    #[test]
    fn test_empty_input_prints_placeholder() {
        let employee = ProfileEmployee {
            id: "5".to_string(),
            name: "Jean".to_string(),
            ..Default::default()
        };
        let doc = DocumentRenderer::new("adresse").render(
            &employee,
            EditMode::Editing,
            &seed_templates()[1],
            None,
        );
        let canvas = layout_document(&doc, DEFAULT_SOURCE_WIDTH);
        assert!(canvas.items.iter().any(|item| matches!(
            item,
            CanvasItem::Text { text, .. } if text == "Email non défini"
        )));
    }
}
