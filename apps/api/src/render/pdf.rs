//! Minimal PDF 1.4 writer for composed pages.
//!
//! Output is a pure function of the pages: no creation date, no document ID, fixed object
//! numbering, and fixed-precision numbers. Text uses the base-14 fonts with WinAnsiEncoding,
//! so nothing is embedded and widths come from `font_metrics`.
//!
//! Object layout:
//! ```text
//! 1 Catalog   2 Pages   3 Info   4..=7 fonts (F1..F4)
//! 8 + 2i      page i
//! 9 + 2i      content stream of page i
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::layout::composer::{DrawCommand, Page, Rgb};
use crate::layout::font_metrics::{FontFamily, PageConfig, PT_TO_MM};

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const INFO_ID: usize = 3;
const FIRST_FONT_ID: usize = 4;
const FIRST_PAGE_ID: usize = FIRST_FONT_ID + FontFamily::ALL.len();

const PRODUCER: &str = "resume-api";

/// Serializes `pages` into a complete PDF document.
pub fn write_pdf(pages: &[Page], config: &PageConfig, title: &str) -> Bytes {
    let mut writer = PdfWriter::new();

    writer.object(
        CATALOG_ID,
        &format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>"),
    );

    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect();
    writer.object(
        PAGES_ID,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
    );

    let mut info = format!("<< /Producer {}", literal(PRODUCER));
    if !title.is_empty() {
        info.push_str(&format!(" /Title {}", literal(title)));
    }
    info.push_str(" >>");
    writer.object(INFO_ID, &info);

    for (i, font) in FontFamily::ALL.iter().enumerate() {
        writer.object(
            FIRST_FONT_ID + i,
            &format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            ),
        );
    }

    let font_resources: Vec<String> = FontFamily::ALL
        .iter()
        .enumerate()
        .map(|(i, font)| format!("/{} {} 0 R", font.resource_name(), FIRST_FONT_ID + i))
        .collect();
    let media_box = format!(
        "[0 0 {} {}]",
        num(config.page_width_mm / PT_TO_MM),
        num(config.page_height_mm / PT_TO_MM)
    );

    for (i, page) in pages.iter().enumerate() {
        writer.object(
            page_id(i),
            &format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox {media_box} \
                 /Resources << /Font << {} >> >> /Contents {} 0 R >>",
                font_resources.join(" "),
                page_id(i) + 1
            ),
        );
        writer.stream(page_id(i) + 1, &content_stream(page, config));
    }

    writer.finish()
}

fn page_id(index: usize) -> usize {
    FIRST_PAGE_ID + 2 * index
}

// ────────────────────────────────────────────────────────────────────────────
// Content streams
// ────────────────────────────────────────────────────────────────────────────

fn content_stream(page: &Page, config: &PageConfig) -> Vec<u8> {
    let mut out = Vec::new();
    for command in &page.commands {
        match command {
            DrawCommand::Text {
                x_mm,
                y_mm,
                font,
                size_pt,
                color,
                text,
            } => {
                out.extend_from_slice(
                    format!(
                        "BT /{} {} Tf {} rg {} {} Td ",
                        font.resource_name(),
                        num(*size_pt),
                        rgb(*color),
                        num(x_mm / PT_TO_MM),
                        num((config.page_height_mm - y_mm) / PT_TO_MM),
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(&encode_text(text));
                out.extend_from_slice(b" Tj ET\n");
            }
            DrawCommand::Rule {
                x1_mm,
                x2_mm,
                y_mm,
                width_mm,
                color,
            } => {
                let y = num((config.page_height_mm - y_mm) / PT_TO_MM);
                out.extend_from_slice(
                    format!(
                        "{} RG {} w {} {y} m {} {y} l S\n",
                        rgb(*color),
                        num(width_mm / PT_TO_MM),
                        num(x1_mm / PT_TO_MM),
                        num(x2_mm / PT_TO_MM),
                    )
                    .as_bytes(),
                );
            }
        }
    }
    out
}

/// Fixed two-decimal formatting with trailing zeros removed.
fn num(value: f32) -> String {
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

fn rgb(color: Rgb) -> String {
    let channel = |c: u8| {
        let formatted = format!("{:.3}", f32::from(c) / 255.0);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    };
    format!("{} {} {}", channel(color.0), channel(color.1), channel(color.2))
}

fn literal(text: &str) -> String {
    String::from_utf8_lossy(&encode_text(text)).into_owned()
}

/// Encodes text as a PDF literal string in WinAnsiEncoding.
///
/// Characters outside the encoding become `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for c in text.chars() {
        match win_ansi(c) {
            byte @ (b'(' | b')' | b'\\') => {
                out.push(b'\\');
                out.push(byte);
            }
            byte @ 0x20..=0x7E => out.push(byte),
            byte => out.extend_from_slice(format!("\\{byte:03o}").as_bytes()),
        }
    }
    out.push(b')');
    out
}

fn win_ansi(c: char) -> u8 {
    match c {
        '\t' => b' ',
        ' '..='~' => c as u8,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => b'?',
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Object writer
// ────────────────────────────────────────────────────────────────────────────

struct PdfWriter {
    buf: BytesMut,
    /// Byte offset of each object, indexed by object id - 1.
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = BytesMut::with_capacity(16 * 1024);
        buf.put_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self, id: usize) {
        if self.offsets.len() < id {
            self.offsets.resize(id, 0);
        }
        self.offsets[id - 1] = self.buf.len();
        self.buf.put_slice(format!("{id} 0 obj\n").as_bytes());
    }

    fn object(&mut self, id: usize, body: &str) {
        self.begin(id);
        self.buf.put_slice(body.as_bytes());
        self.buf.put_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, data: &[u8]) {
        self.begin(id);
        self.buf
            .put_slice(format!("<< /Length {} >>\nstream\n", data.len()).as_bytes());
        self.buf.put_slice(data);
        self.buf.put_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Bytes {
        let xref_offset = self.buf.len();
        let size = self.offsets.len() + 1;

        self.buf
            .put_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
        for offset in &self.offsets {
            self.buf
                .put_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        self.buf.put_slice(
            format!(
                "trailer\n<< /Size {size} /Root {CATALOG_ID} 0 R /Info {INFO_ID} 0 R >>\n\
                 startxref\n{xref_offset}\n%%EOF\n"
            )
            .as_bytes(),
        );
        self.buf.freeze()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
