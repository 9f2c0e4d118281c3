//! Minimal PDF 1.4 writer.
//!
//! Produces A4 pages using the base-14 Helvetica fonts (WinAnsi, so text must
//! already be ASCII) and uncompressed RGB image XObjects.

use std::fmt::Write;

use super::canvas::{Align, Canvas, Font, Rgb, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use super::thumbnail::Thumbnail;
use crate::error::{Result, WorkOrderError};

/// Points per millimeter.
const PT_PER_MM: f64 = 72.0 / 25.4;

/// Average Helvetica glyph advance as a fraction of the font size, used to
/// anchor centered and right-aligned text.
const AVG_GLYPH_WIDTH: f64 = 0.52;

#[inline]
fn pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// Convert a top-down millimeter y into a bottom-up point y.
#[inline]
fn flip_y(mm: f64) -> f64 {
    pt(PAGE_HEIGHT_MM - mm)
}

/// Format a number with at most two decimals.
fn num(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Escape a string for a PDF literal `( ... )`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// PDF writer implementing [`Canvas`].
pub struct PdfWriter {
    pages: Vec<String>,
    /// Image indices referenced by each page.
    page_images: Vec<Vec<usize>>,
    images: Vec<Thumbnail>,
    font: Font,
    font_size: f64,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            page_images: Vec::new(),
            images: Vec::new(),
            font: Font::Regular,
            font_size: 10.0,
        }
    }

    /// Number of pages started so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn content(&mut self) -> &mut String {
        if self.pages.is_empty() {
            self.begin_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn font_name(font: Font) -> &'static str {
        match font {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    /// Assemble the document.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            return Err(WorkOrderError::Engine("document has no pages".to_string()));
        }

        // Object numbering: 1 catalog, 2 page tree, 3-4 fonts, then images,
        // then a (page, content) pair per page.
        let first_image = 5;
        let first_page = first_image + self.images.len();
        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| first_page + 2 * i).collect();

        let mut out = PdfBuffer::new();
        out.raw(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        out.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        out.object(
            2,
            &format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_ids.len()),
        );
        out.object(
            3,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
        );
        out.object(
            4,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
        );

        for (i, image) in self.images.iter().enumerate() {
            let dict = format!(
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Length {} >>",
                image.width,
                image.height,
                image.rgb.len()
            );
            out.stream(first_image + i, &dict, &image.rgb);
        }

        let media_box = format!("[0 0 {} {}]", num(pt(PAGE_WIDTH_MM)), num(pt(PAGE_HEIGHT_MM)));
        for (i, content) in self.pages.iter().enumerate() {
            let page_id = page_ids[i];
            let mut xobjects = String::new();
            for &image in &self.page_images[i] {
                write!(xobjects, " /Im{} {} 0 R", image + 1, first_image + image).unwrap();
            }
            let resources = format!(
                "<< /Font << /F1 3 0 R /F2 4 0 R >> /XObject <<{} >> >>",
                xobjects
            );
            out.object(
                page_id,
                &format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox {} /Resources {} /Contents {} 0 R >>",
                    media_box,
                    resources,
                    page_id + 1
                ),
            );
            out.stream(
                page_id + 1,
                &format!("<< /Length {} >>", content.len()),
                content.as_bytes(),
            );
        }

        Ok(out.finish(1))
    }
}

impl Canvas for PdfWriter {
    fn supports_unicode(&self) -> bool {
        false
    }

    fn begin_page(&mut self) {
        self.pages.push(String::new());
        self.page_images.push(Vec::new());
    }

    fn set_font(&mut self, font: Font, size: f64) {
        self.font = font;
        self.font_size = size;
    }

    fn set_fill_color(&mut self, color: Rgb) {
        let Rgb(r, g, b) = color;
        writeln!(
            self.content(),
            "{} {} {} rg",
            num(r as f64 / 255.0),
            num(g as f64 / 255.0),
            num(b as f64 / 255.0)
        )
        .unwrap();
    }

    fn set_stroke_color(&mut self, color: Rgb) {
        let Rgb(r, g, b) = color;
        writeln!(
            self.content(),
            "{} {} {} RG",
            num(r as f64 / 255.0),
            num(g as f64 / 255.0),
            num(b as f64 / 255.0)
        )
        .unwrap();
    }

    fn draw_text(&mut self, x: f64, y: f64, text: &str, align: Align) {
        let width_pt = text.chars().count() as f64 * self.font_size * AVG_GLYPH_WIDTH;
        let x_pt = match align {
            Align::Left => pt(x),
            Align::Center => pt(x) - width_pt / 2.0,
            Align::Right => pt(x) - width_pt,
        };
        let font = Self::font_name(self.font);
        let size = self.font_size;
        writeln!(
            self.content(),
            "BT /{} {} Tf {} {} Td ({}) Tj ET",
            font,
            num(size),
            num(x_pt),
            num(flip_y(y)),
            escape_text(text)
        )
        .unwrap();
    }

    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, width: f64) {
        writeln!(
            self.content(),
            "{} w {} {} m {} {} l S",
            num(pt(width)),
            num(pt(x1)),
            num(flip_y(y1)),
            num(pt(x2)),
            num(flip_y(y2))
        )
        .unwrap();
    }

    fn draw_rect(&mut self, x: f64, y: f64, width: f64, height: f64, filled: bool) {
        writeln!(
            self.content(),
            "{} {} {} {} re {}",
            num(pt(x)),
            num(flip_y(y + height)),
            num(pt(width)),
            num(pt(height)),
            if filled { "f" } else { "S" }
        )
        .unwrap();
    }

    fn draw_image(&mut self, image: &Thumbnail, x: f64, y: f64, width: f64, height: f64) {
        if self.pages.is_empty() {
            self.begin_page();
        }
        let index = self.images.len();
        self.images.push(image.clone());
        let last = self.pages.len() - 1;
        self.page_images[last].push(index);
        writeln!(
            self.content(),
            "q {} 0 0 {} {} {} cm /Im{} Do Q",
            num(pt(width)),
            num(pt(height)),
            num(pt(x)),
            num(flip_y(y + height)),
            index + 1
        )
        .unwrap();
    }
}

/// Byte buffer that tracks object offsets for the cross-reference table.
struct PdfBuffer {
    bytes: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl PdfBuffer {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            offsets: Vec::new(),
        }
    }

    fn raw(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    fn object(&mut self, id: usize, body: &str) {
        self.offsets.push((id, self.bytes.len()));
        self.raw(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
    }

    fn stream(&mut self, id: usize, dict: &str, data: &[u8]) {
        self.offsets.push((id, self.bytes.len()));
        self.raw(format!("{} 0 obj\n{}\nstream\n", id, dict).as_bytes());
        self.raw(data);
        self.raw(b"\nendstream\nendobj\n");
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        self.offsets.sort_unstable();
        let size = self.offsets.len() + 1;
        let xref_at = self.bytes.len();

        let mut table = String::new();
        writeln!(table, "xref\n0 {}", size).unwrap();
        table.push_str("0000000000 65535 f \n");
        for (_, offset) in &self.offsets {
            writeln!(table, "{:010} 00000 n ", offset).unwrap();
        }
        write!(
            table,
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, root, xref_at
        )
        .unwrap();
        self.raw(table.as_bytes());
        self.bytes
    }
}
