//! Drawing surface abstraction and the work-order page painter.
//!
//! Coordinates are millimeters from the top-left corner of an A4 page.

use tracing::warn;

use super::layout::{DocumentLayout, Page, Row};
use super::text::to_ascii;
use super::thumbnail::{decode_data_url, Thumbnail};
use crate::config::weight::format_grams;

/// A4 width in millimeters.
pub const PAGE_WIDTH_MM: f64 = 210.0;
/// A4 height in millimeters.
pub const PAGE_HEIGHT_MM: f64 = 297.0;
/// Page margin in millimeters.
pub const MARGIN_MM: f64 = 15.0;

/// Font weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

/// Horizontal anchor of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// RGB color, 0-255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const DARK: Rgb = Rgb(51, 51, 51);
    pub const MUTED: Rgb = Rgb(102, 102, 102);
    pub const FAINT: Rgb = Rgb(150, 150, 150);
    pub const BORDER: Rgb = Rgb(221, 221, 221);
    pub const SHADE: Rgb = Rgb(248, 249, 250);
}

/// Low-level drawing operations a renderer engine provides.
pub trait Canvas {
    /// Whether text may contain non-ASCII letters.
    fn supports_unicode(&self) -> bool;

    /// Start a new blank page.
    fn begin_page(&mut self);

    /// Select font and size (points) for following text.
    fn set_font(&mut self, font: Font, size: f64);

    /// Color for following text and fills.
    fn set_fill_color(&mut self, color: Rgb);

    /// Color for following lines and outlines.
    fn set_stroke_color(&mut self, color: Rgb);

    /// Draw a text run with its baseline at `y`.
    fn draw_text(&mut self, x: f64, y: f64, text: &str, align: Align);

    /// Draw a straight line.
    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, width: f64);

    /// Draw a rectangle, filled or outlined.
    fn draw_rect(&mut self, x: f64, y: f64, width: f64, height: f64, filled: bool);

    /// Draw an image scaled into the given box.
    fn draw_image(&mut self, image: &Thumbnail, x: f64, y: f64, width: f64, height: f64);
}

// Column anchors in millimeters.
const COL_SEQ: f64 = MARGIN_MM;
const COL_IMAGE: f64 = 22.0;
const COL_QTY: f64 = 140.0;
const COL_METAL: f64 = 158.0;
const COL_STONE: f64 = 176.0;
const COL_TOTAL: f64 = PAGE_WIDTH_MM - MARGIN_MM;

const TABLE_HEADER_Y: f64 = 60.0;
const FIRST_ROW_Y: f64 = 64.0;
const NOTE_HEIGHT: f64 = 5.0;
const SIGNATURE_Y: f64 = 274.0;
const FOOTER_Y: f64 = 287.0;

/// Paint every page of `layout` onto `canvas`.
pub fn draw_layout(layout: &DocumentLayout, canvas: &mut dyn Canvas) {
    let mut painter = Painter {
        canvas,
        layout,
        unicode: false,
    };
    painter.unicode = painter.canvas.supports_unicode();
    for page in &layout.pages {
        painter.page(page);
    }
}

struct Painter<'a> {
    canvas: &'a mut dyn Canvas,
    layout: &'a DocumentLayout,
    unicode: bool,
}

impl Painter<'_> {
    fn text(&mut self, x: f64, y: f64, text: &str, align: Align) {
        if self.unicode {
            self.canvas.draw_text(x, y, text, align);
        } else {
            self.canvas.draw_text(x, y, &to_ascii(text), align);
        }
    }

    fn code_column(&self) -> f64 {
        if self.layout.show_images {
            COL_IMAGE + self.layout.image_size_mm + 2.0
        } else {
            COL_IMAGE
        }
    }

    fn row_height(&self) -> f64 {
        if self.layout.show_images {
            self.layout.image_size_mm + 1.0
        } else {
            7.0
        }
    }

    fn page(&mut self, page: &Page) {
        self.canvas.begin_page();
        self.header(page);
        self.meta();
        self.table(page);
        if page.is_last() {
            self.signature();
        }
        self.footer();
    }

    fn header(&mut self, page: &Page) {
        let center = PAGE_WIDTH_MM / 2.0;
        self.canvas.set_fill_color(Rgb::DARK);
        self.canvas.set_font(Font::Bold, 16.0);
        let title = self.layout.title.clone();
        self.text(center, 22.0, &title, Align::Center);

        self.canvas.set_fill_color(Rgb::MUTED);
        self.canvas.set_font(Font::Regular, 10.0);
        let subtitle = self.layout.subtitle.clone();
        self.text(center, 29.0, &subtitle, Align::Center);

        if let Some(label) = page.label() {
            self.canvas.set_font(Font::Regular, 9.0);
            self.text(COL_TOTAL, 15.0, &label, Align::Right);
        }

        self.canvas.set_stroke_color(Rgb::DARK);
        self.canvas
            .draw_line(MARGIN_MM, 33.0, PAGE_WIDTH_MM - MARGIN_MM, 33.0, 0.6);
    }

    fn meta(&mut self) {
        let meta = self.layout.meta.clone();
        let right = 118.0;
        self.canvas.set_fill_color(Rgb::BLACK);
        self.canvas.set_font(Font::Bold, 10.0);
        self.text(MARGIN_MM, 40.0, &format!("İş Emri No: {}", meta.order_number), Align::Left);
        self.text(right, 40.0, &format!("Tarih: {}", meta.date), Align::Left);
        self.text(MARGIN_MM, 46.0, &format!("Müşteri: {}", meta.customer), Align::Left);
        self.text(
            right,
            46.0,
            &format!("Toplam Adet: {} ({} kalem)", meta.total_items, meta.line_count),
            Align::Left,
        );

        self.canvas.set_font(Font::Regular, 10.0);
        self.text(
            MARGIN_MM,
            52.0,
            &format!("Metal Ağırlığı: {}", format_grams(meta.total_metal_weight)),
            Align::Left,
        );
        self.text(
            80.0,
            52.0,
            &format!("Taş Ağırlığı: {}", format_grams(meta.total_stone_weight)),
            Align::Left,
        );
        self.canvas.set_font(Font::Bold, 10.0);
        self.text(
            right,
            52.0,
            &format!("Toplam Ağırlık: {}", format_grams(meta.total_weight)),
            Align::Left,
        );

        self.canvas.set_stroke_color(Rgb::BORDER);
        self.canvas
            .draw_line(MARGIN_MM, 56.0, PAGE_WIDTH_MM - MARGIN_MM, 56.0, 0.3);
    }

    fn table(&mut self, page: &Page) {
        let code_x = self.code_column();
        let description_x = code_x + 20.0;

        self.canvas.set_fill_color(Rgb::DARK);
        self.canvas.set_font(Font::Bold, 9.0);
        self.text(COL_SEQ, TABLE_HEADER_Y, "#", Align::Left);
        self.text(code_x, TABLE_HEADER_Y, "Kod", Align::Left);
        self.text(description_x, TABLE_HEADER_Y, "Açıklama", Align::Left);
        self.text(COL_QTY, TABLE_HEADER_Y, "Adet", Align::Right);
        self.text(COL_METAL, TABLE_HEADER_Y, "Metal", Align::Right);
        self.text(COL_STONE, TABLE_HEADER_Y, "Taş", Align::Right);
        self.text(COL_TOTAL, TABLE_HEADER_Y, "Toplam", Align::Right);
        self.canvas.set_stroke_color(Rgb::BORDER);
        self.canvas.draw_line(
            MARGIN_MM,
            TABLE_HEADER_Y + 1.5,
            PAGE_WIDTH_MM - MARGIN_MM,
            TABLE_HEADER_Y + 1.5,
            0.3,
        );

        let mut y = FIRST_ROW_Y;
        for row in &page.rows {
            y = self.row(row, y, code_x, description_x);
        }
    }

    /// Draw one row starting at `top`; returns the top of the next row.
    fn row(&mut self, row: &Row, top: f64, code_x: f64, description_x: f64) -> f64 {
        let height = self.row_height();
        let baseline = top + height / 2.0 + 1.5;

        if row.seq % 2 == 0 {
            self.canvas.set_fill_color(Rgb::SHADE);
            self.canvas
                .draw_rect(MARGIN_MM, top, PAGE_WIDTH_MM - 2.0 * MARGIN_MM, height, true);
        }

        if self.layout.show_images {
            self.thumbnail(row, top + 0.5);
        }

        self.canvas.set_fill_color(Rgb::BLACK);
        self.canvas.set_font(Font::Regular, 9.0);
        self.text(COL_SEQ, baseline, &row.seq.to_string(), Align::Left);
        self.canvas.set_font(Font::Bold, 9.0);
        self.text(code_x, baseline, &row.code, Align::Left);
        self.canvas.set_font(Font::Regular, 9.0);
        self.text(description_x, baseline, &row.description, Align::Left);
        self.text(COL_QTY, baseline, &row.quantity.to_string(), Align::Right);
        self.text(COL_METAL, baseline, &format_grams(row.metal_weight), Align::Right);
        self.text(COL_STONE, baseline, &format_grams(row.stone_weight), Align::Right);
        self.canvas.set_font(Font::Bold, 9.0);
        self.text(COL_TOTAL, baseline, &format_grams(row.line_total), Align::Right);

        let mut next = top + height;
        if let Some(note) = &row.note {
            self.canvas.set_fill_color(Rgb::MUTED);
            self.canvas.set_font(Font::Regular, 8.0);
            self.text(description_x + 4.0, next + 3.5, &format!("Not: {}", note), Align::Left);
            next += NOTE_HEIGHT;
        }
        next
    }

    fn thumbnail(&mut self, row: &Row, top: f64) {
        let size = self.layout.image_size_mm;
        self.canvas.set_stroke_color(Rgb::BORDER);
        self.canvas.draw_rect(COL_IMAGE, top, size, size, false);

        let decoded = match row.image.as_deref().map(decode_data_url) {
            Some(Ok(thumb)) => Some(thumb),
            Some(Err(e)) => {
                warn!("Image for {} not drawn: {}", row.code, e);
                None
            }
            None => None,
        };

        match decoded {
            Some(thumb) => {
                let (w, h) = fit(thumb.width, thumb.height, size);
                let x = COL_IMAGE + (size - w) / 2.0;
                let y = top + (size - h) / 2.0;
                self.canvas.draw_image(&thumb, x, y, w, h);
            }
            None => {
                self.canvas.set_fill_color(Rgb::FAINT);
                self.canvas.set_font(Font::Regular, 6.0);
                self.text(COL_IMAGE + size / 2.0, top + size / 2.0 + 1.0, "RESİM", Align::Center);
            }
        }
    }

    fn signature(&mut self) {
        let left = MARGIN_MM;
        let right = PAGE_WIDTH_MM / 2.0 + 10.0;
        let width = PAGE_WIDTH_MM / 2.0 - MARGIN_MM - 10.0;

        self.canvas.set_stroke_color(Rgb::DARK);
        self.canvas
            .draw_line(left, SIGNATURE_Y, left + width, SIGNATURE_Y, 0.5);
        self.canvas
            .draw_line(right, SIGNATURE_Y, right + width, SIGNATURE_Y, 0.5);

        self.canvas.set_fill_color(Rgb::BLACK);
        self.canvas.set_font(Font::Regular, 9.0);
        let signature = self.layout.signature_label.clone();
        let completion = self.layout.completion_label.clone();
        self.text(left + width / 2.0, SIGNATURE_Y + 4.5, &signature, Align::Center);
        self.text(right + width / 2.0, SIGNATURE_Y + 4.5, &completion, Align::Center);

        self.canvas.set_fill_color(Rgb::MUTED);
        self.canvas.set_font(Font::Regular, 8.0);
        let stamp = format!("Oluşturulma: {}", self.layout.generated_at);
        self.text(PAGE_WIDTH_MM / 2.0, FOOTER_Y + 5.0, &stamp, Align::Center);
    }

    fn footer(&mut self) {
        self.canvas.set_fill_color(Rgb::MUTED);
        self.canvas.set_font(Font::Regular, 8.0);
        let footer = self.layout.footer.clone();
        self.text(PAGE_WIDTH_MM / 2.0, FOOTER_Y, &footer, Align::Center);
    }
}

/// Scale `width`×`height` pixels into a square box, keeping the aspect ratio.
fn fit(width: u32, height: u32, size: f64) -> (f64, f64) {
    let (w, h) = (width.max(1) as f64, height.max(1) as f64);
    let scale = size / w.max(h);
    (w * scale, h * scale)
}

#[cfg(test)]
pub(crate) mod recording {
    //! A canvas that records calls, for layout assertions.

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Page,
        Text(String),
        Image,
        Line,
        Rect,
    }

    pub struct RecordingCanvas {
        pub unicode: bool,
        pub ops: Vec<Op>,
    }

    impl RecordingCanvas {
        pub fn new(unicode: bool) -> Self {
            Self {
                unicode,
                ops: Vec::new(),
            }
        }

        pub fn texts(&self) -> Vec<&str> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, wanted: &Op) -> usize {
            self.ops.iter().filter(|op| *op == wanted).count()
        }
    }

    impl Canvas for RecordingCanvas {
        fn supports_unicode(&self) -> bool {
            self.unicode
        }
        fn begin_page(&mut self) {
            self.ops.push(Op::Page);
        }
        fn set_font(&mut self, _font: Font, _size: f64) {}
        fn set_fill_color(&mut self, _color: Rgb) {}
        fn set_stroke_color(&mut self, _color: Rgb) {}
        fn draw_text(&mut self, _x: f64, _y: f64, text: &str, _align: Align) {
            self.ops.push(Op::Text(text.to_string()));
        }
        fn draw_line(&mut self, _x1: f64, _y1: f64, _x2: f64, _y2: f64, _width: f64) {
            self.ops.push(Op::Line);
        }
        fn draw_rect(&mut self, _x: f64, _y: f64, _w: f64, _h: f64, _filled: bool) {
            self.ops.push(Op::Rect);
        }
        fn draw_image(&mut self, _image: &Thumbnail, _x: f64, _y: f64, _w: f64, _h: f64) {
            self.ops.push(Op::Image);
        }
    }
}
