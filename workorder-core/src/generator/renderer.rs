//! Document renderers and the primary-then-fallback strategy.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::canvas::draw_layout;
use super::html::render_html;
use super::layout::DocumentLayout;
use super::pdf::PdfWriter;
use crate::clock::Clock;
use crate::config::DocumentConfig;
use crate::error::{Result, WorkOrderError};
use crate::model::Order;

/// Output format of a rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Html,
}

impl DocumentFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Html => "html",
        }
    }

    /// MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Html => "text/html; charset=utf-8",
        }
    }
}

/// `WorkOrder_<orderNumber>.<ext>`.
pub fn document_file_name(order_number: &str, format: DocumentFormat) -> String {
    format!("WorkOrder_{}.{}", order_number, format.extension())
}

/// A finished document held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub format: DocumentFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl RenderedDocument {
    /// Write the document into `dir` under its file name.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        info!("Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// One way of turning a page layout into document bytes.
pub trait DocumentRenderer {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Output format.
    fn format(&self) -> DocumentFormat;

    /// Render the layout.
    fn render(&self, layout: &DocumentLayout) -> Result<Vec<u8>>;
}

/// PDF through the built-in writer. Text is transliterated to ASCII.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn render(&self, layout: &DocumentLayout) -> Result<Vec<u8>> {
        let mut writer = PdfWriter::new();
        draw_layout(layout, &mut writer);
        writer.finish()
    }
}

/// Printable HTML page with native Unicode text.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl DocumentRenderer for HtmlRenderer {
    fn name(&self) -> &'static str {
        "html"
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Html
    }

    fn render(&self, layout: &DocumentLayout) -> Result<Vec<u8>> {
        Ok(render_html(layout).into_bytes())
    }
}

/// Tries the primary renderer once, then the fallback once.
pub struct FallbackRenderer {
    primary: Box<dyn DocumentRenderer>,
    fallback: Box<dyn DocumentRenderer>,
}

impl Default for FallbackRenderer {
    fn default() -> Self {
        Self::new(Box::new(PdfRenderer), Box::new(HtmlRenderer))
    }
}

impl FallbackRenderer {
    pub fn new(primary: Box<dyn DocumentRenderer>, fallback: Box<dyn DocumentRenderer>) -> Self {
        Self { primary, fallback }
    }

    /// Render an already computed layout.
    pub fn render_layout(&self, layout: &DocumentLayout) -> Result<RenderedDocument> {
        let order_number = &layout.meta.order_number;

        let primary_error = match self.attempt(self.primary.as_ref(), layout) {
            Ok(doc) => return Ok(doc),
            Err(e) => e,
        };
        warn!(
            "{} renderer failed for {}: {}; trying {}",
            self.primary.name(),
            order_number,
            primary_error,
            self.fallback.name()
        );

        match self.attempt(self.fallback.as_ref(), layout) {
            Ok(doc) => Ok(doc),
            Err(fallback_error) => {
                error!(
                    "{} renderer also failed for {}: {}",
                    self.fallback.name(),
                    order_number,
                    fallback_error
                );
                Err(WorkOrderError::RenderingFailed {
                    primary: primary_error.to_string(),
                    fallback: fallback_error.to_string(),
                })
            }
        }
    }

    fn attempt(
        &self,
        renderer: &dyn DocumentRenderer,
        layout: &DocumentLayout,
    ) -> Result<RenderedDocument> {
        let bytes = renderer.render(layout)?;
        let format = renderer.format();
        info!(
            "Rendered {} as {} ({} pages)",
            layout.meta.order_number,
            format.extension(),
            layout.page_count()
        );
        Ok(RenderedDocument {
            format,
            file_name: document_file_name(&layout.meta.order_number, format),
            bytes,
        })
    }

    /// Lay out and render an order, stamping it with the clock's time.
    pub fn render(
        &self,
        order: &Order,
        config: &DocumentConfig,
        clock: &dyn Clock,
    ) -> Result<RenderedDocument> {
        let layout = DocumentLayout::build(order, config, clock.now_local());
        self.render_layout(&layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ErrorCode;
    use crate::model::{LineItem, Product};
    use chrono::NaiveDate;

    struct Broken(&'static str);

    impl DocumentRenderer for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn format(&self) -> DocumentFormat {
            DocumentFormat::Pdf
        }
        fn render(&self, _layout: &DocumentLayout) -> Result<Vec<u8>> {
            Err(WorkOrderError::Engine(self.0.to_string()))
        }
    }

    fn order() -> Order {
        let mut order = Order::new(
            "WO-20240115-0930",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        );
        order.customer_name = "Ayşe Yılmaz".to_string();
        let product = Product::new("KP001", 2.8, 0.0, "Gold", "Hoop Earrings", "Dokulu altın halka küpe");
        order.items.push(LineItem::from_product(&product, 2, ""));
        order.recompute_totals();
        order
    }

    fn clock() -> FixedClock {
        FixedClock::at(2024, 1, 15, 10, 0)
    }

    #[test]
    fn test_default_renders_pdf() {
        let doc = FallbackRenderer::default()
            .render(&order(), &DocumentConfig::default(), &clock())
            .unwrap();
        assert_eq!(doc.format, DocumentFormat::Pdf);
        assert_eq!(doc.file_name, "WorkOrder_WO-20240115-0930.pdf");
        assert!(doc.bytes.starts_with(b"%PDF-1.4"));
        let text = String::from_utf8_lossy(&doc.bytes);
        assert!(text.contains("(Musteri: Ayse Yilmaz) Tj"));
    }

    #[test]
    fn test_falls_back_to_html() {
        let renderer = FallbackRenderer::new(Box::new(Broken("no engine")), Box::new(HtmlRenderer));
        let doc = renderer
            .render(&order(), &DocumentConfig::default(), &clock())
            .unwrap();
        assert_eq!(doc.format, DocumentFormat::Html);
        assert_eq!(doc.file_name, "WorkOrder_WO-20240115-0930.html");
        assert!(String::from_utf8(doc.bytes).unwrap().contains("Ayşe Yılmaz"));
    }

    #[test]
    fn test_both_failing_reports_both() {
        let renderer = FallbackRenderer::new(Box::new(Broken("one")), Box::new(Broken("two")));
        let err = renderer
            .render(&order(), &DocumentConfig::default(), &clock())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::RenderingFailed);
        let message = err.to_string();
        assert!(message.contains("one") && message.contains("two"));
    }

    #[test]
    fn test_save_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let doc = FallbackRenderer::default()
            .render(&order(), &DocumentConfig::default(), &clock())
            .unwrap();
        let path = doc.save_to(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "WorkOrder_WO-20240115-0930.pdf");
        assert_eq!(std::fs::read(path).unwrap(), doc.bytes);
    }
}
