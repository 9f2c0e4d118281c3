//! Page model for printed work orders.
//!
//! The layout is computed once per document and shared by every renderer, so
//! pagination never differs between the PDF and the HTML output.

use chrono::NaiveDateTime;

use super::text::truncate_chars;
use crate::config::DocumentConfig;
use crate::model::Order;

/// Order-level block repeated under every page header.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderMeta {
    pub order_number: String,
    /// `dd.mm.yyyy`.
    pub date: String,
    pub customer: String,
    pub line_count: usize,
    pub total_items: u32,
    pub total_metal_weight: f64,
    pub total_stone_weight: f64,
    pub total_weight: f64,
}

/// One printed line item.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based position across the whole document.
    pub seq: usize,
    pub code: String,
    /// Already truncated.
    pub description: String,
    pub quantity: u32,
    pub metal_weight: f64,
    pub stone_weight: f64,
    /// Unit total weight times quantity.
    pub line_total: f64,
    pub note: Option<String>,
    /// Data URL, when the line carries an image.
    pub image: Option<String>,
}

/// One printed page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based.
    pub number: usize,
    pub count: usize,
    pub rows: Vec<Row>,
}

impl Page {
    /// `Sayfa i / n`, only when the document spans several pages.
    pub fn label(&self) -> Option<String> {
        (self.count > 1).then(|| format!("Sayfa {} / {}", self.number, self.count))
    }

    /// Check if this is the final page.
    pub fn is_last(&self) -> bool {
        self.number == self.count
    }
}

/// A fully paginated document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub title: String,
    pub subtitle: String,
    pub footer: String,
    pub signature_label: String,
    pub completion_label: String,
    pub show_images: bool,
    pub image_size_mm: f64,
    pub meta: OrderMeta,
    pub pages: Vec<Page>,
    /// `dd.mm.yyyy HH:MM`.
    pub generated_at: String,
}

impl DocumentLayout {
    /// Paginate `order` with the settings in `config`.
    ///
    /// An order without lines still yields one page carrying the header and
    /// signature block.
    pub fn build(order: &Order, config: &DocumentConfig, generated_at: NaiveDateTime) -> Self {
        let per_page = config.items_per_page.max(1);
        let rows: Vec<Row> = order
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| Row {
                seq: i + 1,
                code: item.code.clone(),
                description: truncate_chars(&item.description, config.description_max_chars),
                quantity: item.quantity,
                metal_weight: item.metal_weight,
                stone_weight: item.stone_weight,
                line_total: item.line_weight(),
                note: item.has_notes().then(|| item.notes.trim().to_string()),
                image: item
                    .image_data
                    .clone()
                    .filter(|d| config.enable_images && !d.is_empty()),
            })
            .collect();

        let mut chunks: Vec<Vec<Row>> = rows.chunks(per_page).map(<[Row]>::to_vec).collect();
        if chunks.is_empty() {
            chunks.push(Vec::new());
        }
        let count = chunks.len();
        let pages = chunks
            .into_iter()
            .enumerate()
            .map(|(i, rows)| Page {
                number: i + 1,
                count,
                rows,
            })
            .collect();

        let customer = if order.customer_name.trim().is_empty() {
            "Belirtilmemiş".to_string()
        } else {
            order.customer_name.clone()
        };

        Self {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            footer: config.footer.clone(),
            signature_label: config.signature_label.clone(),
            completion_label: config.completion_label.clone(),
            show_images: config.enable_images,
            image_size_mm: config.image_size_mm,
            meta: OrderMeta {
                order_number: order.order_number.clone(),
                date: order.date.format("%d.%m.%Y").to_string(),
                customer,
                line_count: order.totals.line_count,
                total_items: order.totals.total_items,
                total_metal_weight: order.totals.total_metal_weight,
                total_stone_weight: order.totals.total_stone_weight,
                total_weight: order.totals.total_weight,
            },
            pages,
            generated_at: generated_at.format("%d.%m.%Y %H:%M").to_string(),
        }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineItem, Product};
    use chrono::NaiveDate;

    fn order_with(lines: usize) -> Order {
        let mut order = Order::new(
            "WO-20240115-0930",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        );
        order.customer_id = Some("CUST_1".to_string());
        order.customer_name = "Ayşe Yılmaz".to_string();
        for i in 0..lines {
            let product = Product::new(
                format!("KP{:03}", i + 1),
                2.5,
                0.5,
                "Gold",
                "Hoop Earrings",
                "Dokulu altın halka küpe, çok uzun bir açıklama metni",
            );
            order.items.push(LineItem::from_product(&product, 2, ""));
        }
        order.recompute_totals();
        order
    }

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_23_items_make_three_pages() {
        let layout = DocumentLayout::build(&order_with(23), &DocumentConfig::default(), stamp());
        let sizes: Vec<usize> = layout.pages.iter().map(|p| p.rows.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        assert_eq!(layout.pages[2].label().as_deref(), Some("Sayfa 3 / 3"));
        assert!(layout.pages[2].is_last());
        assert_eq!(layout.pages[1].rows[0].seq, 11);
    }

    #[test]
    fn test_single_page_has_no_label() {
        let layout = DocumentLayout::build(&order_with(4), &DocumentConfig::default(), stamp());
        assert_eq!(layout.page_count(), 1);
        assert_eq!(layout.pages[0].label(), None);
    }

    #[test]
    fn test_empty_order_still_has_a_page() {
        let layout = DocumentLayout::build(&order_with(0), &DocumentConfig::default(), stamp());
        assert_eq!(layout.page_count(), 1);
        assert!(layout.pages[0].rows.is_empty());
    }

    #[test]
    fn test_row_fields() {
        let mut order = order_with(1);
        order.items[0].notes = "  rodaj  ".to_string();
        let layout = DocumentLayout::build(&order, &DocumentConfig::default(), stamp());
        let row = &layout.pages[0].rows[0];

        assert_eq!(row.description.chars().count(), 38);
        assert!(row.description.ends_with("..."));
        assert_eq!(row.line_total, 6.0);
        assert_eq!(row.note.as_deref(), Some("rodaj"));
        assert_eq!(layout.meta.date, "15.01.2024");
        assert_eq!(layout.generated_at, "15.01.2024 10:05");
    }

    #[test]
    fn test_images_dropped_when_disabled() {
        let mut order = order_with(1);
        order.items[0].image_data = Some("data:image/png;base64,AAAA".to_string());
        let config = DocumentConfig {
            enable_images: false,
            ..Default::default()
        };
        let layout = DocumentLayout::build(&order, &config, stamp());
        assert!(layout.pages[0].rows[0].image.is_none());
    }

    #[test]
    fn test_custom_page_size() {
        let config = DocumentConfig {
            items_per_page: 4,
            ..Default::default()
        };
        let layout = DocumentLayout::build(&order_with(9), &config, stamp());
        assert_eq!(layout.page_count(), 3);
    }
}
