//! Printable HTML rendering of a work order.
//!
//! Browsers render Unicode natively, so text is kept as-is. The page asks the
//! browser to print itself once loaded.

use std::fmt::Write;

use super::layout::{DocumentLayout, Page, Row};
use crate::config::weight::format_grams;

const STYLE: &str = r#"
@page { margin: 15mm; size: A4; }
body { font-family: Arial, sans-serif; margin: 0; padding: 20px; font-size: 11pt; line-height: 1.4; color: #333; }
.page { page-break-after: always; }
.page:last-of-type { page-break-after: auto; }
.header { text-align: center; border-bottom: 2px solid #333; padding-bottom: 12px; margin-bottom: 16px; position: relative; }
.header h1 { font-size: 20pt; margin: 0; }
.header p { margin: 6px 0 0 0; color: #666; }
.page-label { position: absolute; right: 0; top: 0; font-size: 9pt; color: #666; }
.order-info { display: grid; grid-template-columns: 1fr 1fr; gap: 6px 20px; padding: 12px; background: #f9f9f9; border: 1px solid #ddd; margin-bottom: 16px; }
.order-info div { font-weight: bold; }
table { width: 100%; border-collapse: collapse; font-size: 10pt; }
th { text-align: left; border-bottom: 1px solid #ccc; padding: 4px; }
td { padding: 4px; border-bottom: 1px solid #eee; vertical-align: middle; }
td.num, th.num { text-align: right; }
tr.note td { font-style: italic; color: #666; border-bottom: 1px solid #ddd; }
.thumb { width: 48px; height: 48px; border: 1px solid #ddd; border-radius: 4px; display: flex; align-items: center; justify-content: center; overflow: hidden; background: #fff; color: #999; font-size: 7pt; }
.thumb img { width: 100%; height: 100%; object-fit: cover; }
.signature-area { margin-top: 40px; display: grid; grid-template-columns: 1fr 1fr; gap: 40px; text-align: center; }
.signature-field { border-bottom: 2px solid #333; height: 30px; margin-bottom: 5px; }
.footer { margin-top: 30px; text-align: center; font-size: 9pt; color: #666; border-top: 1px solid #ccc; padding-top: 8px; }
.no-print { text-align: center; margin: 20px; }
@media print { body { padding: 0; } .no-print { display: none; } }
"#;

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Only image data URLs are allowed into `src`.
fn safe_image_src(url: &str) -> Option<&str> {
    let ok = url.starts_with("data:image/")
        && url
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+/=:;,._-".contains(c));
    ok.then_some(url)
}

/// Render the whole document as a standalone HTML page.
pub fn render_html(layout: &DocumentLayout) -> String {
    let mut out = String::new();
    writeln!(out, "<!DOCTYPE html>").unwrap();
    writeln!(out, "<html lang=\"tr\">").unwrap();
    writeln!(out, "<head>").unwrap();
    writeln!(out, "<meta charset=\"utf-8\">").unwrap();
    writeln!(
        out,
        "<title>İş Emri {}</title>",
        escape_html(&layout.meta.order_number)
    )
    .unwrap();
    writeln!(out, "<style>{}</style>", STYLE).unwrap();
    writeln!(out, "</head>").unwrap();
    writeln!(out, "<body>").unwrap();

    for page in &layout.pages {
        write_page(&mut out, layout, page);
    }

    writeln!(
        out,
        "<div class=\"no-print\"><button onclick=\"window.print()\">Yazdır</button></div>"
    )
    .unwrap();
    writeln!(
        out,
        "<script>window.addEventListener('load', function () {{ setTimeout(function () {{ window.print(); }}, 500); }});</script>"
    )
    .unwrap();
    writeln!(out, "</body>").unwrap();
    writeln!(out, "</html>").unwrap();
    out
}

fn write_page(out: &mut String, layout: &DocumentLayout, page: &Page) {
    let meta = &layout.meta;
    writeln!(out, "<section class=\"page\">").unwrap();

    writeln!(out, "<div class=\"header\">").unwrap();
    if let Some(label) = page.label() {
        writeln!(out, "<span class=\"page-label\">{}</span>", label).unwrap();
    }
    writeln!(out, "<h1>{}</h1>", escape_html(&layout.title)).unwrap();
    writeln!(out, "<p>{}</p>", escape_html(&layout.subtitle)).unwrap();
    writeln!(out, "</div>").unwrap();

    writeln!(out, "<div class=\"order-info\">").unwrap();
    writeln!(out, "<div>İş Emri No: {}</div>", escape_html(&meta.order_number)).unwrap();
    writeln!(out, "<div>Tarih: {}</div>", escape_html(&meta.date)).unwrap();
    writeln!(out, "<div>Müşteri: {}</div>", escape_html(&meta.customer)).unwrap();
    writeln!(
        out,
        "<div>Toplam Adet: {} ({} kalem)</div>",
        meta.total_items, meta.line_count
    )
    .unwrap();
    writeln!(
        out,
        "<div>Metal Ağırlığı: {} · Taş Ağırlığı: {}</div>",
        format_grams(meta.total_metal_weight),
        format_grams(meta.total_stone_weight)
    )
    .unwrap();
    writeln!(out, "<div>Toplam Ağırlık: {}</div>", format_grams(meta.total_weight)).unwrap();
    writeln!(out, "</div>").unwrap();

    writeln!(out, "<table>").unwrap();
    write!(out, "<tr><th>#</th>").unwrap();
    if layout.show_images {
        write!(out, "<th></th>").unwrap();
    }
    writeln!(
        out,
        "<th>Kod</th><th>Açıklama</th><th class=\"num\">Adet</th><th class=\"num\">Metal</th><th class=\"num\">Taş</th><th class=\"num\">Toplam</th></tr>"
    )
    .unwrap();
    for row in &page.rows {
        write_row(out, layout, row);
    }
    writeln!(out, "</table>").unwrap();

    if page.is_last() {
        writeln!(out, "<div class=\"signature-area\">").unwrap();
        writeln!(
            out,
            "<div><div class=\"signature-field\"></div><div>{}</div></div>",
            escape_html(&layout.signature_label)
        )
        .unwrap();
        writeln!(
            out,
            "<div><div class=\"signature-field\"></div><div>{}</div></div>",
            escape_html(&layout.completion_label)
        )
        .unwrap();
        writeln!(out, "</div>").unwrap();
    }

    writeln!(out, "<div class=\"footer\">").unwrap();
    writeln!(out, "<div>{}</div>", escape_html(&layout.footer)).unwrap();
    if page.is_last() {
        writeln!(out, "<div>Oluşturulma: {}</div>", escape_html(&layout.generated_at)).unwrap();
    }
    writeln!(out, "</div>").unwrap();
    writeln!(out, "</section>").unwrap();
}

fn write_row(out: &mut String, layout: &DocumentLayout, row: &Row) {
    write!(out, "<tr><td>{}</td>", row.seq).unwrap();
    if layout.show_images {
        match row.image.as_deref().and_then(safe_image_src) {
            Some(src) => write!(
                out,
                "<td><div class=\"thumb\"><img src=\"{}\" alt=\"{}\"></div></td>",
                src,
                escape_html(&row.code)
            )
            .unwrap(),
            None => write!(out, "<td><div class=\"thumb\">RESİM</div></td>").unwrap(),
        }
    }
    writeln!(
        out,
        "<td><strong>{}</strong></td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\"><strong>{}</strong></td></tr>",
        escape_html(&row.code),
        escape_html(&row.description),
        row.quantity,
        format_grams(row.metal_weight),
        format_grams(row.stone_weight),
        format_grams(row.line_total)
    )
    .unwrap();

    if let Some(note) = &row.note {
        let span = if layout.show_images { 8 } else { 7 };
        writeln!(
            out,
            "<tr class=\"note\"><td></td><td colspan=\"{}\">Not: {}</td></tr>",
            span - 1,
            escape_html(note)
        )
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentConfig;
    use crate::model::{LineItem, Order, Product};
    use chrono::NaiveDate;

    fn layout(lines: usize) -> DocumentLayout {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut order = Order::new("WO-20240115-0930", date);
        order.customer_name = "Ayşe <Yılmaz>".to_string();
        for i in 0..lines {
            let product = Product::new(format!("KP{:03}", i), 2.0, 0.0, "Gold", "Ring", "Çizgili küpe");
            order
                .items
                .push(LineItem::from_product(&product, 1, if i == 0 { "acil" } else { "" }));
        }
        order.recompute_totals();
        DocumentLayout::build(&order, &DocumentConfig::default(), date.and_hms_opt(9, 0, 0).unwrap())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_keeps_unicode_and_escapes_names() {
        let html = render_html(&layout(1));
        assert!(html.contains("LIZAR KUYUMCULUK İŞ EMRİ"));
        assert!(html.contains("Müşteri: Ayşe &lt;Yılmaz&gt;"));
        assert!(html.contains("Çizgili küpe"));
        assert!(html.contains("Not: acil"));
        assert!(html.contains("window.print()"));
    }

    #[test]
    fn test_one_section_per_page_and_signature_once() {
        let html = render_html(&layout(23));
        assert_eq!(html.matches("<section class=\"page\">").count(), 3);
        assert_eq!(html.matches("<div class=\"order-info\">").count(), 3);
        assert_eq!(html.matches("Personel İmzası").count(), 1);
        assert!(html.contains("Sayfa 3 / 3"));
    }

    #[test]
    fn test_rejects_non_image_src() {
        assert_eq!(safe_image_src("javascript:alert(1)"), None);
        assert_eq!(safe_image_src("data:image/png;base64,\"onerror=x"), None);
        assert!(safe_image_src("data:image/png;base64,iVBORw0KGgo=").is_some());
    }
}
