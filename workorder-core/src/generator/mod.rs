//! Work-order document generation.

mod canvas;
mod html;
mod layout;
mod pdf;
mod renderer;
mod text;
mod thumbnail;

pub use canvas::{draw_layout, Align, Canvas, Font, Rgb};
pub use html::{escape_html, render_html};
pub use layout::{DocumentLayout, OrderMeta, Page, Row};
pub use pdf::PdfWriter;
pub use renderer::{
    document_file_name, DocumentFormat, DocumentRenderer, FallbackRenderer, HtmlRenderer,
    PdfRenderer, RenderedDocument,
};
pub use text::{to_ascii, transliterate, truncate_chars};
pub use thumbnail::{decode_data_url, encode_data_url, Thumbnail};
