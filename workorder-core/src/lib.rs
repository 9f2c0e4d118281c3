//! workorder-core - Core library for jewelry work orders.
//!
//! This library holds the customer directory, the product catalog, the order
//! draft and its aggregation, the order history and the printable work-order
//! renderer. Every service persists through a [`RecordStore`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use workorder_core::{AppConfig, CustomerInput, MemoryStore, Session};
//!
//! let mut session = Session::open(Arc::new(MemoryStore::new()), AppConfig::default());
//! session.directory.create(CustomerInput::named("Ayşe Yılmaz")).unwrap();
//! session.select_customer_by_name("Ayşe Yılmaz").unwrap();
//! session.add_product("KP001", 2, "").unwrap();
//! let order = session.commit().unwrap();
//! let doc = session.render(&order.order).unwrap();
//! println!("{} ({} bytes)", doc.file_name, doc.bytes.len());
//! ```

pub mod aggregate;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod directory;
pub mod draft;
pub mod error;
pub mod generator;
pub mod history;
pub mod model;
pub mod session;
pub mod store;
pub mod tabular;
pub mod validation;

// Re-exports for convenience
pub use aggregate::OrderTotals;
pub use catalog::{CatalogOrigin, ProductCatalog};
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use config::{AppConfig, DocumentConfig, StorageConfig};
pub use directory::CustomerDirectory;
pub use draft::{DraftState, NamedDraft, OrderDraft};
pub use error::{ErrorCode, Result, WorkOrderError};
pub use generator::{DocumentFormat, FallbackRenderer, RenderedDocument};
pub use history::{ExportFormat, HistoryStats, OrderFilter, OrderHistory, SortDirection, SortKey};
pub use model::{
    Customer, CustomerInput, CustomerPatch, FinalizedOrder, ImportReport, LineItem, Order,
    OrderStatus, Product,
};
pub use session::Session;
pub use store::{FileStore, MemoryStore, RecordStore, SharedStore};
pub use validation::{validate_history, ValidationResult};
