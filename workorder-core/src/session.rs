//! All services wired to one record store.

use std::path::Path;
use tracing::debug;

use crate::catalog::{CatalogOrigin, ProductCatalog};
use crate::clock::{self, SharedClock};
use crate::config::AppConfig;
use crate::directory::CustomerDirectory;
use crate::draft::OrderDraft;
use crate::error::{Result, WorkOrderError};
use crate::generator::{FallbackRenderer, RenderedDocument};
use crate::history::OrderHistory;
use crate::model::{FinalizedOrder, Order};
use crate::store::SharedStore;

/// The customer directory, product catalog, order history and current draft
/// sharing one store and one clock.
pub struct Session {
    pub config: AppConfig,
    pub clock: SharedClock,
    pub directory: CustomerDirectory,
    pub catalog: ProductCatalog,
    pub history: OrderHistory,
    pub draft: OrderDraft,
    renderer: FallbackRenderer,
}

impl Session {
    /// Open every service on `store` with the system clock.
    pub fn open(store: SharedStore, config: AppConfig) -> Self {
        Self::with_clock(store, config, clock::system())
    }

    /// Open every service with an explicit clock.
    pub fn with_clock(store: SharedStore, config: AppConfig, clock: SharedClock) -> Self {
        let storage = &config.storage;
        let directory = CustomerDirectory::with_clock(store.clone(), storage, clock.clone());
        let catalog = ProductCatalog::with_clock(store.clone(), storage, clock.clone());
        let history = OrderHistory::with_clock(store.clone(), storage, clock.clone());
        let draft = OrderDraft::with_clock(store, storage, clock.clone());
        debug!(
            "Session opened: {} customers, {} products, {} orders",
            directory.len(),
            catalog.len(),
            history.len()
        );

        Self {
            config,
            clock,
            directory,
            catalog,
            history,
            draft,
            renderer: FallbackRenderer::default(),
        }
    }

    /// Replace the renderer chain.
    pub fn set_renderer(&mut self, renderer: FallbackRenderer) {
        self.renderer = renderer;
    }

    /// Load the catalog from a file, falling back as the catalog does.
    pub fn load_catalog(&mut self, path: &Path) -> CatalogOrigin {
        self.catalog.load_all(path)
    }

    /// Bind the draft to the customer with this exact name (any case).
    pub fn select_customer_by_name(&mut self, name: &str) -> Result<()> {
        let id = self
            .directory
            .find_by_name(name)
            .map(|c| c.id.clone())
            .ok_or_else(|| {
                WorkOrderError::validation(format!("Unknown customer '{}'; select from the list", name))
            })?;
        self.draft.select_customer(&self.directory, &id)
    }

    /// Select a catalog product and add it to the draft in one step.
    pub fn add_product(&mut self, code: &str, quantity: i64, note: &str) -> Result<()> {
        self.draft.select_product(&self.catalog, code)?;
        self.draft.add_item(code, quantity, note)
    }

    /// Commit the draft into history.
    pub fn commit(&mut self) -> Result<FinalizedOrder> {
        self.draft.commit(&mut self.history, &mut self.directory)
    }

    /// Render an order as a printable document.
    pub fn render(&self, order: &Order) -> Result<RenderedDocument> {
        self.renderer
            .render(order, &self.config.document, self.clock.as_ref())
    }
}
