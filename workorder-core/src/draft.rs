//! The order under construction.
//!
//! A draft moves from `Empty` to `Building` on its first added line and back to
//! `Empty` on commit or clear, each time under a fresh order number. Products
//! enter the draft through a two-step protocol: a suggestion query, then an
//! explicit selection. Free text alone never becomes a line.
//!
//! Every mutation writes the draft through to the record store so an
//! interrupted session resumes where it stopped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::ProductCatalog;
use crate::clock::{self, order_number_at, SharedClock};
use crate::config::{keys, StorageConfig, MAX_QUANTITY, MIN_QUANTITY};
use crate::directory::CustomerDirectory;
use crate::error::{Result, WorkOrderError};
use crate::history::OrderHistory;
use crate::model::{FinalizedOrder, LineItem, Order, Product};
use crate::store::{load_json, save_json, SharedStore};

/// Lifecycle state of the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    /// No lines yet.
    Empty,
    /// At least one line.
    Building,
}

/// A draft saved under a user-chosen name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedDraft {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub order: Order,
}

/// Check a requested quantity against the accepted bounds.
pub fn check_quantity(quantity: i64) -> Result<u32> {
    if quantity < MIN_QUANTITY as i64 || quantity > MAX_QUANTITY as i64 {
        return Err(WorkOrderError::QuantityOutOfRange {
            quantity,
            min: MIN_QUANTITY,
            max: MAX_QUANTITY,
        });
    }
    Ok(quantity as u32)
}

/// The in-progress order and its pending product selection.
pub struct OrderDraft {
    store: SharedStore,
    draft_key: String,
    snapshots_key: String,
    clock: SharedClock,
    order: Order,
    selected: Option<Product>,
}

impl OrderDraft {
    /// Open the draft, restoring any unsaved order from the store.
    pub fn open(store: SharedStore, storage: &StorageConfig) -> Self {
        Self::with_clock(store, storage, clock::system())
    }

    /// Open with an explicit clock.
    pub fn with_clock(store: SharedStore, storage: &StorageConfig, clock: SharedClock) -> Self {
        let draft_key = storage.key(keys::DRAFT);
        let order = match load_json::<Order>(store.as_ref(), &draft_key) {
            Some(mut saved) => {
                saved.recompute_totals();
                info!(
                    "Restored draft {} with {} lines",
                    saved.order_number,
                    saved.items.len()
                );
                saved
            }
            None => Self::fresh_order(clock.as_ref()),
        };

        Self {
            store,
            draft_key,
            snapshots_key: storage.key(keys::NAMED_DRAFTS),
            clock,
            order,
            selected: None,
        }
    }

    fn fresh_order(clock: &dyn clock::Clock) -> Order {
        let now = clock.now_local();
        Order::new(order_number_at(now), now.date())
    }

    fn persist(&self) -> Result<()> {
        save_json(self.store.as_ref(), &self.draft_key, &self.order)
    }

    fn reset(&mut self) -> Result<()> {
        self.order = Self::fresh_order(self.clock.as_ref());
        self.selected = None;
        self.store.remove(&self.draft_key)
    }

    /// The order as it stands.
    pub fn order(&self) -> &Order {
        &self.order
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DraftState {
        if self.order.is_empty() {
            DraftState::Empty
        } else {
            DraftState::Building
        }
    }

    /// Product chosen from the last suggestion list, if any.
    pub fn selected_product(&self) -> Option<&Product> {
        self.selected.as_ref()
    }

    fn require_customer(&self) -> Result<()> {
        if self.order.has_customer() {
            Ok(())
        } else {
            Err(WorkOrderError::CustomerRequired)
        }
    }

    /// Bind the customer with `id` to the order.
    pub fn select_customer(&mut self, directory: &CustomerDirectory, id: &str) -> Result<()> {
        let customer = directory.find_by_id(id).ok_or_else(|| {
            WorkOrderError::validation(format!("Unknown customer '{}'; select from the list", id))
        })?;
        self.order.customer_id = Some(customer.id.clone());
        self.order.customer_name = customer.name.clone();
        debug!("Draft {} bound to {}", self.order.order_number, customer.name);
        self.persist()
    }

    /// Suggestion query for the product field. Needs a bound customer.
    pub fn search_products<'c>(
        &self,
        catalog: &'c ProductCatalog,
        text: &str,
    ) -> Result<Vec<&'c Product>> {
        self.require_customer()?;
        Ok(catalog.suggest(text))
    }

    /// Choose one product from the suggestions.
    pub fn select_product(&mut self, catalog: &ProductCatalog, code: &str) -> Result<&Product> {
        self.require_customer()?;
        let product = catalog
            .find_by_code(code)
            .ok_or_else(|| WorkOrderError::UnselectedProduct {
                input: code.to_string(),
            })?;
        Ok(&*self.selected.insert(product.clone()))
    }

    /// Add the selected product as a line, or merge into the existing line
    /// for that code.
    ///
    /// Merging sums the quantities and replaces the note when a new one is
    /// given. A sum above the maximum is rejected and leaves the line as it
    /// was. The selection is consumed on success.
    pub fn add_item(&mut self, code: &str, quantity: i64, note: &str) -> Result<()> {
        self.require_customer()?;
        let quantity = check_quantity(quantity)?;

        let product = match self.selected.as_ref() {
            Some(p) if p.code.eq_ignore_ascii_case(code.trim()) => p.clone(),
            _ => {
                return Err(WorkOrderError::UnselectedProduct {
                    input: code.to_string(),
                })
            }
        };
        let note = note.trim();

        match self.order.items.iter_mut().find(|i| i.code == product.code) {
            Some(line) => {
                line.quantity = check_quantity(i64::from(line.quantity) + i64::from(quantity))?;
                if !note.is_empty() {
                    line.notes = note.to_string();
                }
                debug!("Merged {} into existing line, now {}", line.code, line.quantity);
            }
            None => {
                self.order
                    .items
                    .push(LineItem::from_product(&product, quantity, note));
                debug!("Added line {} x{}", product.code, quantity);
            }
        }

        self.selected = None;
        self.order.recompute_totals();
        self.persist()
    }

    /// Remove the line for `code`.
    pub fn remove_item(&mut self, code: &str) -> Result<LineItem> {
        let index = self
            .order
            .items
            .iter()
            .position(|i| i.code.eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| WorkOrderError::not_found("Line item", code))?;
        let removed = self.order.items.remove(index);
        self.order.recompute_totals();
        debug!("Removed line {}", removed.code);
        self.persist()?;
        Ok(removed)
    }

    /// Set a line's quantity. Values outside the accepted bounds are ignored
    /// and `Ok(false)` is returned.
    pub fn update_quantity(&mut self, code: &str, quantity: i64) -> Result<bool> {
        let Ok(quantity) = check_quantity(quantity) else {
            debug!("Ignoring out-of-range quantity {} for {}", quantity, code);
            return Ok(false);
        };
        let line = self
            .order
            .items
            .iter_mut()
            .find(|i| i.code.eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| WorkOrderError::not_found("Line item", code))?;
        line.quantity = quantity;
        self.order.recompute_totals();
        self.persist()?;
        Ok(true)
    }

    /// Discard everything and start over under a new order number. Nothing
    /// is written to history.
    pub fn clear(&mut self) -> Result<()> {
        info!("Draft {} cleared", self.order.order_number);
        self.reset()
    }

    /// Freeze the order into history, refresh the customer's order count and
    /// start a new draft.
    ///
    /// If the history write is refused the order is still recorded in memory,
    /// the draft is still reset, and the storage error is returned.
    pub fn commit(
        &mut self,
        history: &mut OrderHistory,
        directory: &mut CustomerDirectory,
    ) -> Result<FinalizedOrder> {
        self.require_customer()?;
        if self.order.is_empty() {
            return Err(WorkOrderError::validation(
                "Add at least one product before saving the order",
            ));
        }

        self.order.recompute_totals();
        let finalized = history.record(self.order.clone());
        let saved = history.save();

        if let Err(e) = directory.update_stats(finalized.customer_name(), history) {
            warn!("Customer statistics not persisted: {}", e);
        }
        self.reset()?;
        info!(
            "Committed {} ({} items, {:.2}g)",
            finalized.order_number(),
            finalized.order.totals.total_items,
            finalized.order.totals.total_weight
        );

        saved?;
        Ok(finalized)
    }

    /// Start a new draft from a historical order: same customer and lines,
    /// new order number.
    pub fn load_from_history(&mut self, entry: &FinalizedOrder) -> Result<()> {
        let mut order = Self::fresh_order(self.clock.as_ref());
        order.customer_id = entry.order.customer_id.clone();
        order.customer_name = entry.order.customer_name.clone();
        order.items = entry.order.items.clone();
        order.recompute_totals();

        info!(
            "Draft {} loaded from {}",
            order.order_number,
            entry.order_number()
        );
        self.order = order;
        self.selected = None;
        self.persist()
    }

    // ----- Named snapshots -----

    /// Saved snapshots, most recent first.
    pub fn snapshots(&self) -> Vec<NamedDraft> {
        let mut snapshots: Vec<NamedDraft> =
            load_json(self.store.as_ref(), &self.snapshots_key).unwrap_or_default();
        snapshots.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        snapshots
    }

    /// Save the current draft under `name`, replacing any snapshot of that
    /// name.
    pub fn save_snapshot(&self, name: &str) -> Result<NamedDraft> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkOrderError::validation("Snapshot name is required"));
        }
        let snapshot = NamedDraft {
            name: name.to_string(),
            saved_at: self.clock.now_utc(),
            order: self.order.clone(),
        };

        let mut snapshots = self.snapshots();
        snapshots.retain(|s| s.name != name);
        snapshots.insert(0, snapshot.clone());
        save_json(self.store.as_ref(), &self.snapshots_key, &snapshots)?;
        info!("Draft saved as '{}'", name);
        Ok(snapshot)
    }

    /// Replace the current draft with a saved snapshot.
    pub fn restore_snapshot(&mut self, name: &str) -> Result<()> {
        let snapshot = self
            .snapshots()
            .into_iter()
            .find(|s| s.name == name.trim())
            .ok_or_else(|| WorkOrderError::not_found("Draft", name))?;
        self.order = snapshot.order;
        self.order.recompute_totals();
        self.selected = None;
        info!("Draft '{}' restored", snapshot.name);
        self.persist()
    }

    /// Delete a saved snapshot.
    pub fn delete_snapshot(&self, name: &str) -> Result<()> {
        let mut snapshots = self.snapshots();
        let before = snapshots.len();
        snapshots.retain(|s| s.name != name.trim());
        if snapshots.len() == before {
            return Err(WorkOrderError::not_found("Draft", name));
        }
        save_json(self.store.as_ref(), &self.snapshots_key, &snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::weight::approx_eq;
    use crate::error::ErrorCode;
    use crate::model::CustomerInput;
    use crate::store::{MemoryStore, RecordStore};
    use std::sync::Arc;

    struct Fixture {
        store: SharedStore,
        storage: StorageConfig,
        clock: SharedClock,
        directory: CustomerDirectory,
        catalog: ProductCatalog,
        history: OrderHistory,
    }

    impl Fixture {
        fn new() -> Self {
            let store: SharedStore = Arc::new(MemoryStore::new());
            let storage = StorageConfig::default();
            let clock: SharedClock = Arc::new(FixedClock::at(2024, 1, 15, 9, 30));
            Self {
                directory: CustomerDirectory::with_clock(store.clone(), &storage, clock.clone()),
                catalog: ProductCatalog::with_clock(store.clone(), &storage, clock.clone()),
                history: OrderHistory::with_clock(store.clone(), &storage, clock.clone()),
                store,
                storage,
                clock,
            }
        }

        fn draft(&self) -> OrderDraft {
            OrderDraft::with_clock(self.store.clone(), &self.storage, self.clock.clone())
        }

        /// A draft with a bound customer.
        fn ready_draft(&mut self) -> OrderDraft {
            let customer = self
                .directory
                .create(CustomerInput::named("Ayşe Yılmaz"))
                .unwrap();
            let mut draft = self.draft();
            draft.select_customer(&self.directory, &customer.id).unwrap();
            draft
        }

        fn add(&self, draft: &mut OrderDraft, code: &str, qty: i64, note: &str) -> Result<()> {
            draft.select_product(&self.catalog, code)?;
            draft.add_item(code, qty, note)
        }
    }

    // ==================== customer gate tests ====================

    #[test]
    fn test_new_draft_is_empty_with_order_number() {
        let fx = Fixture::new();
        let draft = fx.draft();
        assert_eq!(draft.state(), DraftState::Empty);
        assert_eq!(draft.order().order_number, "WO-20240115-0930");
    }

    #[test]
    fn test_add_item_without_customer_is_validation_error() {
        let fx = Fixture::new();
        let mut draft = fx.draft();
        let err = draft.add_item("KP001", 1, "").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(matches!(err, WorkOrderError::CustomerRequired));
        assert!(draft.order().is_empty());
    }

    #[test]
    fn test_search_requires_customer() {
        let mut fx = Fixture::new();
        let draft = fx.draft();
        assert!(matches!(
            draft.search_products(&fx.catalog, "kp"),
            Err(WorkOrderError::CustomerRequired)
        ));

        let draft = fx.ready_draft();
        assert_eq!(draft.search_products(&fx.catalog, "kp").unwrap().len(), 4);
    }

    #[test]
    fn test_select_unknown_customer() {
        let fx = Fixture::new();
        let mut draft = fx.draft();
        let err = draft.select_customer(&fx.directory, "CUST_nope").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
    }

    // ==================== add / merge tests ====================

    #[test]
    fn test_add_requires_selection_from_list() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        let err = draft.add_item("KP001", 1, "").unwrap_err();
        assert!(matches!(err, WorkOrderError::UnselectedProduct { .. }));

        draft.select_product(&fx.catalog, "KP002").unwrap();
        assert!(draft.add_item("KP001", 1, "").is_err());
        assert!(draft.order().is_empty());
    }

    #[test]
    fn test_select_unknown_product() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        let err = draft.select_product(&fx.catalog, "altın küpe").unwrap_err();
        assert_eq!(err.to_string(), "must select from list: 'altın küpe'");
    }

    #[test]
    fn test_quantity_bounds() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        for bad in [0, 1000, -3] {
            draft.select_product(&fx.catalog, "KP001").unwrap();
            let err = draft.add_item("KP001", bad, "").unwrap_err();
            assert_eq!(err.code(), ErrorCode::Range);
        }
        fx.add(&mut draft, "KP001", 1, "").unwrap();
        fx.add(&mut draft, "KP002", 999, "").unwrap();
        assert_eq!(draft.order().totals.total_items, 1000);
    }

    #[test]
    fn test_merge_same_code() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        fx.add(&mut draft, "KP001", 2, "ilk not").unwrap();
        fx.add(&mut draft, "kp001", 3, "").unwrap();

        assert_eq!(draft.state(), DraftState::Building);
        assert_eq!(draft.order().items.len(), 1);
        let line = &draft.order().items[0];
        assert_eq!(line.quantity, 5);
        assert_eq!(line.notes, "ilk not");

        fx.add(&mut draft, "KP001", 1, "yeni not").unwrap();
        assert_eq!(draft.order().items[0].notes, "yeni not");
        assert!(draft.selected_product().is_none());
    }

    #[test]
    fn test_merge_past_maximum_is_rejected() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        fx.add(&mut draft, "KP001", 500, "ilk not").unwrap();

        let err = fx.add(&mut draft, "KP001", 600, "yeni not").unwrap_err();
        assert!(matches!(
            err,
            WorkOrderError::QuantityOutOfRange { quantity: 1100, .. }
        ));
        let line = &draft.order().items[0];
        assert_eq!(line.quantity, 500);
        assert_eq!(line.notes, "ilk not");
        assert_eq!(draft.order().totals.total_items, 500);

        fx.add(&mut draft, "KP001", 499, "").unwrap();
        assert_eq!(draft.order().items[0].quantity, 999);
    }

    #[test]
    fn test_totals_follow_every_mutation() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        fx.add(&mut draft, "KP003", 2, "").unwrap();
        fx.add(&mut draft, "KY001", 1, "").unwrap();
        assert!(approx_eq(draft.order().totals.total_weight, 3.45 * 2.0 + 16.7));
        assert!(draft.order().totals.matches(&draft.order().items));

        assert!(draft.update_quantity("KP003", 4).unwrap());
        assert!(approx_eq(draft.order().totals.total_stone_weight, 0.25 * 4.0 + 1.5));

        draft.remove_item("KY001").unwrap();
        assert!(approx_eq(draft.order().totals.total_weight, 3.45 * 4.0));
        assert!(draft.order().totals.matches(&draft.order().items));
    }

    #[test]
    fn test_update_quantity_out_of_range_is_noop() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        fx.add(&mut draft, "KP001", 2, "").unwrap();
        assert!(!draft.update_quantity("KP001", 0).unwrap());
        assert!(!draft.update_quantity("KP001", 1000).unwrap());
        assert_eq!(draft.order().items[0].quantity, 2);
        assert!(draft.update_quantity("KP404", 3).is_err());
    }

    // ==================== commit / clear tests ====================

    #[test]
    fn test_commit_moves_order_to_history() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        fx.add(&mut draft, "KP001", 2, "").unwrap();
        fx.add(&mut draft, "KY001", 1, "").unwrap();

        let finalized = draft.commit(&mut fx.history, &mut fx.directory).unwrap();
        assert_eq!(finalized.order.totals.total_items, 3);
        assert_eq!(fx.history.len(), 1);
        assert_eq!(fx.directory.find_by_name("Ayşe Yılmaz").unwrap().order_count, 1);

        assert_eq!(draft.state(), DraftState::Empty);
        assert!(!draft.order().has_customer());
    }

    #[test]
    fn test_commit_rejects_empty_order() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        let err = draft.commit(&mut fx.history, &mut fx.directory).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(fx.history.is_empty());
    }

    #[test]
    fn test_clear_writes_no_history() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        fx.add(&mut draft, "KP001", 1, "").unwrap();
        draft.clear().unwrap();
        assert_eq!(draft.state(), DraftState::Empty);
        assert!(fx.history.is_empty());
        assert!(fx.store.get("lizar_draftOrder").unwrap().is_none());
    }

    // ==================== persistence tests ====================

    #[test]
    fn test_draft_survives_restart() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        fx.add(&mut draft, "KP004", 3, "gümüş").unwrap();
        drop(draft);

        let restored = fx.draft();
        assert_eq!(restored.state(), DraftState::Building);
        assert_eq!(restored.order().customer_name, "Ayşe Yılmaz");
        assert_eq!(restored.order().items[0].notes, "gümüş");
    }

    #[test]
    fn test_load_from_history_uses_new_number() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        fx.add(&mut draft, "KP001", 2, "").unwrap();
        let finalized = draft.commit(&mut fx.history, &mut fx.directory).unwrap();

        draft.load_from_history(&finalized).unwrap();
        assert_eq!(draft.order().items, finalized.order.items);
        assert_eq!(draft.order().customer_name, "Ayşe Yılmaz");

        // Same minute on the fixed clock, so history disambiguates on commit.
        let again = draft.commit(&mut fx.history, &mut fx.directory).unwrap();
        assert_eq!(again.order_number(), "WO-20240115-0930-2");
    }

    #[test]
    fn test_named_snapshots() {
        let mut fx = Fixture::new();
        let mut draft = fx.ready_draft();
        fx.add(&mut draft, "KP001", 2, "").unwrap();
        draft.save_snapshot("Cuma siparişi").unwrap();

        draft.clear().unwrap();
        assert_eq!(draft.snapshots().len(), 1);

        draft.restore_snapshot("Cuma siparişi").unwrap();
        assert_eq!(draft.order().items.len(), 1);

        draft.delete_snapshot("Cuma siparişi").unwrap();
        assert!(draft.snapshots().is_empty());
        assert_eq!(
            draft.restore_snapshot("Cuma siparişi").unwrap_err().code(),
            ErrorCode::NotFound
        );
        assert!(draft.save_snapshot("  ").is_err());
    }
}
