//! Order history: the append-mostly log of finalized orders.
//!
//! Entries are kept newest first and capped at [`HISTORY_LIMIT`]. The whole
//! list is written back to the record store after every change; when the
//! store refuses a write the in-memory list stays authoritative and the
//! failure is returned to the caller.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{self, SharedClock};
use crate::config::weight::format_grams;
use crate::config::{keys, StorageConfig, HISTORY_LIMIT, TOP_RANKING_LIMIT};
use crate::error::{Result, WorkOrderError};
use crate::model::{name_key, FinalizedOrder, ImportReport, Order, OrderStatus};
use crate::store::{load_json, save_json, SharedStore};
use crate::tabular;

/// Criteria for [`OrderHistory::filter`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Case-insensitive substring of the customer name.
    pub customer_name: Option<String>,
    pub status: Option<OrderStatus>,
    /// Inclusive lower bound on the order date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound; the whole day is covered.
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive substring of any line's product code.
    pub product_code: Option<String>,
}

impl OrderFilter {
    fn matches(&self, entry: &FinalizedOrder) -> bool {
        let order = &entry.order;
        if let Some(name) = self.customer_name.as_deref() {
            if !name_key(&order.customer_name).contains(&name_key(name)) {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != entry.status) {
            return false;
        }
        if self.date_from.is_some_and(|from| order.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| order.date > to) {
            return false;
        }
        if let Some(code) = self.product_code.as_deref() {
            let code = code.trim().to_lowercase();
            if !order
                .items
                .iter()
                .any(|i| i.code.to_lowercase().contains(&code))
            {
                return false;
            }
        }
        true
    }
}

/// Quantity ordered of one product across history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRanking {
    pub code: String,
    pub description: String,
    pub quantity: u32,
}

/// Orders placed by one customer across history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRanking {
    pub name: String,
    pub orders: usize,
}

/// Aggregates over the whole history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_orders: usize,
    pub total_items: u32,
    pub total_metal_weight: f64,
    pub total_stone_weight: f64,
    pub total_weight: f64,
    pub by_status: BTreeMap<String, usize>,
    /// Keyed `YYYY-MM`.
    pub by_month: BTreeMap<String, usize>,
    pub top_products: Vec<ProductRanking>,
    pub top_customers: Vec<CustomerRanking>,
}

/// Sort key for [`OrderHistory::sorted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Completion timestamp.
    Date,
    /// Customer name, case-insensitive.
    Customer,
    /// Total weight.
    Weight,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Serialized form for [`OrderHistory::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Import record: history fields are optional so plain orders are accepted.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(flatten)]
    order: Order,
    #[serde(default)]
    completed_date: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    status: Option<OrderStatus>,
}

/// Finalized orders, newest first.
pub struct OrderHistory {
    store: SharedStore,
    key: String,
    clock: SharedClock,
    orders: Vec<FinalizedOrder>,
}

impl OrderHistory {
    /// Load history from the store.
    pub fn open(store: SharedStore, storage: &StorageConfig) -> Self {
        Self::with_clock(store, storage, clock::system())
    }

    /// Load history with an explicit clock.
    pub fn with_clock(store: SharedStore, storage: &StorageConfig, clock: SharedClock) -> Self {
        let key = storage.key(keys::ORDER_HISTORY);
        let orders: Vec<FinalizedOrder> = load_json(store.as_ref(), &key).unwrap_or_default();
        debug!("Loaded {} historical orders from '{}'", orders.len(), key);
        Self {
            store,
            key,
            clock,
            orders,
        }
    }

    /// Write the full list back to the store.
    pub fn save(&self) -> Result<()> {
        save_json(self.store.as_ref(), &self.key, &self.orders)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Check if history is empty.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// All entries, newest first.
    pub fn all(&self) -> &[FinalizedOrder] {
        &self.orders
    }

    fn number_taken(&self, number: &str) -> bool {
        self.orders.iter().any(|o| o.order_number() == number)
    }

    /// Order numbers only resolve to the minute; a second commit within the
    /// same minute gets `-2`, `-3`, ...
    fn unique_number(&self, number: &str) -> String {
        if !self.number_taken(number) {
            return number.to_string();
        }
        (2..)
            .map(|n| format!("{}-{}", number, n))
            .find(|candidate| !self.number_taken(candidate))
            .unwrap_or_else(|| number.to_string())
    }

    /// Insert a finalized copy of `order` in memory without persisting.
    pub fn record(&mut self, mut order: Order) -> FinalizedOrder {
        let number = self.unique_number(&order.order_number);
        if number != order.order_number {
            warn!(
                "Order number {} already in history, recording as {}",
                order.order_number, number
            );
            order.order_number = number;
        }
        order.recompute_totals();

        let finalized = FinalizedOrder {
            id: format!("ORD_{}", Uuid::new_v4().simple()),
            order,
            completed_date: self.clock.now_utc(),
            status: OrderStatus::InProduction,
            last_modified: None,
            imported: false,
        };

        self.orders.insert(0, finalized.clone());
        if self.orders.len() > HISTORY_LIMIT {
            let dropped = self.orders.len() - HISTORY_LIMIT;
            self.orders.truncate(HISTORY_LIMIT);
            debug!("History capped at {}, dropped {} oldest", HISTORY_LIMIT, dropped);
        }
        info!(
            "Order {} recorded for {}",
            finalized.order_number(),
            finalized.customer_name()
        );
        finalized
    }

    /// Record `order` and persist.
    pub fn add(&mut self, order: Order) -> Result<FinalizedOrder> {
        let finalized = self.record(order);
        self.save()?;
        Ok(finalized)
    }

    /// Find by id.
    pub fn get(&self, id: &str) -> Option<&FinalizedOrder> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// Find by order number.
    pub fn get_by_number(&self, number: &str) -> Option<&FinalizedOrder> {
        self.orders.iter().find(|o| o.order_number() == number)
    }

    /// Case-insensitive search over order number, customer name and line
    /// codes and descriptions. Blank terms return everything.
    pub fn search(&self, term: &str) -> Vec<&FinalizedOrder> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.orders.iter().collect();
        }
        self.orders
            .iter()
            .filter(|entry| {
                let order = &entry.order;
                order.order_number.to_lowercase().contains(&term)
                    || order.customer_name.to_lowercase().contains(&term)
                    || order.items.iter().any(|i| {
                        i.code.to_lowercase().contains(&term)
                            || i.description.to_lowercase().contains(&term)
                    })
            })
            .collect()
    }

    /// Entries matching every set criterion.
    pub fn filter(&self, filter: &OrderFilter) -> Vec<&FinalizedOrder> {
        self.orders.iter().filter(|o| filter.matches(o)).collect()
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> HistoryStats {
        let mut stats = HistoryStats {
            total_orders: self.orders.len(),
            ..Default::default()
        };

        let mut products: Vec<ProductRanking> = Vec::new();
        let mut product_index: HashMap<String, usize> = HashMap::new();
        let mut customers: Vec<CustomerRanking> = Vec::new();
        let mut customer_index: HashMap<String, usize> = HashMap::new();

        for entry in &self.orders {
            let order = &entry.order;
            stats.total_items += order.totals.total_items;
            stats.total_metal_weight += order.totals.total_metal_weight;
            stats.total_stone_weight += order.totals.total_stone_weight;
            stats.total_weight += order.totals.total_weight;

            *stats
                .by_status
                .entry(entry.status.as_str().to_string())
                .or_default() += 1;
            *stats
                .by_month
                .entry(format!("{:04}-{:02}", order.date.year(), order.date.month()))
                .or_default() += 1;

            for item in &order.items {
                match product_index.get(&item.code) {
                    Some(&i) => products[i].quantity += item.quantity,
                    None => {
                        product_index.insert(item.code.clone(), products.len());
                        products.push(ProductRanking {
                            code: item.code.clone(),
                            description: item.description.clone(),
                            quantity: item.quantity,
                        });
                    }
                }
            }

            match customer_index.get(&order.customer_name) {
                Some(&i) => customers[i].orders += 1,
                None => {
                    customer_index.insert(order.customer_name.clone(), customers.len());
                    customers.push(CustomerRanking {
                        name: order.customer_name.clone(),
                        orders: 1,
                    });
                }
            }
        }

        // Stable sorts keep first-seen order among ties.
        products.sort_by(|a, b| b.quantity.cmp(&a.quantity));
        products.truncate(TOP_RANKING_LIMIT);
        customers.sort_by(|a, b| b.orders.cmp(&a.orders));
        customers.truncate(TOP_RANKING_LIMIT);

        stats.top_products = products;
        stats.top_customers = customers;
        stats
    }

    /// Remove an entry.
    pub fn delete(&mut self, id: &str) -> Result<FinalizedOrder> {
        let index = self
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| WorkOrderError::not_found("Order", id))?;
        let removed = self.orders.remove(index);
        info!("Order {} deleted from history", removed.order_number());
        self.save()?;
        Ok(removed)
    }

    /// Change the processing state of an entry.
    pub fn update_status(&mut self, id: &str, status: OrderStatus) -> Result<FinalizedOrder> {
        let now = self.clock.now_utc();
        let entry = self
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| WorkOrderError::not_found("Order", id))?;
        entry.status = status;
        entry.last_modified = Some(now);
        let updated = entry.clone();
        info!("Order {} is now {}", updated.order_number(), status);
        self.save()?;
        Ok(updated)
    }

    /// Entries for a customer name (case-insensitive), newest first.
    pub fn orders_by_customer(&self, name: &str) -> Vec<&FinalizedOrder> {
        let name = name_key(name);
        let mut orders: Vec<&FinalizedOrder> = self
            .orders
            .iter()
            .filter(|o| name_key(o.customer_name()) == name)
            .collect();
        orders.sort_by(|a, b| b.completed_date.cmp(&a.completed_date));
        orders
    }

    /// Number of entries for a customer name.
    pub fn count_for_customer(&self, name: &str) -> usize {
        let name = name_key(name);
        self.orders
            .iter()
            .filter(|o| name_key(o.customer_name()) == name)
            .count()
    }

    /// The `limit` newest entries.
    pub fn recent(&self, limit: usize) -> &[FinalizedOrder] {
        &self.orders[..limit.min(self.orders.len())]
    }

    /// All entries ordered by `key`.
    pub fn sorted(&self, key: SortKey, direction: SortDirection) -> Vec<&FinalizedOrder> {
        let mut orders: Vec<&FinalizedOrder> = self.orders.iter().collect();
        match key {
            SortKey::Date => orders.sort_by(|a, b| a.completed_date.cmp(&b.completed_date)),
            SortKey::Customer => {
                orders.sort_by_cached_key(|o| name_key(o.customer_name()))
            }
            SortKey::Weight => orders.sort_by(|a, b| {
                a.order
                    .totals
                    .total_weight
                    .total_cmp(&b.order.totals.total_weight)
            }),
        }
        if direction == SortDirection::Descending {
            orders.reverse();
        }
        orders
    }

    /// Drop entries dated more than `days` before `today`. Returns the count
    /// removed.
    pub fn prune_older_than(&mut self, days: i64, today: NaiveDate) -> Result<usize> {
        let cutoff = today - Duration::days(days);
        let before = self.orders.len();
        self.orders.retain(|o| o.order.date >= cutoff);
        let removed = before - self.orders.len();
        if removed > 0 {
            info!("Pruned {} orders dated before {}", removed, cutoff);
            self.save()?;
        }
        Ok(removed)
    }

    /// Serialize the whole history.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&self.orders)?),
            ExportFormat::Csv => Ok(self.export_csv()),
        }
    }

    fn export_csv(&self) -> String {
        let mut output = String::new();
        tabular::write_row(
            &mut output,
            [
                "Order Number",
                "Date",
                "Customer",
                "Total Items",
                "Total Weight",
                "Status",
                "Products",
            ],
        );
        for entry in &self.orders {
            let order = &entry.order;
            let products = order
                .items
                .iter()
                .map(|i| format!("{}({})", i.code, i.quantity))
                .collect::<Vec<_>>()
                .join("; ");
            tabular::write_row(
                &mut output,
                [
                    order.order_number.clone(),
                    order.date.to_string(),
                    order.customer_name.clone(),
                    order.totals.total_items.to_string(),
                    format_grams(order.totals.total_weight),
                    entry.status.to_string(),
                    products,
                ],
            );
        }
        output
    }

    /// Merge a JSON array of orders. Existing order numbers are skipped, as
    /// are records that do not parse.
    pub fn import_json(&mut self, content: &str) -> Result<ImportReport> {
        let records: Vec<serde_json::Value> = serde_json::from_str(content)?;
        let mut report = ImportReport::default();
        let now = self.clock.now_utc();

        for value in records {
            let record: ImportRecord = match serde_json::from_value(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipped unreadable order record: {}", e);
                    report.skipped += 1;
                    continue;
                }
            };
            if self.number_taken(&record.order.order_number) {
                report.skipped += 1;
                continue;
            }

            let mut order = record.order;
            order.recompute_totals();
            self.orders.push(FinalizedOrder {
                id: record
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("ORD_{}", Uuid::new_v4().simple())),
                order,
                completed_date: record.completed_date.unwrap_or(now),
                status: record.status.unwrap_or_default(),
                last_modified: None,
                imported: true,
            });
            report.imported += 1;
        }

        if report.imported > 0 {
            self.orders
                .sort_by(|a, b| b.completed_date.cmp(&a.completed_date));
            self.orders.truncate(HISTORY_LIMIT);
        }
        info!(
            "History import: {} imported, {} skipped",
            report.imported, report.skipped
        );
        if report.imported > 0 {
            self.save()?;
        }
        Ok(report)
    }
}
