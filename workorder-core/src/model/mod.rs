//! Data model for customers, products and orders.

mod customer;
mod order;
mod product;

pub use customer::{
    name_key, Address, AddressPatch, Customer, CustomerInput, CustomerPatch,
    CustomerStatistics,
};
pub use order::{FinalizedOrder, LineItem, Order, OrderStatus};
pub use product::{CatalogDocument, Product};

use serde::Serialize;

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Records added.
    pub imported: usize,
    /// Records left out (duplicates or invalid).
    pub skipped: usize,
}
