//! Orders, line items and finalized history entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Product;
use crate::aggregate::OrderTotals;

/// One product line within an order.
///
/// Product fields are copied when the line is created; later catalog edits do
/// not reach existing orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub material: String,
    #[serde(default, rename = "type")]
    pub product_type: String,
    /// Metal grams per unit.
    #[serde(default)]
    pub metal_weight: f64,
    /// Stone grams per unit.
    #[serde(default)]
    pub stone_weight: f64,
    /// Total grams per unit.
    #[serde(default)]
    pub total_weight: f64,
    pub quantity: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl LineItem {
    /// Snapshot a product into a new line.
    pub fn from_product(product: &Product, quantity: u32, notes: impl Into<String>) -> Self {
        Self {
            code: product.code.clone(),
            description: product.description.clone(),
            material: product.material.clone(),
            product_type: product.product_type.clone(),
            metal_weight: product.metal_weight,
            stone_weight: product.stone_weight,
            total_weight: product.total_weight,
            quantity,
            notes: notes.into(),
            image_ref: product.image_ref.clone(),
            image_data: product.image_data.clone(),
        }
    }

    /// Unit weight times quantity.
    pub fn line_weight(&self) -> f64 {
        self.total_weight * self.quantity as f64
    }

    /// Check if the line carries a note.
    pub fn has_notes(&self) -> bool {
        !self.notes.trim().is_empty()
    }
}

/// An order under construction or frozen into history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// `WO-YYYYMMDD-HHMM`.
    pub order_number: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// Denormalized at selection time; never follows later customer edits.
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Derived from `items`.
    #[serde(flatten)]
    pub totals: OrderTotals,
}

impl Order {
    /// Create an empty order.
    pub fn new(order_number: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            order_number: order_number.into(),
            date,
            customer_id: None,
            customer_name: String::new(),
            items: Vec::new(),
            totals: OrderTotals::default(),
        }
    }

    /// Refresh the aggregate fields from the line items.
    pub fn recompute_totals(&mut self) {
        self.totals = OrderTotals::from_items(&self.items);
    }

    /// Find a line by product code.
    pub fn item(&self, code: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.code == code)
    }

    /// Check if the order has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if a customer is bound.
    pub fn has_customer(&self) -> bool {
        self.customer_id.is_some() && !self.customer_name.is_empty()
    }
}

/// Processing state of a finalized order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    InProduction,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::InProduction => "in_production",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored or user-typed status.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "in_production" => Some(OrderStatus::InProduction),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An order committed to history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedOrder {
    pub id: String,
    #[serde(flatten)]
    pub order: Order,
    pub completed_date: DateTime<Utc>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Came in through import rather than a local commit.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub imported: bool,
}

impl FinalizedOrder {
    /// Order number shortcut.
    pub fn order_number(&self) -> &str {
        &self.order.order_number
    }

    /// Customer name shortcut.
    pub fn customer_name(&self) -> &str {
        &self.order.customer_name
    }
}
