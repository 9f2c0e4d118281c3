//! Order aggregation: totals folded over line items.
//!
//! Totals are never edited by hand. Every mutation of an order's lines is
//! followed by [`OrderTotals::from_items`], so the stored aggregates always
//! equal the fold over the current lines.

use serde::{Deserialize, Serialize};

use crate::config::weight::approx_eq;
use crate::model::LineItem;

/// Aggregate fields of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderTotals {
    /// Distinct product lines.
    pub line_count: usize,
    /// Sum of quantities.
    pub total_items: u32,
    /// Σ metal weight × quantity.
    pub total_metal_weight: f64,
    /// Σ stone weight × quantity.
    pub total_stone_weight: f64,
    /// Σ total weight × quantity.
    pub total_weight: f64,
}

impl OrderTotals {
    /// Fold totals over a list of line items.
    pub fn from_items(items: &[LineItem]) -> Self {
        items.iter().fold(
            OrderTotals {
                line_count: items.len(),
                ..Default::default()
            },
            |mut acc, item| {
                let qty = item.quantity as f64;
                acc.total_items += item.quantity;
                acc.total_metal_weight += item.metal_weight * qty;
                acc.total_stone_weight += item.stone_weight * qty;
                acc.total_weight += item.total_weight * qty;
                acc
            },
        )
    }

    /// Check that these totals match the fold over `items` (within rounding).
    pub fn matches(&self, items: &[LineItem]) -> bool {
        let expected = Self::from_items(items);
        self.line_count == expected.line_count
            && self.total_items == expected.total_items
            && approx_eq(self.total_metal_weight, expected.total_metal_weight)
            && approx_eq(self.total_stone_weight, expected.total_stone_weight)
            && approx_eq(self.total_weight, expected.total_weight)
    }
}
