//! Integrity checks over stored orders.

use std::collections::HashSet;

use crate::config::{MAX_QUANTITY, MIN_QUANTITY};
use crate::model::{FinalizedOrder, Order};

/// Validation result with warnings.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Whether validation passed.
    pub passed: bool,
    /// Warning messages.
    pub warnings: Vec<String>,
    /// Error messages.
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Create a passing result.
    pub fn ok() -> Self {
        Self {
            passed: true,
            ..Default::default()
        }
    }

    /// Add a warning.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Add an error.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.passed = false;
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
        if !other.passed {
            self.passed = false;
        }
    }
}

/// Check one order's lines and aggregates.
pub fn validate_order(order: &Order) -> ValidationResult {
    let mut result = ValidationResult::ok();
    let number = &order.order_number;

    if order.customer_name.trim().is_empty() {
        result.add_warning(format!("{}: No customer name", number));
    }
    if order.items.is_empty() {
        result.add_warning(format!("{}: No line items", number));
    }

    let mut codes = HashSet::new();
    for (idx, item) in order.items.iter().enumerate() {
        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&item.quantity) {
            result.add_error(format!(
                "{}, line {}: Quantity {} outside {}..={}",
                number,
                idx + 1,
                item.quantity,
                MIN_QUANTITY,
                MAX_QUANTITY
            ));
        }
        if item.metal_weight < 0.0 || item.stone_weight < 0.0 {
            result.add_error(format!("{}, line {}: Negative weight", number, idx + 1));
        }
        if !codes.insert(item.code.as_str()) {
            result.add_warning(format!(
                "{}, line {}: Code {} appears more than once",
                number,
                idx + 1,
                item.code
            ));
        }
    }

    if !order.totals.matches(&order.items) {
        result.add_warning(format!("{}: Stored totals differ from line items", number));
    }

    result
}

/// Check every history entry, plus order-number uniqueness across them.
pub fn validate_history(orders: &[FinalizedOrder]) -> ValidationResult {
    let mut result = ValidationResult::ok();
    let mut numbers = HashSet::new();

    for entry in orders {
        if !numbers.insert(entry.order_number()) {
            result.add_error(format!("{}: Duplicate order number", entry.order_number()));
        }
        result.merge(validate_order(&entry.order));
    }

    result
}
