//! Customer records held by the directory.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl Address {
    /// Check if every field is blank.
    pub fn is_empty(&self) -> bool {
        self.parts().next().is_none()
    }

    /// One-line rendering, blank parts skipped.
    pub fn one_line(&self) -> String {
        self.parts().collect::<Vec<_>>().join(", ")
    }

    fn parts(&self) -> impl Iterator<Item = &str> {
        [
            self.street.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.zip.as_str(),
            self.country.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    }

    /// Apply the provided fields of a patch.
    pub fn merge(&mut self, patch: AddressPatch) {
        if let Some(v) = patch.street {
            self.street = v.trim().to_string();
        }
        if let Some(v) = patch.city {
            self.city = v.trim().to_string();
        }
        if let Some(v) = patch.state {
            self.state = v.trim().to_string();
        }
        if let Some(v) = patch.zip {
            self.zip = v.trim().to_string();
        }
        if let Some(v) = patch.country {
            self.country = v.trim().to_string();
        }
    }
}

/// A known customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Opaque identity.
    pub id: String,
    /// Human code (`C001`, `C002`, ...).
    pub code: String,
    /// Display name, unique ignoring case.
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_date: NaiveDate,
    pub last_modified: NaiveDate,
    /// Orders in history under this customer's name.
    #[serde(default)]
    pub order_count: u32,
}

impl Customer {
    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        name_key(&self.name) == name_key(name)
    }
}

/// Comparison key for customer names.
///
/// Lower-cases, folds the dotless `ı` onto `i` and drops the combining dot
/// that `İ` lower-cases into, so `YILMAZ`, `Yılmaz` and `yilmaz` share a key.
pub fn name_key(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\u{307}')
        .map(|c| if c == 'ı' { 'i' } else { c })
        .collect()
}

/// Fields accepted when creating a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomerInput {
    pub name: String,
    /// Explicit code; generated when absent.
    pub code: Option<String>,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub notes: String,
    pub tags: Vec<String>,
}

impl CustomerInput {
    /// Create input with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial address update; `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressPatch {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

/// Partial customer update; `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<AddressPatch>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Directory-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStatistics {
    pub total_customers: usize,
    pub customers_with_email: usize,
    pub customers_with_phone: usize,
    pub customers_with_orders: usize,
    /// Created within the last 30 days.
    pub recent_customers: usize,
}
