//! Configuration constants and settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Line items printed per document page.
pub const ITEMS_PER_PAGE: usize = 10;

/// Smallest accepted line-item quantity.
pub const MIN_QUANTITY: u32 = 1;

/// Largest accepted line-item quantity.
pub const MAX_QUANTITY: u32 = 999;

/// Finalized orders kept in history; older entries are dropped.
pub const HISTORY_LIMIT: usize = 500;

/// Maximum entries returned by a suggestion query.
pub const SUGGESTION_LIMIT: usize = 10;

/// Entries listed by the "top products" / "top customers" rankings.
pub const TOP_RANKING_LIMIT: usize = 10;

/// Description characters printed before the ellipsis.
pub const DESCRIPTION_MAX_CHARS: usize = 38;

/// Thumbnail box edge in millimeters.
pub const IMAGE_BOX_MM: f64 = 14.0;

/// Largest accepted product image file.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Default storage key prefix.
pub const DEFAULT_STORAGE_PREFIX: &str = "lizar_";

/// Status given to freshly committed orders.
pub const INITIAL_STATUS: &str = "in_production";

/// Collection names inside the record store.
pub mod keys {
    pub const CUSTOMERS: &str = "customerDatabase";
    pub const PRODUCTS: &str = "productDatabase";
    pub const ORDER_HISTORY: &str = "orderHistory";
    pub const DRAFT: &str = "draftOrder";
    pub const NAMED_DRAFTS: &str = "namedDrafts";
}

/// Storage key settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    /// Prefix prepended to every collection key.
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_STORAGE_PREFIX.to_string(),
        }
    }
}

impl StorageConfig {
    /// Full store key for a collection.
    pub fn key(&self, collection: &str) -> String {
        format!("{}{}", self.prefix, collection)
    }
}

/// Printed work-order settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentConfig {
    /// Company name printed in the title.
    pub title: String,
    /// Line under the title.
    pub subtitle: String,
    /// Footer attribution.
    pub footer: String,
    /// Line items per page.
    pub items_per_page: usize,
    /// Description length before truncation.
    pub description_max_chars: usize,
    /// Draw product thumbnails.
    pub enable_images: bool,
    /// Thumbnail box edge in millimeters.
    pub image_size_mm: f64,
    /// Label under the signature line.
    pub signature_label: String,
    /// Label under the completion date line.
    pub completion_label: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            title: "LIZAR KUYUMCULUK İŞ EMRİ".to_string(),
            subtitle: "Profesyonel İş Emri Yönetim Sistemi".to_string(),
            footer: "LIZAR KUYUMCULUK - İş Emri Yönetim Sistemi".to_string(),
            items_per_page: ITEMS_PER_PAGE,
            description_max_chars: DESCRIPTION_MAX_CHARS,
            enable_images: true,
            image_size_mm: IMAGE_BOX_MM,
            signature_label: "Personel İmzası".to_string(),
            completion_label: "Tamamlanma Tarihi".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Storage settings.
    pub storage: StorageConfig,
    /// Document settings.
    pub document: DocumentConfig,
}

impl AppConfig {
    /// Read a JSON configuration file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a JSON configuration document.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(content)?;
        if config.document.items_per_page == 0 {
            return Err(crate::error::WorkOrderError::validation(
                "document.itemsPerPage must be at least 1",
            ));
        }
        Ok(config)
    }
}

/// Weight helpers.
pub mod weight {
    /// Tolerance used when comparing gram values.
    pub const EPS: f64 = 0.005;

    /// Round to two decimals, the precision weights are stored with.
    #[inline]
    pub fn round2(grams: f64) -> f64 {
        (grams * 100.0).round() / 100.0
    }

    /// Check if two weights are equal within rounding.
    #[inline]
    pub fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    /// Format grams the way documents print them (`12.30g`).
    pub fn format_grams(grams: f64) -> String {
        format!("{:.2}g", grams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_prefix() {
        let storage = StorageConfig::default();
        assert_eq!(storage.key(keys::CUSTOMERS), "lizar_customerDatabase");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = AppConfig::from_json(r#"{"document": {"itemsPerPage": 5}}"#).unwrap();
        assert_eq!(config.document.items_per_page, 5);
        assert_eq!(config.document.image_size_mm, IMAGE_BOX_MM);
        assert_eq!(config.storage.prefix, DEFAULT_STORAGE_PREFIX);
    }

    #[test]
    fn test_zero_items_per_page_rejected() {
        assert!(AppConfig::from_json(r#"{"document": {"itemsPerPage": 0}}"#).is_err());
    }

    #[test]
    fn test_weight_helpers() {
        assert_eq!(weight::round2(1.236), 1.24);
        assert_eq!(weight::round2(2.8049), 2.8);
        assert!(weight::approx_eq(3.45, 3.2 + 0.25));
        assert_eq!(weight::format_grams(16.7), "16.70g");
    }
}
