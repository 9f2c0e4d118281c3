//! Product catalog: bulk load with fallbacks, suggestion ranking and CRUD.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::clock::{self, SharedClock};
use crate::config::{keys, StorageConfig, SUGGESTION_LIMIT};
use crate::error::{Result, WorkOrderError};
use crate::model::{CatalogDocument, ImportReport, Product};
use crate::store::{load_json, save_json, SharedStore};

/// Where the products currently in memory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    /// The catalog file or document.
    Source,
    /// Products persisted in the record store by an earlier session.
    Cache,
    /// The built-in starter set.
    Seed,
}

/// Built-in products used when no catalog can be read.
pub fn seed_products() -> Vec<Product> {
    let rows = [
        ("KP001", 2.80, 0.00, "Gold", "Hoop Earrings", "Dokulu altın halka küpe", "page1_item1"),
        ("KP002", 2.90, 0.00, "Gold", "Hoop Earrings", "Çizgili altın halka küpe", "page1_item2"),
        ("KP003", 3.20, 0.25, "Gold", "Stud Earrings", "Taşlı altın tıkalı küpe", "page1_item3"),
        ("KP004", 4.50, 0.00, "Silver", "Drop Earrings", "Gümüş sarkık küpe", "page1_item4"),
        ("KY001", 15.20, 1.50, "Gold", "Necklace", "Taşlı altın kolye", "page2_item1"),
    ];
    rows.into_iter()
        .map(|(code, metal, stone, material, kind, description, image_ref)| {
            let mut product = Product::new(code, metal, stone, material, kind, description);
            product.image_ref = Some(image_ref.to_string());
            product
        })
        .collect()
}

/// Check the fields the product form requires.
pub fn validate_product(product: &Product) -> Result<()> {
    let required = [
        ("code", &product.code),
        ("material", &product.material),
        ("type", &product.product_type),
        ("description", &product.description),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(WorkOrderError::validation(format!(
                "Product {} is required",
                field
            )));
        }
    }
    if product.metal_weight.is_nan() || product.metal_weight <= 0.0 {
        return Err(WorkOrderError::validation(format!(
            "Metal weight must be greater than 0 for {}",
            product.code
        )));
    }
    if product.stone_weight.is_nan() || product.stone_weight < 0.0 {
        return Err(WorkOrderError::validation(format!(
            "Stone weight cannot be negative for {}",
            product.code
        )));
    }
    Ok(())
}

/// Accept either `{ "products": [...] }` or a bare array.
fn parse_catalog(content: &str) -> Result<Vec<Product>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Payload {
        Document(CatalogDocument),
        List(Vec<Product>),
    }

    Ok(match serde_json::from_str(content)? {
        Payload::Document(doc) => doc.products,
        Payload::List(products) => products,
    })
}

/// The product catalog.
pub struct ProductCatalog {
    store: SharedStore,
    key: String,
    clock: SharedClock,
    products: Vec<Product>,
    origin: CatalogOrigin,
}

impl ProductCatalog {
    /// Open the catalog from the store cache, or the seed set when the cache
    /// is empty.
    pub fn open(store: SharedStore, storage: &StorageConfig) -> Self {
        Self::with_clock(store, storage, clock::system())
    }

    /// Open with an explicit clock.
    pub fn with_clock(store: SharedStore, storage: &StorageConfig, clock: SharedClock) -> Self {
        let mut catalog = Self {
            store,
            key: storage.key(keys::PRODUCTS),
            clock,
            products: Vec::new(),
            origin: CatalogOrigin::Seed,
        };
        catalog.restore_fallback();
        catalog
    }

    /// Replace the products from a catalog file. On any read or parse
    /// failure the cache, then the seed set, is used instead.
    pub fn load_all(&mut self, path: &Path) -> CatalogOrigin {
        let loaded = std::fs::read_to_string(path)
            .map_err(WorkOrderError::from)
            .and_then(|content| parse_catalog(&content));
        self.apply_load(loaded, &path.display().to_string())
    }

    /// Replace the products from an in-memory catalog document.
    pub fn load_str(&mut self, content: &str) -> CatalogOrigin {
        self.apply_load(parse_catalog(content), "inline catalog")
    }

    fn apply_load(&mut self, loaded: Result<Vec<Product>>, label: &str) -> CatalogOrigin {
        match loaded {
            Ok(products) if !products.is_empty() => {
                self.products = dedupe(products);
                self.origin = CatalogOrigin::Source;
                info!("Loaded {} products from {}", self.products.len(), label);
            }
            Ok(_) => {
                warn!("Catalog {} has no products, using fallback", label);
                self.restore_fallback();
            }
            Err(e) => {
                warn!("Failed to load catalog {}: {}, using fallback", label, e);
                self.restore_fallback();
            }
        }
        self.origin
    }

    fn restore_fallback(&mut self) {
        match load_json::<Vec<Product>>(self.store.as_ref(), &self.key) {
            Some(cached) if !cached.is_empty() => {
                self.products = dedupe(cached);
                self.origin = CatalogOrigin::Cache;
                debug!("Restored {} cached products", self.products.len());
            }
            _ => {
                self.products = seed_products();
                self.origin = CatalogOrigin::Seed;
                debug!("Using {} built-in products", self.products.len());
            }
        }
    }

    fn persist(&self) -> Result<()> {
        save_json(self.store.as_ref(), &self.key, &self.products)
    }

    /// Where the current products came from.
    pub fn origin(&self) -> CatalogOrigin {
        self.origin
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// All products in catalog order.
    pub fn all(&self) -> &[Product] {
        &self.products
    }

    /// Case-insensitive exact code lookup.
    pub fn find_by_code(&self, code: &str) -> Option<&Product> {
        let code = code.trim();
        self.products
            .iter()
            .find(|p| p.code.eq_ignore_ascii_case(code))
    }

    /// Ranked suggestions: codes starting with the input, then descriptions
    /// starting with it, then by code. Blank input suggests nothing.
    pub fn suggest(&self, input: &str) -> Vec<&Product> {
        let term = input.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<(bool, bool, &Product)> = self
            .products
            .iter()
            .filter_map(|p| {
                let code = p.code.to_lowercase();
                let description = p.description.to_lowercase();
                if !code.contains(&term) && !description.contains(&term) {
                    return None;
                }
                Some((code.starts_with(&term), description.starts_with(&term), p))
            })
            .collect();

        matches.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(b.1.cmp(&a.1))
                .then_with(|| a.2.code.cmp(&b.2.code))
        });
        matches
            .into_iter()
            .take(SUGGESTION_LIMIT)
            .map(|(_, _, p)| p)
            .collect()
    }

    /// Distinct product types in first-seen order.
    pub fn product_types(&self) -> Vec<&str> {
        distinct(self.products.iter().map(|p| p.product_type.as_str()))
    }

    /// Distinct materials in first-seen order.
    pub fn materials(&self) -> Vec<&str> {
        distinct(self.products.iter().map(|p| p.material.as_str()))
    }

    /// Products of one type.
    pub fn by_type(&self, product_type: &str) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.product_type == product_type)
            .collect()
    }

    /// Products of one material.
    pub fn by_material(&self, material: &str) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.material == material)
            .collect()
    }

    /// Add a product. The code is upper-cased and must be unused.
    pub fn create(&mut self, mut product: Product) -> Result<Product> {
        product.normalize();
        validate_product(&product)?;
        if self.find_by_code(&product.code).is_some() {
            return Err(WorkOrderError::DuplicateCode { code: product.code });
        }
        self.products.push(product.clone());
        info!("Product added: {}", product.code);
        self.persist()?;
        Ok(product)
    }

    /// Replace the product stored under `code`. Renaming to a code held by
    /// another product is refused.
    pub fn update(&mut self, code: &str, mut product: Product) -> Result<Product> {
        let index = self
            .position(code)
            .ok_or_else(|| WorkOrderError::not_found("Product", code))?;
        product.normalize();
        validate_product(&product)?;
        if let Some(other) = self.position(&product.code) {
            if other != index {
                return Err(WorkOrderError::DuplicateCode { code: product.code });
            }
        }
        self.products[index] = product.clone();
        info!("Product updated: {}", product.code);
        self.persist()?;
        Ok(product)
    }

    /// Remove a product. Existing orders keep their copied line data.
    pub fn delete(&mut self, code: &str) -> Result<Product> {
        let index = self
            .position(code)
            .ok_or_else(|| WorkOrderError::not_found("Product", code))?;
        let removed = self.products.remove(index);
        info!("Product deleted: {}", removed.code);
        self.persist()?;
        Ok(removed)
    }

    fn position(&self, code: &str) -> Option<usize> {
        let code = code.trim();
        self.products
            .iter()
            .position(|p| p.code.eq_ignore_ascii_case(code))
    }

    /// Export the catalog as a catalog document.
    pub fn export_json(&self) -> Result<String> {
        let document = CatalogDocument {
            products: self.products.clone(),
            export_date: Some(self.clock.now_utc().to_rfc3339()),
            total_products: Some(self.products.len()),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Replace the catalog with the valid, distinct records of a catalog
    /// document.
    pub fn import_json(&mut self, content: &str) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut accepted: Vec<Product> = Vec::new();

        for mut product in parse_catalog(content)? {
            product.normalize();
            if let Err(e) = validate_product(&product) {
                warn!("Skipped product: {}", e);
                report.skipped += 1;
                continue;
            }
            if accepted.iter().any(|p| p.code == product.code) {
                report.skipped += 1;
                continue;
            }
            accepted.push(product);
            report.imported += 1;
        }

        if accepted.is_empty() {
            return Err(WorkOrderError::validation(
                "Catalog import contains no valid products",
            ));
        }

        self.products = accepted;
        self.origin = CatalogOrigin::Source;
        info!(
            "Catalog import: {} imported, {} skipped",
            report.imported, report.skipped
        );
        self.persist()?;
        Ok(report)
    }
}

fn dedupe(products: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter_map(|mut p| {
            p.normalize();
            if p.code.is_empty() || !seen.insert(p.code.clone()) {
                debug!("Dropping blank or repeated product code '{}'", p.code);
                return None;
            }
            Some(p)
        })
        .collect()
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).collect()
}
