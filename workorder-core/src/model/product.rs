//! Catalog products.

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::weight::round2;

/// A sellable jewelry product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique code, e.g. `KP001`.
    pub code: String,
    /// Metal weight in grams.
    #[serde(default, deserialize_with = "de_grams")]
    pub metal_weight: f64,
    /// Stone weight in grams.
    #[serde(default, deserialize_with = "de_grams")]
    pub stone_weight: f64,
    /// Metal plus stone, recomputed on every save.
    #[serde(default, deserialize_with = "de_grams")]
    pub total_weight: f64,
    #[serde(default)]
    pub material: String,
    /// Product category (ring, necklace, ...).
    #[serde(default, rename = "type")]
    pub product_type: String,
    #[serde(default)]
    pub description: String,
    /// Reference into the bundled image set.
    #[serde(default, rename = "image_ref", alias = "imageRef", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    /// Embedded image as a data URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl Product {
    /// Create a product; total weight is derived.
    pub fn new(
        code: impl Into<String>,
        metal_weight: f64,
        stone_weight: f64,
        material: impl Into<String>,
        product_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let mut product = Self {
            code: code.into(),
            metal_weight,
            stone_weight,
            total_weight: 0.0,
            material: material.into(),
            product_type: product_type.into(),
            description: description.into(),
            image_ref: None,
            image_data: None,
        };
        product.normalize();
        product
    }

    /// Upper-case the code, round weights and recompute the total.
    pub fn normalize(&mut self) {
        self.code = self.code.trim().to_uppercase();
        self.metal_weight = round2(self.metal_weight);
        self.stone_weight = round2(self.stone_weight);
        self.total_weight = round2(self.metal_weight + self.stone_weight);
    }

    /// Check if the product has an embedded image.
    pub fn has_image(&self) -> bool {
        self.image_data.as_deref().is_some_and(|d| !d.is_empty())
    }
}

/// Catalog file shape: `{ "products": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub products: Vec<Product>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_products: Option<usize>,
}

/// Accept grams as a JSON number or a decimal string (`"2.80"`).
fn de_grams<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Grams {
        Number(f64),
        Text(String),
        Null(()),
    }

    match Grams::deserialize(deserializer)? {
        Grams::Number(n) => Ok(n),
        Grams::Text(s) if s.trim().is_empty() => Ok(0.0),
        Grams::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid weight '{}'", s))),
        Grams::Null(()) => Ok(0.0),
    }
}
