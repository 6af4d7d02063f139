//! Product catalog.
//!
//! A read-only table of products. The cart captures product snapshots at
//! add time only and never re-queries for price updates.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a catalog from YAML.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// YAML parsing error.
    #[error("failed to parse catalog YAML: {0}")]
    Yaml(#[from] serde_norway::Error),
}

/// A catalog product. Prices are in currency minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Base price in minor units, captured into line items at add time.
    pub base_price: i64,

    /// Product category (frames, gifts, ...).
    pub category: String,

    /// Reference to the product image held by the upload service.
    #[serde(default)]
    pub image_ref: Option<String>,
}

/// Read-only product table.
#[derive(Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
    by_id: FxHashMap<String, usize>,
}

/// On-disk catalog shape: products keyed by id.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    products: BTreeMap<String, ProductEntry>,
}

#[derive(Debug, Deserialize)]
struct ProductEntry {
    name: String,
    base_price: i64,
    category: String,
    #[serde(default)]
    image_ref: Option<String>,
}

impl Catalog {
    /// Build a catalog from a list of products. Later duplicates of an id
    /// shadow earlier ones.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        let by_id = products
            .iter()
            .enumerate()
            .map(|(idx, product)| (product.id.clone(), idx))
            .collect();

        Self { products, by_id }
    }

    /// Parse a catalog from its YAML representation.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the YAML cannot be parsed.
    pub fn from_yaml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_norway::from_str(raw)?;

        let products = file
            .products
            .into_iter()
            .map(|(id, entry)| Product {
                id,
                name: entry.name,
                base_price: entry.base_price,
                category: entry.category,
                image_ref: entry.image_ref,
            })
            .collect();

        Ok(Self::new(products))
    }

    /// Look up a product by id.
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.by_id.get(id).and_then(|idx| self.products.get(*idx))
    }

    /// Iterate over all products.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Number of products in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    const CATALOG_YAML: &str = "
products:
  classic-oak:
    name: Classic Oak Frame
    base_price: 59900
    category: frames
  acrylic-print:
    name: Acrylic Photo Print
    base_price: 89900
    category: frames
    image_ref: img/acrylic.jpg
";

    #[test]
    fn parses_products_from_yaml() -> TestResult {
        let catalog = Catalog::from_yaml_str(CATALOG_YAML)?;

        assert_eq!(catalog.len(), 2);

        let oak = catalog.get("classic-oak").expect("missing classic-oak");
        assert_eq!(oak.name, "Classic Oak Frame");
        assert_eq!(oak.base_price, 59_900);
        assert_eq!(oak.image_ref, None);

        let acrylic = catalog.get("acrylic-print").expect("missing acrylic-print");
        assert_eq!(acrylic.image_ref.as_deref(), Some("img/acrylic.jpg"));

        Ok(())
    }

    #[test]
    fn unknown_id_returns_none() {
        let catalog = Catalog::new(Vec::new());

        assert!(catalog.is_empty());
        assert!(catalog.get("classic-oak").is_none());
    }
}
