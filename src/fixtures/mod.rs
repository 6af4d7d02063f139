//! Fixtures
//!
//! YAML-backed catalog and promo sets for tests and demos, loaded from
//! `./fixtures/<category>/<name>.yml`.

use std::{fs, path::PathBuf};

use thiserror::Error;

use crate::{
    cart::{Cart, CartError},
    catalog::{Catalog, CatalogError, Product},
    promotions::{PromoTable, PromoTableError},
    store::KeyValueStore,
};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog parsing error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Promo table parsing error
    #[error(transparent)]
    PromoTable(#[from] PromoTableError),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Not enough products in fixture
    #[error("Not enough products in fixture, available: {available}, requested: {requested}")]
    NotEnoughProducts {
        /// Number of products defined in the fixture
        available: usize,
        /// Number of products requested
        requested: usize,
    },

    /// Cart population error
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    catalog: Catalog,
    promotions: PromoTable,
}

impl Fixture {
    /// Create a new empty fixture with default base path
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            catalog: Catalog::default(),
            promotions: PromoTable::new(),
        }
    }

    /// Load a catalog from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_catalog(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("catalog").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;

        self.catalog = Catalog::from_yaml_str(&contents)?;

        Ok(self)
    }

    /// Load promotions from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_promotions(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self
            .base_path
            .join("promotions")
            .join(format!("{name}.yml"));

        let contents = fs::read_to_string(&file_path)?;

        self.promotions = PromoTable::from_yaml_str(&contents)?;

        Ok(self)
    }

    /// Load a complete fixture set (catalog and promotions with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_catalog(name)?.load_promotions(name)?;

        Ok(fixture)
    }

    /// Get a product by its catalog id
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found.
    pub fn product(&self, id: &str) -> Result<&Product, FixtureError> {
        self.catalog
            .get(id)
            .ok_or_else(|| FixtureError::ProductNotFound(id.to_string()))
    }

    /// Get the loaded catalog
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get the loaded promo table
    #[must_use]
    pub fn promotions(&self) -> &PromoTable {
        &self.promotions
    }

    /// Create a cart holding the first `n` catalog products (all of them
    /// when `None`), one line item each.
    ///
    /// # Errors
    ///
    /// Returns an error if more products are requested than the fixture
    /// defines, or if the cart cannot be persisted.
    pub fn stocked_cart<S: KeyValueStore>(
        &self,
        store: &mut S,
        n: Option<usize>,
    ) -> Result<Cart, FixtureError> {
        let available = self.catalog.len();

        if let Some(n) = n
            && n > available
        {
            return Err(FixtureError::NotEnoughProducts {
                requested: n,
                available,
            });
        }

        let mut cart = Cart::default();

        for product in self.catalog.products().take(n.unwrap_or(available)) {
            cart.add_item(store, product, std::collections::BTreeMap::new())?;
        }

        Ok(cart)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
