//! Cart aggregate.
//!
//! An ordered collection of line items owned by the current profile. Every
//! mutation writes the whole collection back to the store before returning,
//! so persisted state and the derived item count can never be observed out
//! of step. The full rewrite is O(n) per mutation, which is the point: a
//! personal cart is small and incremental writes would reintroduce the
//! staleness bugs this shape avoids.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::Product,
    ids,
    store::{KeyValueStore, StoreError, keys},
};

/// Errors related to cart mutation.
#[derive(Debug, Error)]
pub enum CartError {
    /// A line item cannot be constructed with a quantity below one.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),

    /// The cart could not be persisted; the mutation is not committed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One product instance in the cart.
///
/// The unit price is captured from the catalog at add time and never
/// refreshed. Re-adding the same product always creates a new line item
/// rather than merging quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    id: String,
    product_id: String,
    name: String,
    unit_price: i64,
    quantity: u32,
    category: String,
    #[serde(default)]
    custom_options: BTreeMap<String, String>,
    added_at: Timestamp,
}

impl LineItem {
    fn from_product(product: &Product, custom_options: BTreeMap<String, String>) -> Self {
        Self {
            id: ids::timestamped(&product.id),
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.base_price,
            quantity: 1,
            category: product.category.clone(),
            custom_options,
            added_at: Timestamp::now(),
        }
    }

    /// Unique per cart insertion; not the product id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The catalog product this line was created from.
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Product name as captured at add time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit price in minor units, captured at add time.
    pub fn unit_price(&self) -> i64 {
        self.unit_price
    }

    /// Quantity, always at least one.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Product category as captured at add time.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Customisations chosen for this line (frame style, size, border, ...).
    pub fn custom_options(&self) -> &BTreeMap<String, String> {
        &self.custom_options
    }

    /// When the line was added to the cart.
    pub fn added_at(&self) -> Timestamp {
        self.added_at
    }

    /// Unit price times quantity, in minor units.
    pub fn line_total(&self) -> i64 {
        self.unit_price.saturating_mul(i64::from(self.quantity))
    }
}

/// The ordered sequence of line items for the current profile.
#[derive(Debug, Default)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Load the cart from the store, defaulting to empty when the stored
    /// value is absent or unreadable.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be read.
    pub fn load<S: KeyValueStore>(store: &S) -> Result<Self, StoreError> {
        let items = store.get_json(keys::CART)?.unwrap_or_default();

        Ok(Self { items })
    }

    /// Add a product to the cart as a fresh line item with quantity one.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the cart cannot be persisted; the item is
    /// not added in that case.
    pub fn add_item<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        product: &Product,
        custom_options: BTreeMap<String, String>,
    ) -> Result<LineItem, CartError> {
        let item = LineItem::from_product(product, custom_options);

        self.items.push(item.clone());

        if let Err(err) = self.persist(store) {
            self.items.pop();
            return Err(err);
        }

        tracing::debug!(line_item = %item.id, product = %item.product_id, "item added to cart");

        Ok(item)
    }

    /// Set the quantity of a line item. A quantity of zero or less removes
    /// the line item instead. No upper bound is enforced.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the cart cannot be persisted; the previous
    /// quantity is kept in that case.
    pub fn update_quantity<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        line_item_id: &str,
        new_quantity: i64,
    ) -> Result<(), CartError> {
        if new_quantity <= 0 {
            return self.remove_item(store, line_item_id);
        }

        let Some(item) = self.items.iter_mut().find(|item| item.id == line_item_id) else {
            return Ok(());
        };

        let previous = item.quantity;
        item.quantity = u32::try_from(new_quantity).unwrap_or(u32::MAX);

        if let Err(err) = self.persist(store) {
            if let Some(item) = self.items.iter_mut().find(|item| item.id == line_item_id) {
                item.quantity = previous;
            }
            return Err(err);
        }

        Ok(())
    }

    /// Remove a line item. Removing an absent id is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the cart cannot be persisted; the item is
    /// kept in that case.
    pub fn remove_item<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        line_item_id: &str,
    ) -> Result<(), CartError> {
        let Some(position) = self.items.iter().position(|item| item.id == line_item_id) else {
            return Ok(());
        };

        let removed = self.items.remove(position);

        if let Err(err) = self.persist(store) {
            self.items.insert(position, removed);
            return Err(err);
        }

        tracing::debug!(line_item = line_item_id, "item removed from cart");

        Ok(())
    }

    /// Empty the cart, persisting the empty state synchronously so no stale
    /// non-empty snapshot stays visible.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the empty state cannot be persisted; the
    /// items are kept in that case.
    pub fn clear<S: KeyValueStore>(&mut self, store: &mut S) -> Result<(), CartError> {
        let previous = std::mem::take(&mut self.items);

        if let Err(err) = self.persist(store) {
            self.items = previous;
            return Err(err);
        }

        tracing::debug!("cart cleared");

        Ok(())
    }

    /// Sum of `unit_price * quantity` over all line items, in minor units.
    /// Derived on demand, never stored.
    #[must_use]
    pub fn subtotal(&self) -> i64 {
        self.items
            .iter()
            .fold(0_i64, |acc, item| acc.saturating_add(item.line_total()))
    }

    /// Sum of quantities over all line items. Derived on demand.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    /// Look up a line item by id.
    pub fn get_item(&self, line_item_id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == line_item_id)
    }

    /// The line items, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Iterate over the line items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter()
    }

    /// Number of line items (not the quantity sum; see [`Cart::item_count`]).
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart holds no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn persist<S: KeyValueStore>(&self, store: &mut S) -> Result<(), CartError> {
        store.set_json(keys::CART, &self.items)?;

        Ok(())
    }
}
