//! Orders.
//!
//! The frozen record of a completed checkout. An order owns a snapshot of
//! the line items and the pricing breakdown as they were at confirmation;
//! later cart or wallet mutation never changes it. Only the status moves.
//!
//! History is stored per profile, newest first. Earlier storefront versions
//! kept a single global list; it is drained into the per-profile key on
//! first load.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    cart::LineItem,
    ids,
    pricing::{Breakdown, DeliveryOption},
    store::{KeyValueStore, StoreError, keys},
};

/// How the remainder (after any wallet discount) is paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card through the gateway.
    #[default]
    Card,

    /// UPI through the gateway.
    Upi,

    /// Cash on delivery.
    CashOnDelivery,
}

/// Order lifecycle status. The rest of the record is immutable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created but not yet paid.
    #[default]
    Pending,

    /// Payment accepted.
    Confirmed,

    /// Handed to the courier.
    Shipped,

    /// Arrived.
    Delivered,
}

/// Contact and delivery details captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// Recipient name.
    pub name: String,

    /// Contact email.
    pub email: String,

    /// Contact phone.
    pub phone: String,

    /// Delivery address; required only for home delivery.
    pub address: String,

    /// Delivery or pickup.
    pub delivery_option: DeliveryOption,

    /// Free-form delivery instructions.
    #[serde(default)]
    pub notes: Option<String>,
}

/// The frozen record of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: String,
    items: Vec<LineItem>,
    customer: CustomerDetails,
    payment_method: PaymentMethod,
    breakdown: Breakdown,
    status: OrderStatus,
    created_at: Timestamp,
}

impl Order {
    /// Freeze a new order from the given snapshots. Starts `Pending`.
    #[must_use]
    pub fn new(
        items: Vec<LineItem>,
        customer: CustomerDetails,
        payment_method: PaymentMethod,
        breakdown: Breakdown,
    ) -> Self {
        Self {
            id: ids::timestamped("ord"),
            items,
            customer,
            payment_method,
            breakdown,
            status: OrderStatus::Pending,
            created_at: Timestamp::now(),
        }
    }

    /// Generated order id, unique per checkout.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The line items as they were at confirmation. Owned copies, not
    /// references: they survive the cart being cleared.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Contact and delivery details.
    pub fn customer(&self) -> &CustomerDetails {
        &self.customer
    }

    /// How the remainder was paid.
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// The pricing breakdown frozen at confirmation.
    pub fn breakdown(&self) -> Breakdown {
        self.breakdown
    }

    /// Current lifecycle status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Move the order along its lifecycle. The only mutable field.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    /// When the order was placed.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Per-profile order history, newest first.
#[derive(Debug)]
pub struct OrderHistory {
    profile_id: String,
    orders: Vec<Order>,
}

impl OrderHistory {
    /// Load the history for a profile, migrating any legacy global list
    /// into the per-profile key.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be read, or if
    /// a pending migration cannot be persisted.
    pub fn load<S: KeyValueStore>(store: &mut S, profile_id: &str) -> Result<Self, StoreError> {
        let mut orders: Vec<Order> = store.get_json(&keys::orders(profile_id))?.unwrap_or_default();

        if let Some(legacy) = store.get_json::<Vec<Order>>(keys::LEGACY_ORDERS)? {
            tracing::info!(
                profile_id,
                migrated = legacy.len(),
                "migrating legacy global order list"
            );

            orders.extend(legacy);
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            store.set_json(&keys::orders(profile_id), &orders)?;
            store.remove(keys::LEGACY_ORDERS)?;
        }

        Ok(Self {
            profile_id: profile_id.to_owned(),
            orders,
        })
    }

    /// Append an order to the front of the history and persist it.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write does not commit; the history is
    /// unchanged in that case.
    pub fn append<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        order: Order,
    ) -> Result<(), StoreError> {
        self.orders.insert(0, order);

        if let Err(err) = self.persist(store) {
            self.orders.remove(0);
            return Err(err);
        }

        Ok(())
    }

    /// Remove an order appended earlier in the same commit sequence.
    ///
    /// Compensation step for the checkout rollback path only; order history
    /// is otherwise append-only.
    pub(crate) fn retract<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        order_id: &str,
    ) -> Result<(), StoreError> {
        let Some(position) = self.orders.iter().position(|order| order.id == order_id) else {
            return Ok(());
        };

        let removed = self.orders.remove(position);

        if let Err(err) = self.persist(store) {
            self.orders.insert(position, removed);
            return Err(err);
        }

        Ok(())
    }

    /// The orders, newest first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// The most recent order, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&Order> {
        self.orders.first()
    }

    /// The owning profile id.
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn persist<S: KeyValueStore>(&self, store: &mut S) -> Result<(), StoreError> {
        store.set_json(&keys::orders(&self.profile_id), &self.orders)
    }
}
