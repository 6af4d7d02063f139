//! Keepsake
//!
//! Keepsake is the cart, pricing and order engine for a small
//! direct-to-consumer storefront (custom photo frames and personalised
//! gifts). It owns the money math: delivery charges, tax, promo codes and
//! wallet discounts combine into one deterministic breakdown. It also owns
//! the wallet ledger and the checkout workflow that freezes a breakdown into
//! an order. Rendering and transport live elsewhere; the engine only reports
//! outcomes through the [`notify`] sink.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod fixtures;
pub mod notify;
pub mod orders;
pub mod prelude;
pub mod pricing;
pub mod profile;
pub mod promotions;
pub mod receipt;
pub mod store;
pub mod wallet;

pub(crate) mod ids;
