//! Pricing engine.
//!
//! The single place where line items, delivery, tax, promo codes and wallet
//! balances combine into a payable amount. Every checkout surface calls
//! [`compute_breakdown`]; there is exactly one copy of these rules.
//!
//! All amounts are in currency minor units. Tax is always applied (18% by
//! default) and rounded half-up to the nearest whole currency unit.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::iso::{self, Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cart::LineItem,
    promotions::{PromoCode, PromoKind},
};

/// Errors that can occur while computing a breakdown.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// A percentage calculation could not be safely represented.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,
}

/// How the order leaves the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOption {
    /// Home delivery; charged below the free-delivery threshold.
    #[default]
    Delivery,

    /// Store pickup; never charged.
    Pickup,
}

/// Configuration constants for the engine.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    currency: &'static Currency,
    free_delivery_threshold: i64,
    delivery_fee: i64,
    tax_rate: Percentage,
}

impl Default for PricingConfig {
    fn default() -> Self {
        // Free delivery at 1000 units, a 50-unit flat fee below, 18% tax.
        Self::new(iso::INR, 100_000, 5_000, Percentage::from(0.18))
    }
}

impl PricingConfig {
    /// Create a config. Threshold and fee are in minor units; the tax rate
    /// is a fraction (0.18 for 18%).
    #[must_use]
    pub fn new(
        currency: &'static Currency,
        free_delivery_threshold: i64,
        delivery_fee: i64,
        tax_rate: Percentage,
    ) -> Self {
        Self {
            currency,
            free_delivery_threshold,
            delivery_fee,
            tax_rate,
        }
    }

    /// The currency all amounts are denominated in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Subtotals at or above this ship free.
    pub fn free_delivery_threshold(&self) -> i64 {
        self.free_delivery_threshold
    }

    /// Flat delivery fee below the threshold.
    pub fn delivery_fee(&self) -> i64 {
        self.delivery_fee
    }

    /// Tax rate as a fraction.
    pub fn tax_rate(&self) -> Percentage {
        self.tax_rate
    }
}

/// The computed snapshot of all monetary components for a cart + context.
///
/// Ephemeral while checking out; a copy is frozen into the order at
/// confirmation and never recomputed again. All fields are minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Sum of `unit_price * quantity` over all line items.
    pub subtotal: i64,

    /// Delivery charge after the pickup and free-delivery rules.
    pub delivery_charge: i64,

    /// Tax on the subtotal, rounded to the nearest whole currency unit.
    pub tax_amount: i64,

    /// Discount unlocked by the applied promo code, if any.
    pub promo_discount: i64,

    /// Stored-value amount applied from the wallet.
    pub wallet_discount: i64,

    /// `max(0, subtotal + delivery + tax - promo - wallet)`.
    pub final_total: i64,
}

/// Compute the full price breakdown for a cart and checkout context.
///
/// Pure and deterministic: identical inputs always produce identical output.
/// `wallet_balance` is `None` when wallet usage was not requested; the
/// wallet discount is capped by both the balance and the amount owed before
/// it, so a later debit of `wallet_discount` can never overdraw.
///
/// # Errors
///
/// Returns a [`PricingError`] if a configured rate cannot be applied safely;
/// with sane configuration this does not happen.
pub fn compute_breakdown(
    items: &[LineItem],
    delivery: DeliveryOption,
    promo: Option<&PromoCode>,
    wallet_balance: Option<i64>,
    config: &PricingConfig,
) -> Result<Breakdown, PricingError> {
    let subtotal = items
        .iter()
        .fold(0_i64, |acc, item| acc.saturating_add(item.line_total()));

    let delivery_charge = match delivery {
        DeliveryOption::Pickup => 0,
        DeliveryOption::Delivery if subtotal >= config.free_delivery_threshold => 0,
        DeliveryOption::Delivery => config.delivery_fee,
    };

    let tax_amount = tax_on(subtotal, config)?;

    let promo_discount = match promo {
        Some(promo) => promo_discount_on(subtotal, promo)?,
        None => 0,
    };

    let owed_before_wallet = (subtotal + delivery_charge + tax_amount - promo_discount).max(0);

    let wallet_discount = match wallet_balance {
        Some(balance) if balance > 0 => balance.min(owed_before_wallet),
        _ => 0,
    };

    let final_total =
        (subtotal + delivery_charge + tax_amount - promo_discount - wallet_discount).max(0);

    Ok(Breakdown {
        subtotal,
        delivery_charge,
        tax_amount,
        promo_discount,
        wallet_discount,
        final_total,
    })
}

/// Tax on a subtotal, rounded half-up to the nearest whole currency unit.
fn tax_on(subtotal: i64, config: &PricingConfig) -> Result<i64, PricingError> {
    let scale = minor_per_major(config.currency);
    let subtotal = Decimal::from_i64(subtotal).ok_or(PricingError::PercentConversion)?;

    let tax_major = (config.tax_rate * (subtotal / scale))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    tax_major
        .checked_mul(scale)
        .ok_or(PricingError::PercentConversion)?
        .to_i64()
        .ok_or(PricingError::PercentConversion)
}

/// The discount a promo code unlocks on a subtotal.
fn promo_discount_on(subtotal: i64, promo: &PromoCode) -> Result<i64, PricingError> {
    if subtotal < promo.minimum_subtotal() {
        return Ok(0);
    }

    match promo.kind() {
        PromoKind::Percentage { rate, cap } => Ok(percent_of_minor(rate, subtotal)?.min(cap)),
        PromoKind::Fixed { amount } => Ok(amount),
    }
}

/// Apply a fractional percentage to a minor-unit amount, rounding half-up.
fn percent_of_minor(percent: Percentage, minor: i64) -> Result<i64, PricingError> {
    let minor = Decimal::from_i64(minor).ok_or(PricingError::PercentConversion)?;

    (percent * Decimal::ONE)
        .checked_mul(minor)
        .ok_or(PricingError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::PercentConversion)
}

fn minor_per_major(currency: &'static Currency) -> Decimal {
    Decimal::from_i64(10_i64.pow(currency.exponent)).unwrap_or(Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use testresult::TestResult;

    use crate::{
        catalog::Product,
        cart::Cart,
        promotions::PromoTable,
        store::MemoryStore,
    };

    use super::*;

    /// Build line items via a real cart so tests exercise the same path
    /// production does.
    fn items(prices_and_quantities: &[(i64, i64)]) -> Vec<LineItem> {
        let mut store = MemoryStore::new();
        let mut cart = Cart::default();

        for (idx, &(unit_price, quantity)) in prices_and_quantities.iter().enumerate() {
            let product = Product {
                id: format!("p{idx}"),
                name: format!("Product {idx}"),
                base_price: unit_price,
                category: "frames".to_owned(),
                image_ref: None,
            };

            let item = cart
                .add_item(&mut store, &product, BTreeMap::new())
                .expect("memory store write cannot fail");
            cart.update_quantity(&mut store, item.id(), quantity)
                .expect("memory store write cannot fail");
        }

        cart.items().to_vec()
    }

    fn config() -> PricingConfig {
        PricingConfig::default()
    }

    #[test]
    fn pricing_is_deterministic() -> TestResult {
        let items = items(&[(60_000, 2), (40_000, 1)]);
        let table = PromoTable::builtin();
        let promo = table.lookup("FIRST25");

        let first = compute_breakdown(&items, DeliveryOption::Delivery, promo, Some(8_000), &config())?;
        let second = compute_breakdown(&items, DeliveryOption::Delivery, promo, Some(8_000), &config())?;

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn free_delivery_at_threshold() -> TestResult {
        // Subtotal 1200 (minor 120_000) is over the 1000 threshold.
        let items = items(&[(60_000, 2)]);

        let breakdown = compute_breakdown(&items, DeliveryOption::Delivery, None, None, &config())?;

        assert_eq!(breakdown.subtotal, 120_000);
        assert_eq!(breakdown.delivery_charge, 0);
        // 18% of 1200 = 216.
        assert_eq!(breakdown.tax_amount, 21_600);
        assert_eq!(breakdown.final_total, 141_600);

        Ok(())
    }

    #[test]
    fn flat_fee_below_threshold_and_never_for_pickup() -> TestResult {
        // Subtotal 400, under the threshold.
        let items = items(&[(40_000, 1)]);

        let delivered = compute_breakdown(&items, DeliveryOption::Delivery, None, None, &config())?;
        assert_eq!(delivered.delivery_charge, 5_000);
        // 400 + 50 delivery + 72 tax.
        assert_eq!(delivered.final_total, 52_200);

        let picked_up = compute_breakdown(&items, DeliveryOption::Pickup, None, None, &config())?;
        assert_eq!(picked_up.delivery_charge, 0);

        Ok(())
    }

    #[test]
    fn tax_rounds_half_up_to_the_whole_unit() -> TestResult {
        // Subtotal 25 => tax 4.50, rounds up to 5 whole units.
        let items = items(&[(2_500, 1)]);

        let breakdown = compute_breakdown(&items, DeliveryOption::Pickup, None, None, &config())?;

        assert_eq!(breakdown.tax_amount, 500);

        Ok(())
    }

    #[test]
    fn fixed_promo_respects_the_minimum_subtotal() -> TestResult {
        let table = PromoTable::builtin();
        let promo = table.lookup("SAVE100");

        // Subtotal 1200 >= the 500 minimum: 100 off.
        let eligible = items(&[(60_000, 2)]);
        let breakdown = compute_breakdown(&eligible, DeliveryOption::Delivery, promo, None, &config())?;
        assert_eq!(breakdown.promo_discount, 10_000);
        // 1200 + 0 delivery + 216 tax - 100 promo.
        assert_eq!(breakdown.final_total, 131_600);

        // Subtotal 400 < the 500 minimum: nothing off.
        let ineligible = items(&[(40_000, 1)]);
        let breakdown = compute_breakdown(&ineligible, DeliveryOption::Delivery, promo, None, &config())?;
        assert_eq!(breakdown.promo_discount, 0);

        Ok(())
    }

    #[test]
    fn percentage_promo_is_capped() -> TestResult {
        let table = PromoTable::builtin();
        let promo = table.lookup("FIRST25");

        // 25% of 4000 = 1000, capped at 500.
        let items = items(&[(400_000, 1)]);
        let breakdown = compute_breakdown(&items, DeliveryOption::Pickup, promo, None, &config())?;

        assert_eq!(breakdown.promo_discount, 50_000);

        Ok(())
    }

    #[test]
    fn wallet_discount_capped_by_balance() -> TestResult {
        // Owed before wallet: 400 + 50 + 72 = 522; balance 80 covers 80.
        let items = items(&[(40_000, 1)]);

        let breakdown =
            compute_breakdown(&items, DeliveryOption::Delivery, None, Some(8_000), &config())?;

        assert_eq!(breakdown.wallet_discount, 8_000);
        assert_eq!(breakdown.final_total, 44_200);

        Ok(())
    }

    #[test]
    fn wallet_discount_capped_by_amount_owed() -> TestResult {
        // Owed before wallet: 522; balance 600 only covers 522.
        let items = items(&[(40_000, 1)]);

        let breakdown =
            compute_breakdown(&items, DeliveryOption::Delivery, None, Some(60_000), &config())?;

        assert_eq!(breakdown.wallet_discount, 52_200);
        assert_eq!(breakdown.final_total, 0);

        Ok(())
    }

    #[test]
    fn wallet_not_requested_or_empty_gives_no_discount() -> TestResult {
        let items = items(&[(40_000, 1)]);

        let not_requested =
            compute_breakdown(&items, DeliveryOption::Delivery, None, None, &config())?;
        assert_eq!(not_requested.wallet_discount, 0);

        let empty = compute_breakdown(&items, DeliveryOption::Delivery, None, Some(0), &config())?;
        assert_eq!(empty.wallet_discount, 0);

        Ok(())
    }

    #[test]
    fn final_total_never_goes_negative() -> TestResult {
        let mut table = PromoTable::new();
        table.insert(crate::promotions::PromoCode::new(
            "BIGOFF",
            "absurd flat discount",
            PromoKind::Fixed { amount: 1_000_000 },
            0,
        ));
        let promo = table.lookup("BIGOFF");

        let items = items(&[(40_000, 1)]);
        let breakdown =
            compute_breakdown(&items, DeliveryOption::Delivery, promo, Some(100_000), &config())?;

        assert_eq!(breakdown.final_total, 0);
        assert!(breakdown.wallet_discount >= 0, "wallet discount stays non-negative");

        Ok(())
    }

    #[test]
    fn empty_cart_prices_to_the_delivery_fee_only() -> TestResult {
        let breakdown = compute_breakdown(&[], DeliveryOption::Delivery, None, None, &config())?;

        assert_eq!(breakdown.subtotal, 0);
        assert_eq!(breakdown.delivery_charge, 5_000);
        assert_eq!(breakdown.tax_amount, 0);
        assert_eq!(breakdown.final_total, 5_000);

        Ok(())
    }

    #[test]
    fn percent_of_minor_rounds_half_away_from_zero() -> TestResult {
        assert_eq!(percent_of_minor(Percentage::from(0.15), 30_001)?, 4_500);
        assert_eq!(percent_of_minor(Percentage::from(0.25), 50)?, 13);

        Ok(())
    }
}
