//! Order receipt rendering.
//!
//! Renders a frozen [`Order`] as a table of line items followed by a
//! breakdown summary. Amounts come straight from the order; nothing is
//! recomputed here.

use std::io;

use rusty_money::{Money, iso::Currency};
use smallvec::{SmallVec, smallvec};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::orders::Order;

/// Errors that can occur when rendering a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// IO error
    #[error("IO error")]
    IO,
}

/// Printable receipt for a placed order.
#[derive(Debug, Clone, Copy)]
pub struct OrderReceipt<'a> {
    order: &'a Order,
    currency: &'static Currency,
}

impl<'a> OrderReceipt<'a> {
    /// Create a receipt for an order, formatting amounts in `currency`.
    #[must_use]
    pub fn new(order: &'a Order, currency: &'static Currency) -> Self {
        Self { order, currency }
    }

    /// The order being rendered.
    #[must_use]
    pub fn order(&self) -> &Order {
        self.order
    }

    /// Everything knocked off the gross amount: promo plus wallet.
    #[must_use]
    pub fn savings(&self) -> i64 {
        let breakdown = self.order.breakdown();

        breakdown
            .promo_discount
            .saturating_add(breakdown.wallet_discount)
    }

    /// Prints the receipt to `out`.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError`] if the receipt cannot be printed.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Options", "Qty", "Unit Price", "Line Total"]);

        for (idx, item) in self.order.items().iter().enumerate() {
            let options = item
                .custom_options()
                .iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect::<Vec<_>>()
                .join("\n");

            builder.push_record([
                format!("#{:<3}", idx + 1),
                item.name().to_string(),
                options,
                item.quantity().to_string(),
                self.money(item.unit_price()),
                self.money(item.line_total()),
            ]);
        }

        write_receipt_table(&mut out, builder)?;
        self.write_summary(&mut out)?;

        Ok(())
    }

    fn write_summary(&self, out: &mut impl io::Write) -> Result<(), ReceiptError> {
        let breakdown = self.order.breakdown();

        let delivery_display = if breakdown.delivery_charge == 0 {
            "FREE".to_owned()
        } else {
            self.money(breakdown.delivery_charge)
        };

        let mut lines: SmallVec<[(&str, String, bool); 6]> = smallvec![
            (" Subtotal:", self.money(breakdown.subtotal), false),
            (" Delivery:", delivery_display, false),
            (" Tax:", self.money(breakdown.tax_amount), false),
        ];

        if breakdown.promo_discount > 0 {
            lines.push((" Promo:", format!("-{}", self.money(breakdown.promo_discount)), false));
        }

        if breakdown.wallet_discount > 0 {
            lines.push((" Wallet:", format!("-{}", self.money(breakdown.wallet_discount)), false));
        }

        lines.push((" Total:", self.money(breakdown.final_total), true));

        let label_width = lines
            .iter()
            .map(|(label, _, _)| label.len())
            .max()
            .unwrap_or(0);

        let value_width = lines
            .iter()
            .map(|(_, value, _)| value.chars().count())
            .max()
            .unwrap_or(0);

        for (label, value, bold) in &lines {
            write_summary_line(out, label, value, *bold, label_width, value_width)?;
        }

        writeln!(out).map_err(|_err| ReceiptError::IO)
    }

    fn money(&self, minor: i64) -> String {
        format!("{}", Money::from_minor(minor, self.currency))
    }
}

fn write_receipt_table(out: &mut impl io::Write, builder: Builder) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(3..6), Alignment::right());

    writeln!(out, "\n{table}").map_err(|_err| ReceiptError::IO)
}

/// Writes a summary line with a right-aligned label and a fixed-width value
/// column. The bold escapes are added after padding so they never skew it.
fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    bold: bool,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(label.len());
    let value_pad = value_col_width.saturating_sub(value.chars().count());

    let (escape_on, escape_off) = if bold { ("\x1b[1m", "\x1b[0m") } else { ("", "") };

    writeln!(
        out,
        "{:>label_pad$}{escape_on}{label}  {value_pad}{value}{escape_off}",
        "",
        value_pad = " ".repeat(value_pad)
    )
    .map_err(|_err| ReceiptError::IO)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rusty_money::iso;
    use testresult::TestResult;

    use crate::{
        cart::Cart,
        catalog::Product,
        orders::{CustomerDetails, PaymentMethod},
        pricing::{DeliveryOption, PricingConfig, compute_breakdown},
        store::MemoryStore,
    };

    use super::*;

    fn placed_order() -> TestResult<Order> {
        let mut store = MemoryStore::new();
        let mut cart = Cart::default();

        let mut options = BTreeMap::new();
        options.insert("size".to_owned(), "8x10".to_owned());

        cart.add_item(
            &mut store,
            &Product {
                id: "classic-oak".to_owned(),
                name: "Classic Oak Frame".to_owned(),
                base_price: 60_000,
                category: "frames".to_owned(),
                image_ref: None,
            },
            options,
        )?;
        cart.add_item(
            &mut store,
            &Product {
                id: "slim-pine".to_owned(),
                name: "Slim Pine Frame".to_owned(),
                base_price: 40_000,
                category: "frames".to_owned(),
                image_ref: None,
            },
            BTreeMap::new(),
        )?;

        let breakdown = compute_breakdown(
            cart.items(),
            DeliveryOption::Delivery,
            None,
            Some(8_000),
            &PricingConfig::default(),
        )?;

        Ok(Order::new(
            cart.items().to_vec(),
            CustomerDetails::default(),
            PaymentMethod::Card,
            breakdown,
        ))
    }

    #[test]
    fn write_to_renders_items_options_and_summary() -> TestResult {
        let order = placed_order()?;
        let receipt = OrderReceipt::new(&order, iso::INR);

        let mut out = Vec::new();
        receipt.write_to(&mut out)?;

        let output = String::from_utf8(out)?;
        assert!(output.contains("Classic Oak Frame"));
        assert!(output.contains("Slim Pine Frame"));
        assert!(output.contains("size: 8x10"));
        assert!(output.contains("Subtotal:"));
        assert!(output.contains("Wallet:"));
        assert!(output.contains("Total:"));

        Ok(())
    }

    #[test]
    fn zero_delivery_charge_renders_as_free() -> TestResult {
        let order = placed_order()?;
        let receipt = OrderReceipt::new(&order, iso::INR);

        assert_eq!(order.breakdown().delivery_charge, 0, "subtotal is over the threshold");

        let mut out = Vec::new();
        receipt.write_to(&mut out)?;

        assert!(String::from_utf8(out)?.contains("FREE"));

        Ok(())
    }

    #[test]
    fn savings_sums_promo_and_wallet() -> TestResult {
        let order = placed_order()?;
        let receipt = OrderReceipt::new(&order, iso::INR);

        assert_eq!(receipt.savings(), 8_000);

        Ok(())
    }
}
