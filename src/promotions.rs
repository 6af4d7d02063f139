//! Promo codes.
//!
//! A promo code is a named discount rule looked up from an in-memory table.
//! An unknown code is not an error: lookup returns `None` and the caller
//! reports "not applied". At most one code is applied to a checkout at a
//! time; applying a new one replaces the previous.

use std::collections::BTreeMap;

use decimal_percentage::Percentage;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;

/// Errors loading a promo table from YAML.
#[derive(Debug, Error)]
pub enum PromoTableError {
    /// YAML parsing error.
    #[error("failed to parse promotions YAML: {0}")]
    Yaml(#[from] serde_norway::Error),
}

/// The discount rule behind a promo code. Amounts are in minor units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromoKind {
    /// A fraction of the subtotal, capped at a maximum discount value.
    Percentage {
        /// Discount rate as a fraction (0.25 for 25%).
        rate: Percentage,

        /// Maximum discount in minor units.
        cap: i64,
    },

    /// A flat amount off.
    Fixed {
        /// Discount amount in minor units.
        amount: i64,
    },
}

/// A named discount rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PromoCode {
    code: String,
    description: String,
    kind: PromoKind,
    minimum_subtotal: i64,
}

impl PromoCode {
    /// Create a promo code. The code is stored uppercased; matching is
    /// case-insensitive.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        kind: PromoKind,
        minimum_subtotal: i64,
    ) -> Self {
        Self {
            code: code.into().to_uppercase(),
            description: description.into(),
            kind,
            minimum_subtotal,
        }
    }

    /// The uppercased match key.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable description, surfaced next to the applied code.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The discount rule.
    pub fn kind(&self) -> PromoKind {
        self.kind
    }

    /// Eligibility floor: subtotals below this get no discount.
    pub fn minimum_subtotal(&self) -> i64 {
        self.minimum_subtotal
    }
}

/// On-disk promo table shape, keyed by code.
#[derive(Debug, Deserialize)]
struct PromoTableFile {
    promotions: BTreeMap<String, PromoEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PromoEntry {
    Percentage {
        description: String,
        rate: f64,
        cap: i64,
        #[serde(default)]
        minimum_subtotal: i64,
    },
    Fixed {
        description: String,
        amount: i64,
        #[serde(default)]
        minimum_subtotal: i64,
    },
}

/// The lookup table of known promo codes.
#[derive(Debug, Default)]
pub struct PromoTable {
    codes: FxHashMap<String, PromoCode>,
}

impl PromoTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The storefront's built-in codes.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::new();

        table.insert(PromoCode::new(
            "FIRST25",
            "25% off (up to 500)",
            PromoKind::Percentage {
                rate: Percentage::from(0.25),
                cap: 50_000,
            },
            0,
        ));
        table.insert(PromoCode::new(
            "SAVE100",
            "100 off on orders above 500",
            PromoKind::Fixed { amount: 10_000 },
            50_000,
        ));
        table.insert(PromoCode::new(
            "WELCOME",
            "15% off (up to 300)",
            PromoKind::Percentage {
                rate: Percentage::from(0.15),
                cap: 30_000,
            },
            0,
        ));

        table
    }

    /// Parse a promo table from its YAML representation.
    ///
    /// # Errors
    ///
    /// Returns a [`PromoTableError`] if the YAML cannot be parsed.
    pub fn from_yaml_str(raw: &str) -> Result<Self, PromoTableError> {
        let file: PromoTableFile = serde_norway::from_str(raw)?;
        let mut table = Self::new();

        for (code, entry) in file.promotions {
            let promo = match entry {
                PromoEntry::Percentage {
                    description,
                    rate,
                    cap,
                    minimum_subtotal,
                } => PromoCode::new(
                    code,
                    description,
                    PromoKind::Percentage {
                        rate: Percentage::from(rate),
                        cap,
                    },
                    minimum_subtotal,
                ),
                PromoEntry::Fixed {
                    description,
                    amount,
                    minimum_subtotal,
                } => PromoCode::new(code, description, PromoKind::Fixed { amount }, minimum_subtotal),
            };

            table.insert(promo);
        }

        Ok(table)
    }

    /// Register a code, replacing any previous rule for the same key.
    pub fn insert(&mut self, promo: PromoCode) {
        self.codes.insert(promo.code.clone(), promo);
    }

    /// Case-insensitive lookup. `None` means "not applied", never an error.
    pub fn lookup(&self, code: &str) -> Option<&PromoCode> {
        self.codes.get(&code.trim().to_uppercase())
    }

    /// Number of known codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the table has no codes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
