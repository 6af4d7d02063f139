//! Payment gateway seam.
//!
//! The real processor is an external collaborator; the engine only needs a
//! charge call that can fail. A failed charge leaves the checkout in the
//! `Payment` stage: no wallet debit, no order, no cart clear.

use thiserror::Error;

use crate::orders::PaymentMethod;

/// Errors surfaced by a payment gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The processor declined the charge.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The processor could not be reached (network failure or timeout).
    #[error("payment gateway unreachable")]
    Unreachable,
}

/// A possibly-failing external charge.
pub trait PaymentGateway {
    /// Charge `amount` (minor units) against the chosen method. A zero
    /// amount (fully wallet-covered order) must succeed without side
    /// effects.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the charge does not complete.
    fn charge(&self, method: PaymentMethod, amount: i64) -> Result<(), GatewayError>;
}

/// Stand-in processor: approves everything, or fails every charge with a
/// configured error.
#[derive(Debug, Default)]
pub struct SimulatedGateway {
    fail_with: Option<GatewayError>,
}

impl SimulatedGateway {
    /// A gateway that approves every charge.
    #[must_use]
    pub fn approving() -> Self {
        Self::default()
    }

    /// A gateway that fails every charge with `error`.
    #[must_use]
    pub fn failing(error: GatewayError) -> Self {
        Self {
            fail_with: Some(error),
        }
    }
}

impl PaymentGateway for SimulatedGateway {
    fn charge(&self, method: PaymentMethod, amount: i64) -> Result<(), GatewayError> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }

        tracing::debug!(?method, amount, "simulated charge approved");

        Ok(())
    }
}
