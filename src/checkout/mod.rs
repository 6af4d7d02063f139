//! Checkout workflow.
//!
//! A strictly linear state machine: `Cart -> Details -> Payment ->
//! Confirmation`, with lossless backward transitions. Guard failures are
//! recoverable and leave the stage untouched.
//!
//! Confirmation runs the commit sequence as one logical unit: charge the
//! gateway, debit the wallet by the computed wallet discount, append the
//! frozen order, clear the cart. A failure after the debit compensates
//! (refund credit, retract the order) so no partial commit is observable.

use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    cart::{Cart, CartError},
    checkout::gateway::{GatewayError, PaymentGateway},
    notify::{Notifier, Severity},
    orders::{CustomerDetails, Order, OrderHistory, OrderStatus, PaymentMethod},
    pricing::{Breakdown, DeliveryOption, PricingConfig, PricingError, compute_breakdown},
    promotions::{PromoCode, PromoTable},
    store::{KeyValueStore, StoreError},
    wallet::{Wallet, WalletError},
};

pub mod gateway;

/// The checkout stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reviewing the cart.
    Cart,

    /// Entering contact and delivery details.
    Details,

    /// Choosing how to pay.
    Payment,

    /// Order placed.
    Confirmation,
}

/// The result of applying a promo code. An unknown code is reported, never
/// raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoOutcome {
    /// The code was found and now applies to this checkout.
    Applied,

    /// The code is not in the table; nothing applied.
    Unknown,
}

/// Errors surfaced by the workflow. All of them are recoverable: the stage
/// pointer does not move on failure.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout cannot start with an empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Required details are missing; the listed fields are empty.
    #[error("missing required fields: {}", .fields.join(", "))]
    MissingFields {
        /// The names of the empty required fields.
        fields: SmallVec<[&'static str; 4]>,
    },

    /// The requested transition does not start from the current stage.
    #[error("checkout is at {current:?}, expected {expected:?}")]
    WrongStage {
        /// Where the workflow is.
        current: Stage,

        /// Where the transition starts from.
        expected: Stage,
    },

    /// Breakdown computation failed.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Wallet debit failed; the commit sequence was abandoned.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// The gateway charge failed; nothing was debited or cleared.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Cart persistence failed during the commit sequence.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Order persistence failed during the commit sequence.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One checkout session over the profile's cart, wallet and order history.
#[derive(Debug)]
pub struct Checkout<'a> {
    cart: &'a mut Cart,
    wallet: &'a mut Wallet,
    orders: &'a mut OrderHistory,
    config: &'a PricingConfig,
    promos: &'a PromoTable,
    notifier: &'a dyn Notifier,
    stage: Stage,
    customer: CustomerDetails,
    payment_method: PaymentMethod,
    promo: Option<PromoCode>,
    use_wallet: bool,
}

impl<'a> Checkout<'a> {
    /// Start a checkout session at the `Cart` stage.
    pub fn new(
        cart: &'a mut Cart,
        wallet: &'a mut Wallet,
        orders: &'a mut OrderHistory,
        config: &'a PricingConfig,
        promos: &'a PromoTable,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            cart,
            wallet,
            orders,
            config,
            promos,
            notifier,
            stage: Stage::Cart,
            customer: CustomerDetails::default(),
            payment_method: PaymentMethod::default(),
            promo: None,
            use_wallet: false,
        }
    }

    /// The current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The customer details draft.
    pub fn customer(&self) -> &CustomerDetails {
        &self.customer
    }

    /// Replace the customer details draft. Allowed at any stage; the guards
    /// re-validate on the forward transition.
    pub fn set_customer(&mut self, customer: CustomerDetails) {
        self.customer = customer;
    }

    /// Choose how the remainder is paid.
    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    /// The chosen payment method.
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// Request (or withdraw) paying part of the total from the wallet.
    pub fn set_use_wallet(&mut self, use_wallet: bool) {
        self.use_wallet = use_wallet;
    }

    /// Whether wallet usage is requested.
    pub fn wallet_requested(&self) -> bool {
        self.use_wallet
    }

    /// The promo code currently applied, if any.
    pub fn applied_promo(&self) -> Option<&PromoCode> {
        self.promo.as_ref()
    }

    /// Apply a promo code, replacing any previous one. An unknown code is
    /// an outcome, not an error.
    pub fn apply_promo(&mut self, code: &str) -> PromoOutcome {
        match self.promos.lookup(code) {
            Some(promo) => {
                self.notifier.notify(
                    Severity::Success,
                    &format!("Promo code {} applied", promo.code()),
                );
                self.promo = Some(promo.clone());
                PromoOutcome::Applied
            }
            None => {
                self.notifier
                    .notify(Severity::Error, &format!("Invalid promo code: {code}"));
                PromoOutcome::Unknown
            }
        }
    }

    /// Detach the applied promo code, if any.
    pub fn remove_promo(&mut self) {
        if self.promo.take().is_some() {
            self.notifier.notify(Severity::Info, "Promo code removed");
        }
    }

    /// The live price breakdown for the current inputs. Recomputed from
    /// scratch on every call; nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if a configured rate cannot be applied.
    pub fn breakdown(&self) -> Result<Breakdown, PricingError> {
        let wallet_balance = self.use_wallet.then(|| self.wallet.balance());

        compute_breakdown(
            self.cart.items(),
            self.customer.delivery_option,
            self.promo.as_ref(),
            wallet_balance,
            self.config,
        )
    }

    /// `Cart -> Details`, guarded by a non-empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] (stage unchanged) when the cart
    /// has no items.
    pub fn to_details(&mut self) -> Result<(), CheckoutError> {
        self.expect_stage(Stage::Cart)?;

        if self.cart.item_count() == 0 {
            self.notifier
                .notify(Severity::Error, "Your cart is empty");
            return Err(CheckoutError::EmptyCart);
        }

        self.stage = Stage::Details;

        Ok(())
    }

    /// `Details -> Payment`, guarded by required-field validation.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingFields`] listing what is absent
    /// (stage unchanged).
    pub fn to_payment(&mut self) -> Result<(), CheckoutError> {
        self.expect_stage(Stage::Details)?;

        let missing = self.missing_fields();
        if !missing.is_empty() {
            self.notifier.notify(
                Severity::Error,
                &format!("Please fill in: {}", missing.join(", ")),
            );
            return Err(CheckoutError::MissingFields { fields: missing });
        }

        self.stage = Stage::Payment;

        Ok(())
    }

    /// `Details -> Cart`, lossless.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::WrongStage`] if not at `Details`.
    pub fn back_to_cart(&mut self) -> Result<(), CheckoutError> {
        self.expect_stage(Stage::Details)?;
        self.stage = Stage::Cart;

        Ok(())
    }

    /// `Payment -> Details`, lossless.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::WrongStage`] if not at `Payment`.
    pub fn back_to_details(&mut self) -> Result<(), CheckoutError> {
        self.expect_stage(Stage::Payment)?;
        self.stage = Stage::Details;

        Ok(())
    }

    /// `Payment -> Confirmation`: the commit sequence.
    ///
    /// Computes the final breakdown, charges the gateway for the payable
    /// remainder, debits the wallet by the computed wallet discount, appends
    /// the frozen order and clears the cart. Returns the frozen order.
    ///
    /// # Errors
    ///
    /// Any failure leaves the workflow at `Payment` with no partial
    /// effects: a gateway failure aborts before any mutation, and a
    /// persistence failure after the debit is compensated (refund credit,
    /// order retracted).
    #[tracing::instrument(skip_all, fields(order_id = tracing::field::Empty))]
    pub fn confirm<S: KeyValueStore, G: PaymentGateway>(
        &mut self,
        store: &mut S,
        gateway: &G,
    ) -> Result<Order, CheckoutError> {
        self.expect_stage(Stage::Payment)?;

        let breakdown = self.breakdown()?;

        gateway.charge(self.payment_method, breakdown.final_total)?;

        let mut order = Order::new(
            self.cart.items().to_vec(),
            self.customer.clone(),
            self.payment_method,
            breakdown,
        );
        order.set_status(OrderStatus::Confirmed);

        let order_id = order.id().to_owned();
        tracing::Span::current().record("order_id", tracing::field::display(&order_id));

        if breakdown.wallet_discount > 0 {
            self.wallet.debit(
                store,
                breakdown.wallet_discount,
                &format!("Payment for order {order_id}"),
            )?;
        }

        if let Err(err) = self.orders.append(store, order.clone()) {
            self.refund_wallet(store, breakdown.wallet_discount, &order_id);
            return Err(err.into());
        }

        if let Err(err) = self.cart.clear(store) {
            if let Err(retract_err) = self.orders.retract(store, &order_id) {
                tracing::error!(%retract_err, "rollback could not retract the order");
            }
            self.refund_wallet(store, breakdown.wallet_discount, &order_id);
            return Err(err.into());
        }

        self.stage = Stage::Confirmation;
        self.notifier.notify(
            Severity::Success,
            &format!("Order {order_id} placed successfully"),
        );
        tracing::info!(total = breakdown.final_total, "checkout committed");

        Ok(order)
    }

    /// `Confirmation -> Cart`: back to a fresh, empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::WrongStage`] if not at `Confirmation`.
    pub fn continue_shopping(&mut self) -> Result<(), CheckoutError> {
        self.expect_stage(Stage::Confirmation)?;

        self.stage = Stage::Cart;
        self.promo = None;
        self.use_wallet = false;

        Ok(())
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), CheckoutError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(CheckoutError::WrongStage {
                current: self.stage,
                expected,
            })
        }
    }

    fn missing_fields(&self) -> SmallVec<[&'static str; 4]> {
        let mut missing = SmallVec::new();

        if self.customer.name.trim().is_empty() {
            missing.push("name");
        }
        if self.customer.phone.trim().is_empty() {
            missing.push("phone");
        }
        if self.customer.delivery_option == DeliveryOption::Delivery
            && self.customer.address.trim().is_empty()
        {
            missing.push("address");
        }

        missing
    }

    /// Compensation step: reverse a rolled-back debit, spend accounting and
    /// tier included. Best effort; a failure here is logged, not raised over
    /// the original error.
    fn refund_wallet<S: KeyValueStore>(&mut self, store: &mut S, amount: i64, order_id: &str) {
        if amount <= 0 {
            return;
        }

        if let Err(err) = self.wallet.refund(
            store,
            amount,
            &format!("Refund for failed order {order_id}"),
        ) {
            tracing::error!(%err, "rollback could not refund the wallet");
        }
    }
}
