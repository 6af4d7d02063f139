//! Keepsake prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError, LineItem},
    catalog::{Catalog, CatalogError, Product},
    checkout::{
        Checkout, CheckoutError, PromoOutcome, Stage,
        gateway::{GatewayError, PaymentGateway, SimulatedGateway},
    },
    fixtures::{Fixture, FixtureError},
    notify::{Notifier, NullNotifier, Severity, TracingNotifier},
    orders::{CustomerDetails, Order, OrderHistory, OrderStatus, PaymentMethod},
    pricing::{
        Breakdown, DeliveryOption, PricingConfig, PricingError, compute_breakdown,
    },
    profile::{ProfileError, UserProfile},
    promotions::{PromoCode, PromoKind, PromoTable, PromoTableError},
    receipt::{OrderReceipt, ReceiptError},
    store::{DirStore, KeyValueStore, MemoryStore, StoreError},
    wallet::{
        Tier, TransactionKind, Wallet, WalletAccount, WalletError, WalletTransaction,
    },
};
