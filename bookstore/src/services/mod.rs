// bookstore/src/services/mod.rs

pub mod auth_service;
pub mod cart_aggregator;
pub mod catalog;
pub mod checkout_guard;
pub mod reconciliation;

pub use auth_service::{AuthProvider, Authenticator, LocalAuthProvider};
pub use cart_aggregator::{CartAggregator, CartLine, CartView};
pub use catalog::Catalog;
pub use checkout_guard::{CheckoutGuard, InFlightCheckouts};
pub use reconciliation::{ReconciliationEntry, ReconciliationLog};
