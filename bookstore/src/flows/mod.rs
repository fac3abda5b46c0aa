// bookstore/src/flows/mod.rs

//! The add-to-cart and checkout workflows, expressed as `quire` flows.

use crate::errors::AppError;
use quire::Flows;

pub mod cart_flow;
pub mod checkout_flow;
pub mod contexts;

pub use contexts::{AddToCartCtxData, CheckoutCtxData, CheckoutState, ShippingDetails};

/// Registers every application flow. Called once while building `AppState`.
pub fn register_all_flows(flows: &Flows<AppError>) {
  cart_flow::register_add_to_cart_flow(flows);
  checkout_flow::register_checkout_flow(flows);
}
