// bookstore/src/handlers/mod.rs

//! Entry points for user actions. Each builds the flow context, runs the registered
//! flow and turns the finished context into a result for the caller.

pub mod cart_handlers;
pub mod checkout_handlers;

pub use cart_handlers::{add_to_cart, view_cart};
pub use checkout_handlers::{checkout, CheckoutReceipt, CheckoutRequest};
