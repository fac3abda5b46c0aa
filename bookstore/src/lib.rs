// bookstore/src/lib.rs

//! Bookstore checkout: catalog, cart and order placement over a document store.
//!
//! The two workflows that write (add-to-cart and checkout) are `quire` flows registered
//! in `AppState::new`; everything else is a plain service call. Operations take an
//! explicit `Session` obtained from `Authenticator::sign_in` or `register`.

pub mod config;
pub mod errors;
pub mod flows;
pub mod handlers;
pub mod models;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;

pub use config::{AppConfig, StockPolicy};
pub use errors::{AppError, Result};
pub use flows::{CheckoutState, ShippingDetails};
pub use handlers::{add_to_cart, checkout, view_cart, CheckoutReceipt, CheckoutRequest};
pub use state::AppState;
