// bookstore/src/flows/contexts.rs

//! State carried through each flow run. Handlers receive these wrapped in
//! `quire::Shared`.

use crate::models::{Book, BookId, Cart, Order, OrderId, Session, UserId};
use crate::services::cart_aggregator::CartView;
use crate::state::AppState;

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub user_id: UserId,
  pub book_id: BookId,
  pub quantity: u32,
  pub book: Option<Book>,
  pub updated_cart: Option<Cart>,
}

/// Shipping details typed in by the buyer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingDetails {
  pub name: String,
  pub phone: String,
  pub address: String,
}

impl ShippingDetails {
  pub fn new(name: impl Into<String>, phone: impl Into<String>, address: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      phone: phone.into(),
      address: address.into(),
    }
  }

  /// Copy with surrounding whitespace removed from every field.
  pub fn trimmed(&self) -> Self {
    Self {
      name: self.name.trim().to_string(),
      phone: self.phone.trim().to_string(),
      address: self.address.trim().to_string(),
    }
  }
}

/// Where a checkout attempt is. Advances strictly left to right; `Failed` can follow
/// any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
  CollectingInput,
  Validating,
  PlacingOrder,
  ClearingCart,
  AdjustingStock,
  Done,
  Failed,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub session: Session,
  pub user_id: UserId,
  pub shipping: ShippingDetails,
  /// Summary the caller already aggregated, if any. Re-checked before use.
  pub supplied_summary: Option<CartView>,
  /// Idempotency key of the order write, fixed for the whole attempt.
  pub order_id: OrderId,
  pub cart: Option<CartView>,
  pub order: Option<Order>,
  pub state: CheckoutState,
  /// Every state entered, in order.
  pub history: Vec<CheckoutState>,
  /// Last state reached before `Failed`.
  pub failed_during: Option<CheckoutState>,
  pub cart_cleared: bool,
  pub stock_adjusted: bool,
}

impl CheckoutCtxData {
  pub fn new(
    app_state: AppState,
    session: Session,
    user_id: UserId,
    shipping: ShippingDetails,
    supplied_summary: Option<CartView>,
    order_id: OrderId,
  ) -> Self {
    Self {
      app_state,
      session,
      user_id,
      shipping,
      supplied_summary,
      order_id,
      cart: None,
      order: None,
      state: CheckoutState::CollectingInput,
      history: vec![CheckoutState::CollectingInput],
      failed_during: None,
      cart_cleared: false,
      stock_adjusted: false,
    }
  }

  pub fn enter(&mut self, state: CheckoutState) {
    if self.state != state {
      self.state = state;
      self.history.push(state);
    }
  }

  pub fn mark_failed(&mut self) {
    if self.state != CheckoutState::Failed {
      self.failed_during = Some(self.state);
      self.enter(CheckoutState::Failed);
    }
  }
}
