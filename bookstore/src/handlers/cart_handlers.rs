// bookstore/src/handlers/cart_handlers.rs
use crate::errors::{AppError, Result};
use crate::flows::contexts::AddToCartCtxData;
use crate::models::{BookId, Cart, Session};
use crate::services::cart_aggregator::CartView;
use crate::state::AppState;
use quire::{FlowOutcome, Shared};
use tracing::{instrument, warn};

/// Adds `quantity` copies of a book to the signed-in user's cart, creating the cart if
/// needed. Returns the cart as stored.
#[instrument(name = "handler::add_to_cart", skip(app_state, session), fields(%book_id), err(Display))]
pub async fn add_to_cart(app_state: &AppState, session: &Session, book_id: &BookId, quantity: u32) -> Result<Cart> {
  let user_id = session
    .user_id()
    .cloned()
    .ok_or_else(|| AppError::Auth("Sign in to add books to your cart.".to_string()))?;

  let ctx = Shared::new(AddToCartCtxData {
    app_state: app_state.clone(),
    user_id,
    book_id: book_id.clone(),
    quantity,
    book: None,
    updated_cart: None,
  });

  if let FlowOutcome::Halted { stage } = app_state.flows.run(ctx.clone()).await? {
    return Err(AppError::Internal(format!("Add to cart halted at {}", stage)));
  }

  let updated_cart = ctx.read().updated_cart.clone();
  updated_cart.ok_or_else(|| {
    warn!("Add to cart flow completed without a cart.");
    AppError::Internal("Cart update completed, but the cart is unavailable.".to_string())
  })
}

/// The signed-in user's priced cart.
pub async fn view_cart(app_state: &AppState, session: &Session) -> Result<CartView> {
  app_state.carts.aggregate(session).await
}
