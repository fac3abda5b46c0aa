// bookstore/src/handlers/checkout_handlers.rs
use crate::errors::{AppError, Result};
use crate::flows::contexts::{CheckoutCtxData, ShippingDetails};
use crate::models::{Order, OrderId, Session};
use crate::services::cart_aggregator::CartView;
use crate::state::AppState;
use quire::{FlowOutcome, Shared};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
  pub shipping: ShippingDetails,
  /// A cart view obtained earlier from the aggregator. Used only if it belongs to the
  /// caller and is recent enough; otherwise the cart is aggregated again.
  pub summary: Option<CartView>,
  /// Reuse the key of a previous attempt that failed with `StoreUnavailable` so the
  /// order cannot be written twice. A fresh key is generated when absent.
  pub idempotency_key: Option<OrderId>,
}

impl CheckoutRequest {
  pub fn new(shipping: ShippingDetails) -> Self {
    Self {
      shipping,
      ..Default::default()
    }
  }

  pub fn with_summary(mut self, summary: CartView) -> Self {
    self.summary = Some(summary);
    self
  }

  pub fn with_idempotency_key(mut self, key: OrderId) -> Self {
    self.idempotency_key = Some(key);
    self
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
  pub order: Order,
  pub stock_adjusted: bool,
}

/// Places an order from the signed-in user's cart.
///
/// At most one attempt per user runs at a time; a concurrent second attempt gets
/// `AppError::CheckoutInProgress`.
#[instrument(name = "handler::checkout", skip_all, err(Display))]
pub async fn checkout(app_state: &AppState, session: &Session, request: CheckoutRequest) -> Result<CheckoutReceipt> {
  let user_id = session
    .user_id()
    .cloned()
    .ok_or_else(|| AppError::Auth("Sign in to place an order.".to_string()))?;

  let _in_flight = app_state
    .checkouts_in_flight
    .try_begin(&user_id)
    .ok_or(AppError::CheckoutInProgress)?;

  let order_id = request.idempotency_key.unwrap_or_else(OrderId::generate);
  info!(%user_id, %order_id, elevated = session.is_elevated(), "Checkout attempt started.");

  let ctx = Shared::new(CheckoutCtxData::new(
    app_state.clone(),
    session.clone(),
    user_id,
    request.shipping,
    request.summary,
    order_id,
  ));

  let outcome = app_state.flows.run(ctx.clone()).await;
  match outcome {
    Ok(FlowOutcome::Completed) => {
      let guard = ctx.read();
      let order = guard
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Checkout completed without an order.".to_string()))?;
      Ok(CheckoutReceipt {
        order,
        stock_adjusted: guard.stock_adjusted,
      })
    }
    Ok(FlowOutcome::Halted { stage }) => {
      ctx.write().mark_failed();
      Err(AppError::Internal(format!("Checkout halted at {}", stage)))
    }
    Err(e) => {
      ctx.write().mark_failed();
      let failed_during = ctx.read().failed_during;
      warn!(?failed_during, error = %e, "Checkout failed.");
      Err(e)
    }
  }
}
