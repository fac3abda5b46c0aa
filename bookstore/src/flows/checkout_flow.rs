// bookstore/src/flows/checkout_flow.rs

//! Cart-to-order checkout.
//!
//! Stages map onto the checkout states:
//!
//! | stage           | state             | writes                                   |
//! |-----------------|-------------------|------------------------------------------|
//! | `collect_input` | `CollectingInput` | none                                     |
//! | `validate`      | `Validating`      | none                                     |
//! | `place_order`   | `PlacingOrder`    | one create (`orders`)                    |
//! | `clear_cart`    | `ClearingCart`    | one delete (`carts`)                     |
//! | `adjust_stock`  | `AdjustingStock`  | one batch update (`books`, order marker) |
//! | `complete`      | `Done`            | none                                     |
//!
//! A failure up to and including `place_order` leaves no durable change. A failure after
//! the order is written is a `PartialCompletion`: it is logged, recorded in the
//! reconciliation log and returned, and the order stands.

use crate::errors::AppError;
use crate::flows::contexts::{CheckoutCtxData, CheckoutState, ShippingDetails};
use crate::models::order::{CREATED_AT_FIELD, STOCK_ADJUSTED_FIELD};
use crate::models::{Book, BookId, Order, OrderId, OrderLine, OrderStatus, UserId};
use crate::services::cart_aggregator::CartView;
use crate::state::AppState;
use crate::store::{get_as, BatchUpdate, Collection, DocumentStore, DocumentWrite, RetryPolicy, StoreError};
use chrono::Utc;
use futures_util::future::try_join_all;
use quire::{Flow, Flows, Shared, SkipIf, StageControl};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub fn register_checkout_flow(flows: &Flows<AppError>) {
  let stock_not_applicable: SkipIf<CheckoutCtxData> = Arc::new(|ctx: Shared<CheckoutCtxData>| {
    let guard = ctx.read();
    !guard.app_state.config.stock_policy.applies(guard.session.is_elevated())
  });

  let mut p = Flow::<CheckoutCtxData, AppError>::new(
    "checkout",
    &[
      ("collect_input", false, None),
      ("validate", false, None),
      ("place_order", false, None),
      ("clear_cart", false, None),
      ("adjust_stock", false, Some(stock_not_applicable)),
      ("complete", false, None),
    ],
  );

  enter_state(&mut p, "collect_input", CheckoutState::CollectingInput);
  enter_state(&mut p, "validate", CheckoutState::Validating);
  enter_state(&mut p, "place_order", CheckoutState::PlacingOrder);
  enter_state(&mut p, "clear_cart", CheckoutState::ClearingCart);
  enter_state(&mut p, "adjust_stock", CheckoutState::AdjustingStock);
  enter_state(&mut p, "complete", CheckoutState::Done);

  p.on("collect_input", |ctx: Shared<CheckoutCtxData>| async move {
    let (app_state, user_id, supplied) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.user_id.clone(), guard.supplied_summary.clone())
    };

    // The cart is always priced from the store. A supplied summary is kept only when it
    // still describes exactly that, so a summary reused after checkout or taken before
    // the cart changed never becomes an order.
    let current = app_state.carts.aggregate_for(&user_id).await?;
    let view = match supplied {
      Some(summary) if summary_is_usable(&summary, &user_id, &app_state) && summary.same_contents(&current) => {
        debug!(%user_id, "Caller-supplied cart summary confirmed against the store.");
        summary
      }
      Some(_) => {
        info!(%user_id, "Supplied cart summary is stale or out of date; using the current cart.");
        current
      }
      None => current,
    };

    ctx.write().cart = Some(view);
    Ok::<_, AppError>(StageControl::Continue)
  });

  p.on("validate", |ctx: Shared<CheckoutCtxData>| async move {
    let (shipping, cart_is_empty) = {
      let guard = ctx.read();
      (guard.shipping.trimmed(), guard.cart.as_ref().map_or(true, CartView::is_empty))
    };

    let missing = missing_fields(&shipping);
    if !missing.is_empty() {
      warn!(?missing, "Checkout rejected: shipping details incomplete.");
      return Err(AppError::Validation(format!(
        "Please fill in your {}.",
        missing.join(", ")
      )));
    }
    if cart_is_empty {
      warn!("Checkout rejected: cart is empty.");
      return Err(AppError::Validation("Your cart is empty.".to_string()));
    }

    ctx.write().shipping = shipping;
    Ok::<_, AppError>(StageControl::Continue)
  });

  p.on("place_order", |ctx: Shared<CheckoutCtxData>| async move {
    let (store, retry, user_id, order_id, shipping, view) = {
      let guard = ctx.read();
      let view = guard
        .cart
        .clone()
        .ok_or_else(|| AppError::Internal("Cart view missing before placing order.".to_string()))?;
      (
        guard.app_state.store.clone(),
        guard.app_state.retry(),
        guard.user_id.clone(),
        guard.order_id.clone(),
        guard.shipping.clone(),
        view,
      )
    };

    let order = build_order(&order_id, &user_id, &shipping, &view);
    let write = DocumentWrite::from_value(&order)?.with_server_timestamp(CREATED_AT_FIELD);

    let created = retry
      .run("create order", |attempt| {
        if attempt > 1 {
          debug!(%order_id, attempt, "Replaying order create under the same key.");
        }
        store.create(Collection::Orders, Some(order_id.as_str()), write.clone())
      })
      .await;

    let order = match created {
      Ok(_) => {
        info!(%order_id, %user_id, total = %order.total, lines = order.items.len(), "Order placed.");
        read_back_order(store.as_ref(), retry, order).await
      }
      Err(StoreError::AlreadyExists { .. }) => confirm_existing_order(store.as_ref(), retry, &order_id, &user_id).await?,
      Err(e) => return Err(AppError::from_store("create order", e)),
    };

    ctx.write().order = Some(order);
    Ok::<_, AppError>(StageControl::Continue)
  });

  p.on("clear_cart", |ctx: Shared<CheckoutCtxData>| async move {
    let (app_state, user_id, order_id) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.user_id.clone(), guard.order_id.clone())
    };

    // Deleting an absent cart succeeds, so replays are safe.
    let store = app_state.store.clone();
    let cleared = app_state
      .retry()
      .run("clear cart", |_| store.delete(Collection::Carts, user_id.as_str()))
      .await;
    if let Err(e) = cleared {
      return Err(partial_completion(&app_state, order_id, user_id, "clear_cart", e));
    }

    debug!(%user_id, "Cart cleared.");
    ctx.write().cart_cleared = true;
    Ok::<_, AppError>(StageControl::Continue)
  });

  p.on("adjust_stock", |ctx: Shared<CheckoutCtxData>| async move {
    let (app_state, user_id, order_id, lines) = {
      let guard = ctx.read();
      let lines = guard.order.as_ref().map(|o| o.items.clone()).unwrap_or_default();
      (guard.app_state.clone(), guard.user_id.clone(), guard.order_id.clone(), lines)
    };

    let adjusted = adjust_stock(app_state.store.as_ref(), app_state.retry(), &order_id, &lines).await;
    match adjusted {
      Ok(updated) => {
        info!(%order_id, books = updated, "Stock adjusted.");
        ctx.write().stock_adjusted = true;
        Ok(StageControl::Continue)
      }
      Err(e) => Err(partial_completion(&app_state, order_id, user_id, "adjust_stock", e)),
    }
  });

  p.on("complete", |ctx: Shared<CheckoutCtxData>| async move {
    let guard = ctx.read();
    info!(
      order_id = %guard.order_id,
      user_id = %guard.user_id,
      stock_adjusted = guard.stock_adjusted,
      "Checkout complete."
    );
    Ok::<_, AppError>(StageControl::Continue)
  });

  flows.register(p);
}

fn enter_state(p: &mut Flow<CheckoutCtxData, AppError>, stage: &str, state: CheckoutState) {
  p.before(stage, move |ctx: Shared<CheckoutCtxData>| async move {
    ctx.write().enter(state);
    debug!(?state, "Checkout state entered.");
    Ok::<_, AppError>(StageControl::Continue)
  });
}

fn summary_is_usable(summary: &CartView, user_id: &UserId, app_state: &AppState) -> bool {
  let age = (Utc::now() - summary.resolved_at()).to_std().unwrap_or_default();
  summary.user_id() == user_id && age <= app_state.config.summary_max_age
}

fn missing_fields(shipping: &ShippingDetails) -> Vec<&'static str> {
  [
    ("name", &shipping.name),
    ("phone", &shipping.phone),
    ("address", &shipping.address),
  ]
  .into_iter()
  .filter(|(_, value)| value.is_empty())
  .map(|(field, _)| field)
  .collect()
}

/// Snapshot of the cart as an order. Prices are copied from the books as resolved.
pub fn build_order(order_id: &OrderId, user_id: &UserId, shipping: &ShippingDetails, view: &CartView) -> Order {
  let items: Vec<OrderLine> = view
    .lines()
    .iter()
    .map(|line| OrderLine {
      book_id: line.book.id.clone(),
      title: line.book.title.clone(),
      quantity: line.quantity,
      price: line.book.price,
    })
    .collect();
  let total = items.iter().map(OrderLine::subtotal).sum();

  Order {
    id: order_id.clone(),
    user_id: user_id.clone(),
    name: shipping.name.clone(),
    phone: shipping.phone.clone(),
    address: shipping.address.clone(),
    items,
    total,
    created_at: None,
    status: OrderStatus::Pending,
  }
}

/// Picks up the store-assigned `createdAt`. The order is already placed, so a failed
/// read only costs the timestamp.
async fn read_back_order(store: &dyn DocumentStore, retry: RetryPolicy, order: Order) -> Order {
  let order_id = order.id.clone();
  let stored = retry
    .run("read order", |_| get_as::<Order>(store, Collection::Orders, order_id.as_str()))
    .await;
  match stored {
    Ok(Some(stored)) => stored,
    Ok(None) => {
      warn!(%order_id, "Placed order not visible on read-back.");
      order
    }
    Err(e) => {
      warn!(%order_id, error = %e, "Could not read back placed order.");
      order
    }
  }
}

/// An `AlreadyExists` on the order key means an earlier attempt got through. That is
/// only a success if the stored order belongs to the same user.
async fn confirm_existing_order(
  store: &dyn DocumentStore,
  retry: RetryPolicy,
  order_id: &OrderId,
  user_id: &UserId,
) -> Result<Order, AppError> {
  let existing = retry
    .run("confirm order", |_| get_as::<Order>(store, Collection::Orders, order_id.as_str()))
    .await
    .map_err(|e| AppError::from_store("confirm order", e))?;

  match existing {
    Some(order) if &order.user_id == user_id => {
      info!(%order_id, "Order already recorded by an earlier attempt; reusing it.");
      Ok(order)
    }
    Some(_) => {
      error!(%order_id, "Order key is taken by another user's order.");
      Err(AppError::Internal(format!("Order id {} is already in use.", order_id)))
    }
    None => Err(AppError::Internal(format!(
      "Order {} reported as existing but could not be read.",
      order_id
    ))),
  }
}

/// Stock rounds before a book that keeps changing underneath the batch is given up on.
const MAX_STOCK_ROUNDS: u32 = 5;

/// Decrements stock for every ordered book in one batch.
///
/// Target quantities are written as absolute values, each guarded by the quantity it was
/// computed from, and the same batch marks the order as adjusted. A concurrent change
/// to one of the books fails the whole batch with `Conflict` and the round is redone
/// from fresh reads. A replay of a batch that already landed also conflicts, and the
/// marker on the order then ends the loop without decrementing again. Books that no
/// longer exist are left out. Returns the number of books updated.
async fn adjust_stock(
  store: &dyn DocumentStore,
  retry: RetryPolicy,
  order_id: &OrderId,
  lines: &[OrderLine],
) -> Result<usize, StoreError> {
  let mut ordered: BTreeMap<BookId, u32> = BTreeMap::new();
  for line in lines {
    *ordered.entry(line.book_id.clone()).or_default() += line.quantity;
  }

  let mut round = 1;
  loop {
    if stock_already_adjusted(store, retry, order_id).await? {
      debug!(%order_id, round, "Stock already adjusted for this order.");
      return Ok(0);
    }

    let books = try_join_all(ordered.keys().map(|book_id| {
      retry.run("read book for stock", move |_| {
        get_as::<Book>(store, Collection::Books, book_id.as_str())
      })
    }))
    .await?;

    let mut updates = Vec::with_capacity(ordered.len() + 1);
    for ((book_id, quantity), book) in ordered.iter().zip(books) {
      match book {
        Some(book) => updates.push(
          BatchUpdate::new(
            Collection::Books,
            book_id.as_str(),
            DocumentWrite::field("quantity", book.quantity - i64::from(*quantity)),
          )
          .expecting("quantity", book.quantity),
        ),
        None => warn!(%book_id, "Ordered book no longer exists; stock not adjusted for it."),
      }
    }
    let count = updates.len();
    updates.push(
      BatchUpdate::new(
        Collection::Orders,
        order_id.as_str(),
        DocumentWrite::field(STOCK_ADJUSTED_FIELD, true),
      )
      .expecting(STOCK_ADJUSTED_FIELD, Value::Null),
    );

    let applied = retry
      .run("adjust stock", |_| store.batch_update(updates.clone()))
      .await;
    match applied {
      Ok(()) => return Ok(count),
      Err(e @ (StoreError::Conflict { .. } | StoreError::NotFound { collection: Collection::Books, .. }))
        if round < MAX_STOCK_ROUNDS =>
      {
        debug!(%order_id, round, error = %e, "Books changed during the stock batch; recomputing.");
        round += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

async fn stock_already_adjusted(store: &dyn DocumentStore, retry: RetryPolicy, order_id: &OrderId) -> Result<bool, StoreError> {
  let order = retry
    .run("read order stock marker", |_| store.get(Collection::Orders, order_id.as_str()))
    .await?;
  Ok(order.is_some_and(|doc| doc.data.get(STOCK_ADJUSTED_FIELD) == Some(&Value::Bool(true))))
}

fn partial_completion(app_state: &AppState, order_id: OrderId, user_id: UserId, stage: &str, source: StoreError) -> AppError {
  error!(
    %order_id,
    %user_id,
    stage,
    error = %source,
    "Order placed but a follow-up step failed; recorded for reconciliation."
  );
  app_state
    .reconciliation
    .record(order_id.clone(), user_id, stage, &source.to_string());
  AppError::PartialCompletion {
    order_id,
    stage: stage.to_string(),
    source,
  }
}
