// bookstore/src/flows/cart_flow.rs
use crate::errors::AppError;
use crate::flows::contexts::AddToCartCtxData;
use crate::models::{BookId, Cart, UserId};
use crate::store::{
  BatchUpdate, Collection, DocumentStore, DocumentWrite, RetryPolicy, StoreError, StoreResult, StoredDocument,
};
use quire::{Flow, Flows, Shared, StageControl};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const STAGES: [&str; 3] = ["validate_cart_input", "fetch_book", "upsert_cart"];

pub fn register_add_to_cart_flow(flows: &Flows<AppError>) {
  let mut p = Flow::<AddToCartCtxData, AppError>::new(
    "add_to_cart",
    &[(STAGES[0], false, None), (STAGES[1], false, None), (STAGES[2], false, None)],
  );

  p.on("validate_cart_input", |ctx: Shared<AddToCartCtxData>| async move {
    let quantity = ctx.read().quantity;
    if quantity == 0 {
      warn!("Add to cart rejected: quantity must be positive.");
      return Err(AppError::Validation("Quantity must be at least 1.".to_string()));
    }
    Ok(StageControl::Continue)
  });

  p.on("fetch_book", |ctx: Shared<AddToCartCtxData>| async move {
    let (catalog, book_id) = {
      let guard = ctx.read();
      (guard.app_state.catalog.clone(), guard.book_id.clone())
    };
    let book = catalog.get_book(&book_id).await?;
    ctx.write().book = Some(book);
    Ok::<_, AppError>(StageControl::Continue)
  });

  p.on("upsert_cart", |ctx: Shared<AddToCartCtxData>| async move {
    let (store, retry, user_id, book_id, quantity) = {
      let guard = ctx.read();
      (
        guard.app_state.store.clone(),
        guard.app_state.retry(),
        guard.user_id.clone(),
        guard.book_id.clone(),
        guard.quantity,
      )
    };

    let token = Uuid::new_v4().to_string();
    let cart = write_cart_line(store.as_ref(), retry, &user_id, &book_id, quantity, &token).await?;

    info!(%user_id, %book_id, quantity, lines = cart.items.len(), "Cart updated.");
    ctx.write().updated_cart = Some(cart);
    Ok::<_, AppError>(StageControl::Continue)
  });

  flows.register(p);
}

/// Read-merge-write rounds before giving up on a cart that keeps changing.
const MAX_CART_ROUNDS: u32 = 5;
/// Write tokens remembered on the cart document.
const RECENT_WRITES_KEPT: usize = 8;
const REVISION_FIELD: &str = "revision";
const RECENT_WRITES_FIELD: &str = "recentWrites";

/// Merges one line into the user's cart, creating the cart if there is none.
///
/// Updates are guarded by the cart's `revision` as read, so a concurrent add fails this
/// round with `Conflict` (or `AlreadyExists` on a racing create) and the merge is redone
/// from a fresh read. Every write leaves its token in `recentWrites`; finding the token
/// on a re-read means a replay of this write already landed.
async fn write_cart_line(
  store: &dyn DocumentStore,
  retry: RetryPolicy,
  user_id: &UserId,
  book_id: &BookId,
  quantity: u32,
  token: &str,
) -> Result<Cart, AppError> {
  let mut round = 1;
  loop {
    let stored = retry
      .run("read cart", |_| store.get(Collection::Carts, user_id.as_str()))
      .await
      .map_err(|e| AppError::from_store("read cart", e))?;

    let written = match stored {
      None => {
        let mut cart = Cart::empty(user_id.clone());
        cart.add_item(book_id.clone(), quantity);
        let write = cart_write(&cart, &Value::Null, &[], token)?;
        retry
          .run("create cart", |_| store.create(Collection::Carts, Some(user_id.as_str()), write.clone()))
          .await
          .map(|_| cart)
      }
      Some(doc) => {
        let recent = recent_writes(&doc);
        let mut cart: Cart = doc.decode()?;
        if recent.iter().any(|t| t == token) {
          debug!(%user_id, "Cart write already landed on an earlier try.");
          return Ok(cart);
        }
        let revision = doc.data.get(REVISION_FIELD).cloned().unwrap_or(Value::Null);
        cart.add_item(book_id.clone(), quantity);
        let update = BatchUpdate::new(Collection::Carts, user_id.as_str(), cart_write(&cart, &revision, &recent, token)?)
          .expecting(REVISION_FIELD, revision);
        retry
          .run("update cart", |_| store.batch_update(vec![update.clone()]))
          .await
          .map(|_| cart)
      }
    };

    match written {
      Ok(cart) => return Ok(cart),
      Err(e @ (StoreError::AlreadyExists { .. } | StoreError::Conflict { .. } | StoreError::NotFound { .. }))
        if round < MAX_CART_ROUNDS =>
      {
        debug!(%user_id, round, error = %e, "Cart changed while adding; merging again.");
        round += 1;
      }
      Err(e) => return Err(AppError::from_store("write cart", e)),
    }
  }
}

fn cart_write(cart: &Cart, revision: &Value, recent: &[String], token: &str) -> StoreResult<DocumentWrite> {
  let mut tokens = Vec::with_capacity(RECENT_WRITES_KEPT);
  tokens.push(token.to_string());
  tokens.extend(recent.iter().take(RECENT_WRITES_KEPT - 1).cloned());

  let mut write = DocumentWrite::from_value(cart)?;
  write
    .data
    .insert(REVISION_FIELD.to_string(), Value::from(revision.as_u64().unwrap_or(0) + 1));
  write.data.insert(RECENT_WRITES_FIELD.to_string(), Value::from(tokens));
  Ok(write)
}

fn recent_writes(doc: &StoredDocument) -> Vec<String> {
  doc
    .data
    .get(RECENT_WRITES_FIELD)
    .and_then(Value::as_array)
    .map(|tokens| tokens.iter().filter_map(|t| t.as_str().map(str::to_string)).collect())
    .unwrap_or_default()
}
