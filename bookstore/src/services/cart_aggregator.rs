// bookstore/src/services/cart_aggregator.rs

//! Turns a user's cart document into a priced view.
//!
//! Book references are resolved concurrently. A reference to a book that no longer
//! exists drops that line (logged at `warn`), as does a line with quantity 0. A missing
//! cart and a cart without items both aggregate to the same empty view.

use crate::errors::{AppError, Result};
use crate::models::{Book, Cart, CartItem, Session, UserId};
use crate::store::{get_as, Collection, DocumentStore, RetryPolicy};
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A cart line with its book resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
  pub book: Book,
  pub quantity: u32,
}

impl CartLine {
  pub fn subtotal(&self) -> Decimal {
    self.book.price * Decimal::from(self.quantity)
  }
}

/// Result of aggregating one user's cart.
///
/// Only the aggregator builds these, so a `CartView` handed back by a caller is known to
/// have been priced from the store for `user_id` at `resolved_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
  user_id: UserId,
  lines: Vec<CartLine>,
  total: Decimal,
  resolved_at: DateTime<Utc>,
}

impl CartView {
  pub(crate) fn new(user_id: UserId, lines: Vec<CartLine>, resolved_at: DateTime<Utc>) -> Self {
    let total = lines.iter().map(CartLine::subtotal).sum();
    Self {
      user_id,
      lines,
      total,
      resolved_at,
    }
  }

  pub fn user_id(&self) -> &UserId {
    &self.user_id
  }

  pub fn lines(&self) -> &[CartLine] {
    &self.lines
  }

  pub fn total(&self) -> Decimal {
    self.total
  }

  pub fn resolved_at(&self) -> DateTime<Utc> {
    self.resolved_at
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  pub fn item_count(&self) -> u32 {
    self.lines.iter().map(|l| l.quantity).sum()
  }

  /// Same user and the same books, quantities and prices, line for line.
  pub fn same_contents(&self, other: &CartView) -> bool {
    self.user_id == other.user_id
      && self.lines.len() == other.lines.len()
      && self
        .lines
        .iter()
        .zip(&other.lines)
        .all(|(a, b)| a.book.id == b.book.id && a.quantity == b.quantity && a.book.price == b.book.price)
  }
}

#[derive(Clone)]
pub struct CartAggregator {
  store: Arc<dyn DocumentStore>,
  retry: RetryPolicy,
}

impl CartAggregator {
  pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> Self {
    Self { store, retry }
  }

  /// Aggregates the signed-in user's cart. Anonymous sessions are an `Auth` error.
  #[instrument(name = "CartAggregator::aggregate", skip_all, err(Display))]
  pub async fn aggregate(&self, session: &Session) -> Result<CartView> {
    let user_id = session
      .user_id()
      .ok_or_else(|| AppError::Auth("Sign in to view your cart.".to_string()))?;
    self.aggregate_for(user_id).await
  }

  pub(crate) async fn aggregate_for(&self, user_id: &UserId) -> Result<CartView> {
    let cart: Option<Cart> = self
      .retry
      .run("read cart", |_| get_as::<Cart>(self.store.as_ref(), Collection::Carts, user_id.as_str()))
      .await
      .map_err(|e| AppError::from_store("read cart", e))?;

    let items = cart.map(|c| c.items).unwrap_or_default();
    let resolved = try_join_all(items.iter().map(|item| self.resolve(item))).await?;
    let lines: Vec<CartLine> = resolved.into_iter().flatten().collect();

    let view = CartView::new(user_id.clone(), lines, Utc::now());
    debug!(%user_id, lines = view.lines.len(), total = %view.total, "Cart aggregated.");
    Ok(view)
  }

  async fn resolve(&self, item: &CartItem) -> Result<Option<CartLine>> {
    if item.quantity == 0 {
      debug!(book_id = %item.book, "Dropping cart line with zero quantity.");
      return Ok(None);
    }
    let book = self
      .retry
      .run("read book", |_| get_as::<Book>(self.store.as_ref(), Collection::Books, item.book.as_str()))
      .await
      .map_err(|e| AppError::from_store("read book", e))?;

    match book {
      Some(book) => Ok(Some(CartLine {
        book,
        quantity: item.quantity,
      })),
      None => {
        warn!(book_id = %item.book, "Cart references a book that no longer exists; line dropped.");
        Ok(None)
      }
    }
  }
}
