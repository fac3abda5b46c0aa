// bookstore/src/models/cart.rs
use super::{BookId, UserId};
use serde::{Deserialize, Serialize};

/// One line of a cart. `book` is only a lookup key: the book may since have been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub book: BookId,
  pub quantity: u32,
}

/// A `carts` document. Keyed by the owner's user id, so each user has at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
  #[serde(skip_serializing, default)]
  pub id: UserId,
  pub user_id: UserId,
  #[serde(default)]
  pub items: Vec<CartItem>,
}

impl Cart {
  pub fn empty(user_id: UserId) -> Self {
    Self {
      id: user_id.clone(),
      user_id,
      items: Vec::new(),
    }
  }

  /// Adds `quantity` of `book`, merging into an existing line for the same book.
  pub fn add_item(&mut self, book: BookId, quantity: u32) {
    match self.items.iter_mut().find(|item| item.book == book) {
      Some(line) => line.quantity = line.quantity.saturating_add(quantity),
      None => self.items.push(CartItem { book, quantity }),
    }
  }
}
