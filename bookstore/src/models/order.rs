// bookstore/src/models/order.rs
use super::{BookId, OrderId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

/// Denormalized copy of a cart line at the time the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
  pub book_id: BookId,
  pub title: String,
  pub quantity: u32,
  pub price: Decimal,
}

impl OrderLine {
  pub fn subtotal(&self) -> Decimal {
    self.price * Decimal::from(self.quantity)
  }
}

/// An `orders` document. Written once and never modified by the checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  #[serde(skip_serializing, default)]
  pub id: OrderId,
  pub user_id: UserId,
  pub name: String,
  pub phone: String,
  pub address: String,
  pub items: Vec<OrderLine>,
  pub total: Decimal,
  /// Set by the store's clock when the order is written; absent on the unsaved value.
  #[serde(skip_serializing, default)]
  pub created_at: Option<DateTime<Utc>>,
  pub status: OrderStatus,
}

/// Field name the store stamps with its own time on create.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Set on the order in the same batch that decrements its books' stock.
pub const STOCK_ADJUSTED_FIELD: &str = "stockAdjusted";

#[cfg(test)]
mod tests {
  use super::*;

  fn line(price: Decimal, quantity: u32) -> OrderLine {
    OrderLine {
      book_id: BookId::new("b"),
      title: "B".to_string(),
      quantity,
      price,
    }
  }

  #[test]
  fn subtotals_are_exact_in_cents() {
    let lines = [line(Decimal::new(1999, 2), 3), line(Decimal::new(1, 1), 10)];
    let total: Decimal = lines.iter().map(OrderLine::subtotal).sum();
    assert_eq!(lines[0].subtotal(), Decimal::new(5997, 2));
    assert_eq!(total, Decimal::new(6997, 2));
  }

  #[test]
  fn created_at_is_read_but_never_written() {
    let json = serde_json::json!({
      "userId": "u1",
      "name": "Ada",
      "phone": "1",
      "address": "here",
      "items": [],
      "total": "0",
      "createdAt": "2024-05-01T10:00:00Z",
      "status": "pending"
    });
    let order: Order = serde_json::from_value(json).unwrap();
    assert!(order.created_at.is_some());

    let written = serde_json::to_value(&order).unwrap();
    assert!(written.get("createdAt").is_none());
    assert!(written.get("id").is_none());
  }
}
