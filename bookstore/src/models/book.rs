// bookstore/src/models/book.rs
use super::BookId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A `books` document.
///
/// `quantity` is the stock level. It is signed: checkout decrements it without a floor,
/// so an oversold book shows up as a negative count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
  #[serde(skip_serializing, default)]
  pub id: BookId,
  pub title: String,
  pub author: String,
  pub quantity: i64,
  pub price: Decimal,
  #[serde(default)]
  pub cover: String,
  #[serde(default)]
  pub description: String,
}
