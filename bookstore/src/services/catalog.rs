// bookstore/src/services/catalog.rs

//! Read-only access to the `books` collection.

use crate::errors::{AppError, Result};
use crate::models::{Book, BookId};
use crate::store::{get_as, Collection, DocumentStore, DocumentWrite, RetryPolicy};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct Catalog {
  store: Arc<dyn DocumentStore>,
  retry: RetryPolicy,
}

impl Catalog {
  pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> Self {
    Self { store, retry }
  }

  /// Every book, ordered by id.
  #[instrument(name = "Catalog::list_books", skip(self), err(Display))]
  pub async fn list_books(&self) -> Result<Vec<Book>> {
    let docs = self
      .retry
      .run("list books", |_| self.store.list(Collection::Books))
      .await
      .map_err(|e| AppError::from_store("list books", e))?;
    docs
      .iter()
      .map(|doc| doc.decode::<Book>().map_err(AppError::from))
      .collect()
  }

  /// A single book; `AppError::NotFound` if it does not exist.
  #[instrument(name = "Catalog::get_book", skip(self), fields(book_id = %id), err(Display))]
  pub async fn get_book(&self, id: &BookId) -> Result<Book> {
    self.find_book(id).await?.ok_or_else(|| AppError::NotFound(format!("Book {}", id)))
  }

  /// Like `get_book` but absence is `None`.
  pub async fn find_book(&self, id: &BookId) -> Result<Option<Book>> {
    self
      .retry
      .run("read book", |_| get_as::<Book>(self.store.as_ref(), Collection::Books, id.as_str()))
      .await
      .map_err(|e| AppError::from_store("read book", e))
  }

  /// Inserts a book under a store-assigned id and returns the stored value.
  #[instrument(name = "Catalog::add_book", skip(self, book), fields(title = %book.title), err(Display))]
  pub async fn add_book(&self, mut book: Book) -> Result<Book> {
    if book.price < Decimal::ZERO {
      return Err(AppError::Validation("Price cannot be negative.".to_string()));
    }
    if book.title.trim().is_empty() {
      return Err(AppError::Validation("Title is required.".to_string()));
    }
    let write = DocumentWrite::from_value(&book)?;
    // No pre-generated key here, so a retried create could duplicate the book.
    let id = self
      .store
      .create(Collection::Books, None, write)
      .await
      .map_err(|e| AppError::from_store("create book", e))?;
    book.id = BookId::new(id);
    Ok(book)
  }
}
