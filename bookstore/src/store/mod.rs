// bookstore/src/store/mod.rs

//! The document store collaborator.
//!
//! Everything the services and flows persist goes through [`DocumentStore`], a small
//! document-database surface: single-document get/create/update/delete, a listing for
//! the catalog, and an all-or-nothing multi-document update batch. [`MemoryStore`] is
//! the bundled implementation.

pub mod memory;
pub mod retry;

pub use memory::MemoryStore;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// A stored document body: a JSON object without its id.
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
  Users,
  Books,
  Carts,
  Orders,
}

impl Collection {
  pub fn as_str(&self) -> &'static str {
    match self {
      Collection::Users => "users",
      Collection::Books => "books",
      Collection::Carts => "carts",
      Collection::Orders => "orders",
    }
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
  #[error("Document {collection}/{id} not found")]
  NotFound { collection: Collection, id: String },

  #[error("Document {collection}/{id} already exists")]
  AlreadyExists { collection: Collection, id: String },

  #[error("Document store unavailable: {0}")]
  Unavailable(String),

  #[error("Write rejected by the document store: {0}")]
  Rejected(String),

  #[error("Document encoding error: {0}")]
  Codec(String),

  #[error("Document {collection}/{id} changed: `{field}` no longer matches")]
  Conflict {
    collection: Collection,
    id: String,
    field: String,
  },
}

impl StoreError {
  /// Transient failures are the only ones worth retrying.
  pub fn is_transient(&self) -> bool {
    matches!(self, StoreError::Unavailable(_))
  }
}

impl From<serde_json::Error> for StoreError {
  fn from(err: serde_json::Error) -> Self {
    StoreError::Codec(err.to_string())
  }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Field data for a create or update, plus the fields the store fills with its own clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
  pub data: Document,
  pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
  pub fn new(data: Document) -> Self {
    Self {
      data,
      server_timestamps: Vec::new(),
    }
  }

  /// Serializes `value` (which must serialize to a JSON object) as the write's data.
  pub fn from_value<T: Serialize>(value: &T) -> StoreResult<Self> {
    Ok(Self::new(to_document(value)?))
  }

  /// Single-field update.
  pub fn field(name: &str, value: impl Into<Value>) -> Self {
    let mut data = Document::new();
    data.insert(name.to_string(), value.into());
    Self::new(data)
  }

  /// Asks the store to set `field` to its own current time when the write is applied.
  pub fn with_server_timestamp(mut self, field: &str) -> Self {
    self.server_timestamps.push(field.to_string());
    self
  }
}

/// Field value a document must still hold for a batch to apply. An absent field
/// compares equal to `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Precondition {
  pub field: String,
  pub equals: Value,
}

/// One entry of [`DocumentStore::batch_update`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchUpdate {
  pub collection: Collection,
  pub id: String,
  pub write: DocumentWrite,
  pub expect: Option<Precondition>,
}

impl BatchUpdate {
  pub fn new(collection: Collection, id: impl Into<String>, write: DocumentWrite) -> Self {
    Self {
      collection,
      id: id.into(),
      write,
      expect: None,
    }
  }

  /// Only apply the batch while `field` still equals `value`.
  pub fn expecting(mut self, field: &str, value: impl Into<Value>) -> Self {
    self.expect = Some(Precondition {
      field: field.to_string(),
      equals: value.into(),
    });
    self
  }
}

/// A document as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
  pub id: String,
  pub data: Document,
}

impl StoredDocument {
  /// Decodes the body into `T`, exposing the document id as an `id` field.
  pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
    let mut data = self.data.clone();
    data.insert("id".to_string(), Value::String(self.id.clone()));
    Ok(serde_json::from_value(Value::Object(data))?)
  }
}

pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
  match serde_json::to_value(value)? {
    Value::Object(map) => Ok(map),
    other => Err(StoreError::Codec(format!("expected a JSON object, got {}", other))),
  }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
  async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<StoredDocument>>;

  /// Every document of a collection, ordered by id.
  async fn list(&self, collection: Collection) -> StoreResult<Vec<StoredDocument>>;

  /// Creates a document. With `id = None` the store assigns one. An explicit id that is
  /// already taken is `StoreError::AlreadyExists`. Returns the document id.
  async fn create(&self, collection: Collection, id: Option<&str>, write: DocumentWrite) -> StoreResult<String>;

  /// Merges top-level fields into an existing document; `NotFound` if it is absent.
  async fn update(&self, collection: Collection, id: &str, write: DocumentWrite) -> StoreResult<()>;

  /// Deleting an absent document succeeds.
  async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()>;

  /// Applies every update or none of them. A missing target is `NotFound`; a failed
  /// precondition is `Conflict`.
  async fn batch_update(&self, updates: Vec<BatchUpdate>) -> StoreResult<()>;
}

/// Reads and decodes a document, mapping absence to `None`.
pub async fn get_as<T: DeserializeOwned>(
  store: &dyn DocumentStore,
  collection: Collection,
  id: &str,
) -> StoreResult<Option<T>> {
  match store.get(collection, id).await? {
    Some(doc) => Ok(Some(doc.decode()?)),
    None => Ok(None),
  }
}
