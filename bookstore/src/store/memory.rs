// bookstore/src/store/memory.rs

//! In-process `DocumentStore`. Each operation runs under a single lock, which is what
//! makes `batch_update` all-or-nothing.

use super::{BatchUpdate, Collection, Document, DocumentStore, DocumentWrite, StoreError, StoreResult, StoredDocument};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryStore {
  collections: RwLock<HashMap<Collection, BTreeMap<String, Document>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of documents in `collection`.
  pub fn count(&self, collection: Collection) -> usize {
    self.collections.read().get(&collection).map_or(0, BTreeMap::len)
  }

  fn stamp(write: DocumentWrite) -> Document {
    let DocumentWrite {
      mut data,
      server_timestamps,
    } = write;
    if !server_timestamps.is_empty() {
      let now = Value::String(Utc::now().to_rfc3339());
      for field in server_timestamps {
        data.insert(field, now.clone());
      }
    }
    data
  }
}

#[async_trait]
impl DocumentStore for MemoryStore {
  async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<StoredDocument>> {
    let guard = self.collections.read();
    Ok(guard.get(&collection).and_then(|docs| docs.get(id)).map(|data| StoredDocument {
      id: id.to_string(),
      data: data.clone(),
    }))
  }

  async fn list(&self, collection: Collection) -> StoreResult<Vec<StoredDocument>> {
    let guard = self.collections.read();
    Ok(
      guard
        .get(&collection)
        .map(|docs| {
          docs
            .iter()
            .map(|(id, data)| StoredDocument {
              id: id.clone(),
              data: data.clone(),
            })
            .collect()
        })
        .unwrap_or_default(),
    )
  }

  #[instrument(name = "MemoryStore::create", skip(self, write), fields(%collection), err(Display))]
  async fn create(&self, collection: Collection, id: Option<&str>, write: DocumentWrite) -> StoreResult<String> {
    let id = id.map(str::to_string).unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut guard = self.collections.write();
    let docs = guard.entry(collection).or_default();
    if docs.contains_key(&id) {
      return Err(StoreError::AlreadyExists { collection, id });
    }
    docs.insert(id.clone(), Self::stamp(write));
    debug!(%id, "Document created.");
    Ok(id)
  }

  #[instrument(name = "MemoryStore::update", skip(self, write), fields(%collection), err(Display))]
  async fn update(&self, collection: Collection, id: &str, write: DocumentWrite) -> StoreResult<()> {
    let mut guard = self.collections.write();
    let existing = guard
      .get_mut(&collection)
      .and_then(|docs| docs.get_mut(id))
      .ok_or_else(|| StoreError::NotFound {
        collection,
        id: id.to_string(),
      })?;
    existing.extend(Self::stamp(write));
    Ok(())
  }

  #[instrument(name = "MemoryStore::delete", skip(self), fields(%collection))]
  async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
    let removed = self
      .collections
      .write()
      .get_mut(&collection)
      .and_then(|docs| docs.remove(id))
      .is_some();
    debug!(removed, "Delete applied.");
    Ok(())
  }

  #[instrument(name = "MemoryStore::batch_update", skip_all, fields(size = updates.len()), err(Display))]
  async fn batch_update(&self, updates: Vec<BatchUpdate>) -> StoreResult<()> {
    let mut guard = self.collections.write();

    // Every target must exist and meet its precondition before anything is touched.
    for update in &updates {
      let doc = guard
        .get(&update.collection)
        .and_then(|docs| docs.get(&update.id))
        .ok_or_else(|| StoreError::NotFound {
          collection: update.collection,
          id: update.id.clone(),
        })?;
      if let Some(expect) = &update.expect {
        let current = doc.get(&expect.field).unwrap_or(&Value::Null);
        if current != &expect.equals {
          debug!(collection = %update.collection, id = %update.id, field = %expect.field, "Batch precondition failed.");
          return Err(StoreError::Conflict {
            collection: update.collection,
            id: update.id.clone(),
            field: expect.field.clone(),
          });
        }
      }
    }

    for BatchUpdate { collection, id, write, .. } in updates {
      if let Some(doc) = guard.get_mut(&collection).and_then(|docs| docs.get_mut(&id)) {
        doc.extend(Self::stamp(write));
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn write(value: Value) -> DocumentWrite {
    DocumentWrite::new(super::super::to_document(&value).unwrap())
  }

  #[tokio::test]
  async fn create_with_taken_id_is_rejected() {
    let store = MemoryStore::new();
    store.create(Collection::Books, Some("b1"), write(json!({"title": "A"}))).await.unwrap();
    let err = store
      .create(Collection::Books, Some("b1"), write(json!({"title": "B"})))
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }));

    let doc = store.get(Collection::Books, "b1").await.unwrap().unwrap();
    assert_eq!(doc.data["title"], json!("A"));
  }

  #[tokio::test]
  async fn create_without_id_assigns_one() {
    let store = MemoryStore::new();
    let id = store.create(Collection::Orders, None, write(json!({"x": 1}))).await.unwrap();
    assert!(Uuid::parse_str(&id).is_ok());
    assert_eq!(store.count(Collection::Orders), 1);
  }

  #[tokio::test]
  async fn update_merges_top_level_fields() {
    let store = MemoryStore::new();
    store
      .create(Collection::Books, Some("b1"), write(json!({"title": "A", "quantity": 3})))
      .await
      .unwrap();
    store
      .update(Collection::Books, "b1", DocumentWrite::field("quantity", 1))
      .await
      .unwrap();

    let doc = store.get(Collection::Books, "b1").await.unwrap().unwrap();
    assert_eq!(doc.data["title"], json!("A"));
    assert_eq!(doc.data["quantity"], json!(1));

    let missing = store.update(Collection::Books, "nope", DocumentWrite::field("quantity", 1)).await;
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));
  }

  #[tokio::test]
  async fn delete_is_idempotent() {
    let store = MemoryStore::new();
    store.create(Collection::Carts, Some("u1"), write(json!({}))).await.unwrap();
    store.delete(Collection::Carts, "u1").await.unwrap();
    store.delete(Collection::Carts, "u1").await.unwrap();
    assert!(store.get(Collection::Carts, "u1").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn batch_with_a_missing_target_changes_nothing() {
    let store = MemoryStore::new();
    store
      .create(Collection::Books, Some("b1"), write(json!({"quantity": 5})))
      .await
      .unwrap();

    let err = store
      .batch_update(vec![
        BatchUpdate::new(Collection::Books, "b1", DocumentWrite::field("quantity", 0)),
        BatchUpdate::new(Collection::Books, "ghost", DocumentWrite::field("quantity", 0)),
      ])
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let doc = store.get(Collection::Books, "b1").await.unwrap().unwrap();
    assert_eq!(doc.data["quantity"], json!(5));
  }

  #[tokio::test]
  async fn failed_precondition_rejects_the_whole_batch() {
    let store = MemoryStore::new();
    store
      .create(Collection::Books, Some("b1"), write(json!({"quantity": 5})))
      .await
      .unwrap();
    store
      .create(Collection::Books, Some("b2"), write(json!({"quantity": 9})))
      .await
      .unwrap();

    let err = store
      .batch_update(vec![
        BatchUpdate::new(Collection::Books, "b1", DocumentWrite::field("quantity", 4)).expecting("quantity", 5),
        BatchUpdate::new(Collection::Books, "b2", DocumentWrite::field("quantity", 7)).expecting("quantity", 8),
      ])
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { ref id, .. } if id == "b2"));
    let b1 = store.get(Collection::Books, "b1").await.unwrap().unwrap();
    assert_eq!(b1.data["quantity"], json!(5));

    // An absent field matches `Null`.
    store
      .batch_update(vec![
        BatchUpdate::new(Collection::Books, "b1", DocumentWrite::field("flag", true)).expecting("flag", Value::Null),
      ])
      .await
      .unwrap();
    let b1 = store.get(Collection::Books, "b1").await.unwrap().unwrap();
    assert_eq!(b1.data["flag"], json!(true));
  }

  #[tokio::test]
  async fn server_timestamps_are_filled_in() {
    let store = MemoryStore::new();
    store
      .create(
        Collection::Orders,
        Some("o1"),
        write(json!({"status": "pending"})).with_server_timestamp("createdAt"),
      )
      .await
      .unwrap();

    let doc = store.get(Collection::Orders, "o1").await.unwrap().unwrap();
    let stamped = doc.data["createdAt"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(stamped).is_ok());
  }
}
