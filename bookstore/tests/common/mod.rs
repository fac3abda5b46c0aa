// bookstore/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use bookstore::models::{Actor, Book, BookId, Cart, CartItem, Order, Role, Session, UserId};
use bookstore::services::LocalAuthProvider;
use bookstore::store::{
  get_as, BatchUpdate, Collection, DocumentStore, DocumentWrite, MemoryStore, StoreError, StoreResult, StoredDocument,
};
use bookstore::{AppConfig, AppState, ShippingDetails, StockPolicy};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
  Get,
  List,
  Create,
  Update,
  Delete,
  Batch,
}

#[derive(Debug, Clone)]
pub enum FaultMode {
  /// Fail with `Unavailable` without touching the data.
  Unavailable,
  /// Apply the write, then report `Unavailable` as if the response was lost.
  CommitThenUnavailable,
  /// Fail with the given error without touching the data.
  Error(StoreError),
  /// Delete another document first, then run the call as usual.
  DeleteBefore { collection: Collection, id: String },
}

struct Fault {
  op: Op,
  collection: Collection,
  mode: FaultMode,
}

/// `MemoryStore` wrapper that injects queued failures and logs applied writes.
///
/// Each queued fault fires once, on the next matching `(op, collection)` call.
/// Batches match on the collection of their first update. With `interleave` on, every
/// call yields to the runtime first, so requests joined on one task take turns call by
/// call.
#[derive(Default)]
pub struct FaultyStore {
  inner: MemoryStore,
  faults: Mutex<VecDeque<Fault>>,
  writes: Mutex<Vec<(Op, Collection)>>,
  interleave: AtomicBool,
}

impl FaultyStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push_fault(&self, op: Op, collection: Collection, mode: FaultMode) {
    self.faults.lock().push_back(Fault { op, collection, mode });
  }

  pub fn fail_times(&self, op: Op, collection: Collection, times: usize) {
    for _ in 0..times {
      self.push_fault(op, collection, FaultMode::Unavailable);
    }
  }

  pub fn interleave(&self) {
    self.interleave.store(true, Ordering::SeqCst);
  }

  /// Writes that actually changed the data, in order.
  pub fn applied_writes(&self) -> Vec<(Op, Collection)> {
    self.writes.lock().clone()
  }

  pub fn count(&self, collection: Collection) -> usize {
    self.inner.count(collection)
  }

  fn take_fault(&self, op: Op, collection: Collection) -> Option<FaultMode> {
    let mut faults = self.faults.lock();
    let idx = faults.iter().position(|f| f.op == op && f.collection == collection)?;
    faults.remove(idx).map(|f| f.mode)
  }

  fn record(&self, op: Op, collection: Collection) {
    self.writes.lock().push((op, collection));
  }

  /// Runs `apply` according to the pending fault for this call, if any.
  async fn guarded<T, F, Fut>(&self, op: Op, collection: Collection, apply: F) -> StoreResult<T>
  where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = StoreResult<T>>,
  {
    if self.interleave.load(Ordering::SeqCst) {
      tokio::task::yield_now().await;
    }
    match self.take_fault(op, collection) {
      Some(FaultMode::Unavailable) => Err(StoreError::Unavailable(format!("injected {:?} failure", op))),
      Some(FaultMode::Error(err)) => Err(err),
      Some(FaultMode::CommitThenUnavailable) => {
        apply().await?;
        if op != Op::Get && op != Op::List {
          self.record(op, collection);
        }
        Err(StoreError::Unavailable(format!("injected {:?} lost response", op)))
      }
      Some(FaultMode::DeleteBefore { collection: target, id }) => {
        self.inner.delete(target, &id).await?;
        let value = apply().await?;
        self.record(op, collection);
        Ok(value)
      }
      None => {
        let value = apply().await?;
        if op != Op::Get && op != Op::List {
          self.record(op, collection);
        }
        Ok(value)
      }
    }
  }
}

#[async_trait]
impl DocumentStore for FaultyStore {
  async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<StoredDocument>> {
    self.guarded(Op::Get, collection, || self.inner.get(collection, id)).await
  }

  async fn list(&self, collection: Collection) -> StoreResult<Vec<StoredDocument>> {
    self.guarded(Op::List, collection, || self.inner.list(collection)).await
  }

  async fn create(&self, collection: Collection, id: Option<&str>, write: DocumentWrite) -> StoreResult<String> {
    self
      .guarded(Op::Create, collection, || self.inner.create(collection, id, write))
      .await
  }

  async fn update(&self, collection: Collection, id: &str, write: DocumentWrite) -> StoreResult<()> {
    self
      .guarded(Op::Update, collection, || self.inner.update(collection, id, write))
      .await
  }

  async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
    self.guarded(Op::Delete, collection, || self.inner.delete(collection, id)).await
  }

  async fn batch_update(&self, updates: Vec<BatchUpdate>) -> StoreResult<()> {
    let collection = updates.first().map(|u| u.collection).unwrap_or(Collection::Books);
    self
      .guarded(Op::Batch, collection, || self.inner.batch_update(updates))
      .await
  }
}

pub struct Harness {
  pub app: AppState,
  pub store: Arc<FaultyStore>,
}

pub fn test_config() -> AppConfig {
  AppConfig {
    retry_max_attempts: 3,
    retry_base_delay: Duration::from_millis(1),
    stock_policy: StockPolicy::ElevatedOnly,
    summary_max_age: Duration::from_secs(300),
    log_json: false,
    seed_catalog: false,
  }
}

pub fn harness() -> Harness {
  harness_with(test_config())
}

pub fn harness_with(config: AppConfig) -> Harness {
  setup_tracing();
  let store = Arc::new(FaultyStore::new());
  let app = AppState::new(config, store.clone(), Arc::new(LocalAuthProvider::new()));
  Harness { app, store }
}

pub fn price(units: i64, scale: u32) -> Decimal {
  Decimal::new(units, scale)
}

pub async fn insert_book(store: &FaultyStore, id: &str, title: &str, quantity: i64, price: Decimal) -> BookId {
  let book = Book {
    id: BookId::new(id),
    title: title.to_string(),
    author: "Test Author".to_string(),
    quantity,
    price,
    cover: String::new(),
    description: String::new(),
  };
  let write = DocumentWrite::from_value(&book).unwrap();
  store.create(Collection::Books, Some(id), write).await.unwrap();
  BookId::new(id)
}

pub async fn put_cart(store: &FaultyStore, user_id: &UserId, items: &[(&BookId, u32)]) {
  let cart = Cart {
    id: user_id.clone(),
    user_id: user_id.clone(),
    items: items
      .iter()
      .map(|(book, quantity)| CartItem {
        book: (*book).clone(),
        quantity: *quantity,
      })
      .collect(),
  };
  let write = DocumentWrite::from_value(&cart).unwrap();
  store.create(Collection::Carts, Some(user_id.as_str()), write).await.unwrap();
}

pub async fn stock_of(store: &FaultyStore, id: &BookId) -> i64 {
  get_as::<Book>(store, Collection::Books, id.as_str())
    .await
    .unwrap()
    .unwrap()
    .quantity
}

pub async fn cart_of(store: &FaultyStore, user_id: &UserId) -> Option<Cart> {
  get_as::<Cart>(store, Collection::Carts, user_id.as_str()).await.unwrap()
}

pub async fn orders_in(store: &FaultyStore) -> Vec<Order> {
  store
    .list(Collection::Orders)
    .await
    .unwrap()
    .iter()
    .map(|doc| doc.decode::<Order>().unwrap())
    .collect()
}

/// A signed-in session without going through password hashing.
pub fn session_for(user_id: &str, role: Role) -> Session {
  Session::signed_in(Actor {
    user_id: UserId::new(user_id),
    email: format!("{}@example.test", user_id),
    role,
  })
}

pub fn shipping() -> ShippingDetails {
  ShippingDetails::new("Ada Reader", "555-0100", "1 Library Lane")
}
