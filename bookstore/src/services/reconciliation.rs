// bookstore/src/services/reconciliation.rs
use crate::models::{OrderId, UserId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// An order that was written while a later checkout step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationEntry {
  pub order_id: OrderId,
  pub user_id: UserId,
  pub stage: String,
  pub error: String,
  pub recorded_at: DateTime<Utc>,
}

/// In-process record of partially completed checkouts awaiting manual follow-up.
/// Nothing here repairs anything.
#[derive(Debug, Default)]
pub struct ReconciliationLog {
  entries: Mutex<Vec<ReconciliationEntry>>,
}

impl ReconciliationLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&self, order_id: OrderId, user_id: UserId, stage: &str, error: &str) {
    self.entries.lock().push(ReconciliationEntry {
      order_id,
      user_id,
      stage: stage.to_string(),
      error: error.to_string(),
      recorded_at: Utc::now(),
    });
  }

  pub fn entries(&self) -> Vec<ReconciliationEntry> {
    self.entries.lock().clone()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
