// bookstore/src/services/checkout_guard.rs
use crate::models::UserId;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Users with a checkout attempt currently running.
#[derive(Debug, Default)]
pub struct InFlightCheckouts {
  users: Mutex<HashSet<UserId>>,
}

impl InFlightCheckouts {
  pub fn new() -> Self {
    Self::default()
  }

  /// Claims the slot for `user_id`, or `None` if an attempt is already running.
  /// The slot is released when the returned guard is dropped.
  pub fn try_begin(self: &Arc<Self>, user_id: &UserId) -> Option<CheckoutGuard> {
    if !self.users.lock().insert(user_id.clone()) {
      debug!(%user_id, "Checkout already in flight.");
      return None;
    }
    Some(CheckoutGuard {
      registry: Arc::clone(self),
      user_id: user_id.clone(),
    })
  }

  pub fn is_in_flight(&self, user_id: &UserId) -> bool {
    self.users.lock().contains(user_id)
  }
}

#[derive(Debug)]
pub struct CheckoutGuard {
  registry: Arc<InFlightCheckouts>,
  user_id: UserId,
}

impl Drop for CheckoutGuard {
  fn drop(&mut self) {
    self.registry.users.lock().remove(&self.user_id);
  }
}
