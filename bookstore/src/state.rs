// bookstore/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::flows;
use crate::services::{
  AuthProvider, Authenticator, CartAggregator, Catalog, InFlightCheckouts, LocalAuthProvider, ReconciliationLog,
};
use crate::store::{DocumentStore, MemoryStore, RetryPolicy};
use quire::Flows;
use std::sync::Arc;

/// Everything an operation needs, cheap to clone into flow contexts.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn DocumentStore>,
  pub flows: Arc<Flows<AppError>>,
  pub config: Arc<AppConfig>,
  pub auth: Authenticator,
  pub catalog: Catalog,
  pub carts: CartAggregator,
  pub checkouts_in_flight: Arc<InFlightCheckouts>,
  pub reconciliation: Arc<ReconciliationLog>,
}

impl AppState {
  /// Wires the services over `store` and registers every flow.
  pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>, auth_provider: Arc<dyn AuthProvider>) -> Self {
    let retry = config.retry_policy();
    let flows = Arc::new(Flows::<AppError>::new());
    flows::register_all_flows(&flows);
    tracing::info!("Bookstore flows registered.");

    Self {
      auth: Authenticator::new(auth_provider, store.clone(), retry),
      catalog: Catalog::new(store.clone(), retry),
      carts: CartAggregator::new(store.clone(), retry),
      store,
      flows,
      config: Arc::new(config),
      checkouts_in_flight: Arc::new(InFlightCheckouts::new()),
      reconciliation: Arc::new(ReconciliationLog::new()),
    }
  }

  /// State backed by a fresh `MemoryStore` and `LocalAuthProvider`.
  pub fn in_memory(config: AppConfig) -> Self {
    Self::new(config, Arc::new(MemoryStore::new()), Arc::new(LocalAuthProvider::new()))
  }

  pub fn retry(&self) -> RetryPolicy {
    self.config.retry_policy()
  }
}
