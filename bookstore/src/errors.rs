// bookstore/src/errors.rs

use crate::models::OrderId;
use crate::store::StoreError;
use quire::QuireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  /// A store call still failed after the retry budget was spent.
  #[error("Store unavailable during {operation}: {source}")]
  StoreUnavailable {
    operation: String,
    #[source]
    source: StoreError,
  },

  /// The order was written but a later step failed; the order stands.
  #[error("Order {order_id} was placed but {stage} failed: {source}")]
  PartialCompletion {
    order_id: OrderId,
    stage: String,
    #[source]
    source: StoreError,
  },

  #[error("A checkout is already in progress for this user")]
  CheckoutInProgress,

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Store Error: {0}")]
  Store(StoreError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: QuireError,
  },

  #[error("Internal Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Transient store failures become `StoreUnavailable`; the rest stay `Store`.
  pub fn from_store(operation: &str, err: StoreError) -> Self {
    match err {
      StoreError::NotFound { collection, id } => AppError::NotFound(format!("{}/{}", collection, id)),
      err if err.is_transient() => AppError::StoreUnavailable {
        operation: operation.to_string(),
        source: err,
      },
      err => AppError::Store(err),
    }
  }

  /// Text suitable for showing to the end user.
  pub fn user_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::Auth(m) => m.clone(),
      AppError::NotFound(_) => "The requested item could not be found.".to_string(),
      AppError::StoreUnavailable { .. } => {
        "The store is temporarily unavailable. Please try again in a moment.".to_string()
      }
      AppError::PartialCompletion { order_id, .. } => format!(
        "Your order {} was placed, but we could not finish updating your account. Our team has been notified.",
        order_id
      ),
      AppError::CheckoutInProgress => "Your order is already being placed.".to_string(),
      AppError::Config(_) | AppError::Store(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        "Something went wrong. Please try again later.".to_string()
      }
    }
  }

  pub fn is_retryable(&self) -> bool {
    matches!(self, AppError::StoreUnavailable { .. } | AppError::CheckoutInProgress)
  }
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    AppError::from_store("store call", err)
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<StoreError>() {
      Ok(store_err) => AppError::from(store_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::Collection;

  #[test]
  fn transient_store_errors_become_store_unavailable() {
    let err = AppError::from_store("create order", StoreError::Unavailable("timeout".into()));
    assert!(matches!(err, AppError::StoreUnavailable { ref operation, .. } if operation == "create order"));
    assert!(err.is_retryable());
    assert!(err.user_message().contains("try again"));
  }

  #[test]
  fn missing_documents_become_not_found() {
    let err = AppError::from(StoreError::NotFound {
      collection: Collection::Books,
      id: "b9".into(),
    });
    assert!(matches!(err, AppError::NotFound(ref m) if m == "books/b9"));
  }

  #[test]
  fn anyhow_wrapped_store_errors_keep_their_class() {
    let wrapped = anyhow::Error::new(StoreError::Unavailable("blip".into()));
    assert!(matches!(AppError::from(wrapped), AppError::StoreUnavailable { .. }));
    assert!(matches!(AppError::from(anyhow::anyhow!("other")), AppError::Internal(_)));
  }
}
