// core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Errors raised by the engine itself, as opposed to the errors a flow's own
/// handlers return. Flow error types must be `From<QuireError>` so these can be
/// surfaced through `Flow::run`.
#[derive(Debug, Error)]
pub enum QuireError {
  #[error("Stage not found: {stage}")]
  StageNotFound { stage: String },

  #[error("No handler registered for required stage '{stage}'")]
  HandlerMissing { stage: String },

  #[error("No flow registered for context type {context_type}")]
  FlowNotRegistered { context_type: String },

  #[error("Context type mismatch (expected {expected_type})")]
  ContextMismatch { expected_type: String },

  #[error("Stage handler failed: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal quire error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for QuireError {
  fn from(err: AnyhowError) -> Self {
    QuireError::Handler { source: err }
  }
}

pub type QuireResult<T, E = QuireError> = std::result::Result<T, E>;
