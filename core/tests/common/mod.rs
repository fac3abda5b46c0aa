// core/tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use quire::{QuireError, Shared, StageControl};
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct Ledger {
  pub total: i64,
  pub visited: Vec<String>,
  pub halt_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("engine error: {0}")]
  Engine(String),

  #[error("stage failed: {0}")]
  Stage(String),
}

impl From<QuireError> for TestError {
  fn from(err: QuireError) -> Self {
    TestError::Engine(format!("{:?}", err))
  }
}

/// Handler that records its stage name, adds `amount` and halts if asked to.
pub fn recording_handler(
  stage: &'static str,
  amount: i64,
) -> impl Fn(Shared<Ledger>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<StageControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: Shared<Ledger>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.total += amount;
      guard.visited.push(stage.to_string());
      if guard.halt_at.as_deref() == Some(stage) {
        return Ok(StageControl::Halt);
      }
      Ok(StageControl::Continue)
    })
  }
}

pub fn failing_handler(
  stage: &'static str,
  message: &'static str,
) -> impl Fn(Shared<Ledger>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<StageControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: Shared<Ledger>| {
    Box::pin(async move {
      ctx.write().visited.push(stage.to_string());
      Err(TestError::Stage(message.to_string()))
    })
  }
}

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
