// core/src/core/handler.rs

use crate::core::control::StageControl;
use crate::core::shared::Shared;
use std::future::Future;
use std::pin::Pin;

/// Boxed future every stored handler resolves to.
pub type HandlerFuture<Err> = Pin<Box<dyn Future<Output = Result<StageControl, Err>> + Send>>;

/// A stage handler as stored by a flow.
///
/// Handlers take an owned clone of the run's `Shared<T>`. They read what they need,
/// drop the guard, await their I/O, then write results back under a fresh guard.
pub type Handler<T, Err> = Box<dyn Fn(Shared<T>) -> HandlerFuture<Err> + Send + Sync>;

/// Which phase of a stage a handler belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub const ALL: [Phase; 3] = [Phase::Before, Phase::On, Phase::After];

  pub fn as_str(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}
