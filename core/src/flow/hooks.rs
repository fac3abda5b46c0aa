// core/src/flow/hooks.rs

//! Registration of `before`, `on` and `after` handlers.
//!
//! Handlers may return any error that converts into the flow's `Err`, so a stage can
//! use a narrower error type than the flow it belongs to.

use crate::core::control::StageControl;
use crate::core::handler::{Handler, HandlerFuture, Phase};
use crate::core::shared::Shared;
use crate::error::QuireError;
use crate::flow::definition::Flow;
use std::future::Future;
use tracing::{event, Level};

impl<T, Err> Flow<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<QuireError> + Send + Sync + 'static,
{
  /// Attaches a handler that runs before the stage's `on` handlers.
  ///
  /// # Panics
  /// If `stage` is not part of the flow.
  pub fn before<F, HandlerErr>(&mut self, stage: &str, handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StageControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.attach(Phase::Before, stage, handler_fn);
  }

  /// Attaches the main handler of a stage.
  ///
  /// # Panics
  /// If `stage` is not part of the flow.
  pub fn on<F, HandlerErr>(&mut self, stage: &str, handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StageControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.attach(Phase::On, stage, handler_fn);
  }

  /// Attaches a handler that runs once the stage's `on` handlers succeeded.
  ///
  /// # Panics
  /// If `stage` is not part of the flow.
  pub fn after<F, HandlerErr>(&mut self, stage: &str, handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StageControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.attach(Phase::After, stage, handler_fn);
  }

  fn attach<F, HandlerErr>(
    &mut self,
    phase: Phase,
    stage: &str,
    handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<StageControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.assert_stage(stage);
    let boxed: Handler<T, Err> = Box::new(move |ctx: Shared<T>| -> HandlerFuture<Err> {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::<Err>::into) })
    });
    self.handlers_mut(phase).entry(stage.to_string()).or_default().push(boxed);
    event!(Level::TRACE, flow = %self.name, %stage, phase = phase.as_str(), "Handler attached.");
  }

  fn handlers_mut(&mut self, phase: Phase) -> &mut std::collections::HashMap<String, Vec<Handler<T, Err>>> {
    match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    }
  }

  pub(crate) fn handlers(&self, phase: Phase, stage: &str) -> &[Handler<T, Err>] {
    let map = match phase {
      Phase::Before => &self.before,
      Phase::On => &self.on,
      Phase::After => &self.after,
    };
    map.get(stage).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Number of handlers attached to `stage` across all phases.
  pub fn handler_count(&self, stage: &str) -> usize {
    Phase::ALL.iter().map(|phase| self.handlers(*phase, stage).len()).sum()
  }
}
