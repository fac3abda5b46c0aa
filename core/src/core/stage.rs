// core/src/core/stage.rs

use super::Shared;
use std::sync::Arc;

/// Predicate evaluated right before a stage runs; `true` skips the stage.
pub type SkipIf<T> = Arc<dyn Fn(Shared<T>) -> bool + Send + Sync + 'static>;

/// One named stage of a flow.
#[derive(Clone)]
pub struct StageDef<T: 'static + Send + Sync> {
  pub name: String,
  /// An optional stage with no handlers is skipped instead of failing the run.
  pub optional: bool,
  pub skip_if: Option<SkipIf<T>>,
}

impl<T: 'static + Send + Sync> StageDef<T> {
  pub fn new(name: impl Into<String>, optional: bool, skip_if: Option<SkipIf<T>>) -> Self {
    Self {
      name: name.into(),
      optional,
      skip_if,
    }
  }

  pub(crate) fn should_skip(&self, ctx: &Shared<T>) -> bool {
    self.skip_if.as_ref().is_some_and(|cond| cond(ctx.clone()))
  }
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StageDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StageDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_if", &self.skip_if.is_some())
      .finish()
  }
}
