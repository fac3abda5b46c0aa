// core/src/flow/definition.rs

//! The `Flow<T, Err>` struct and the methods that build and reshape its stage list.

use crate::core::handler::Handler;
use crate::core::stage::{SkipIf, StageDef};
use crate::error::{QuireError, QuireResult};
use std::collections::HashMap;

/// An ordered list of named stages plus the handlers attached to each of them.
///
/// `T` is the state shared by all handlers of one run (wrapped in `Shared<T>`).
/// `Err` is what handlers return; it must absorb engine errors, hence `From<QuireError>`.
pub struct Flow<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<QuireError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) stages: Vec<StageDef<T>>,
  pub(crate) before: HashMap<String, Vec<Handler<T, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<T, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<T, Err>>>,
}

impl<T, Err> Flow<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<QuireError> + Send + Sync + 'static,
{
  /// Creates a flow from `(stage name, optional, skip_if)` triples, in run order.
  pub fn new(name: &str, stage_defs: &[(&str, bool, Option<SkipIf<T>>)]) -> Self {
    let stages = stage_defs
      .iter()
      .map(|(stage, optional, skip_if)| StageDef::new(*stage, *optional, skip_if.clone()))
      .collect();

    Self {
      name: name.to_string(),
      stages,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Stage names in run order.
  pub fn stage_names(&self) -> Vec<&str> {
    self.stages.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_stage(&self, stage: &str) -> bool {
    self.stages.iter().any(|s| s.name == stage)
  }

  fn position(&self, stage: &str) -> QuireResult<usize> {
    self
      .stages
      .iter()
      .position(|s| s.name == stage)
      .ok_or_else(|| QuireError::StageNotFound {
        stage: stage.to_string(),
      })
  }

  fn stage_mut(&mut self, stage: &str) -> QuireResult<&mut StageDef<T>> {
    let idx = self.position(stage)?;
    Ok(&mut self.stages[idx])
  }

  fn reject_duplicate(&self, stage: &str) -> QuireResult<()> {
    if self.has_stage(stage) {
      return Err(QuireError::Internal(format!(
        "stage '{}' already exists in flow '{}'",
        stage, self.name
      )));
    }
    Ok(())
  }

  /// Panics on an unknown stage name. Handlers are attached while wiring flows at
  /// startup, where a misspelt stage is a programming error.
  pub(crate) fn assert_stage(&self, stage: &str) {
    if !self.has_stage(stage) {
      panic!("quire setup error: stage '{}' is not part of flow '{}'", stage, self.name);
    }
  }

  pub fn insert_stage_before(
    &mut self,
    existing: &str,
    stage: &str,
    optional: bool,
    skip_if: Option<SkipIf<T>>,
  ) -> QuireResult<()> {
    let idx = self.position(existing)?;
    self.reject_duplicate(stage)?;
    self.stages.insert(idx, StageDef::new(stage, optional, skip_if));
    Ok(())
  }

  pub fn insert_stage_after(
    &mut self,
    existing: &str,
    stage: &str,
    optional: bool,
    skip_if: Option<SkipIf<T>>,
  ) -> QuireResult<()> {
    let idx = self.position(existing)?;
    self.reject_duplicate(stage)?;
    self.stages.insert(idx + 1, StageDef::new(stage, optional, skip_if));
    Ok(())
  }

  /// Removes a stage and every handler attached to it.
  pub fn remove_stage(&mut self, stage: &str) -> QuireResult<()> {
    let idx = self.position(stage)?;
    self.stages.remove(idx);
    self.before.remove(stage);
    self.on.remove(stage);
    self.after.remove(stage);
    Ok(())
  }

  pub fn set_optional(&mut self, stage: &str, optional: bool) -> QuireResult<()> {
    self.stage_mut(stage)?.optional = optional;
    Ok(())
  }

  pub fn set_skip_if(&mut self, stage: &str, skip_if: Option<SkipIf<T>>) -> QuireResult<()> {
    self.stage_mut(stage)?.skip_if = skip_if;
    Ok(())
  }
}
