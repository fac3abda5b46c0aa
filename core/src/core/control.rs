// core/src/core/control.rs

//! Signals that steer a running flow and the outcome of a finished run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageControl {
  /// Keep going: remaining handlers of this stage, then the next stage.
  Continue,
  /// Stop the whole flow right here. Nothing after this handler runs.
  Halt,
}

/// Outcome of `Flow::run` when no handler failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every stage ran (or was skipped by its `skip_if`).
  Completed,
  /// A handler returned `StageControl::Halt` while running `stage`.
  Halted { stage: String },
}

impl FlowOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, FlowOutcome::Completed)
  }
}
