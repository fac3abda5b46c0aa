// core/src/flow/execution.rs

//! `Flow::run`: walks the stages in order and drives each stage's handlers.

use crate::core::control::{FlowOutcome, StageControl};
use crate::core::handler::Phase;
use crate::core::shared::Shared;
use crate::error::QuireError;
use crate::flow::definition::Flow;
use tracing::{event, instrument, Instrument, Level};

impl<T, Err> Flow<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<QuireError> + Send + Sync + 'static,
{
  /// Runs every stage against `ctx`.
  ///
  /// Per stage: `skip_if` is checked first, then `before`, `on` and `after` handlers
  /// run in registration order. The first handler error aborts the run and is returned
  /// unchanged; the first `StageControl::Halt` ends it with `FlowOutcome::Halted`.
  /// A required stage with no handlers at all is a `QuireError::HandlerMissing`.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(flow = %self.name, stages = self.stages.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: Shared<T>) -> Result<FlowOutcome, Err> {
    event!(Level::DEBUG, "Flow starting.");

    for (index, stage) in self.stages.iter().enumerate() {
      let stage_span = tracing::info_span!("flow_stage", stage = %stage.name, index);

      if stage.should_skip(&ctx) {
        event!(parent: &stage_span, Level::DEBUG, "Stage skipped by its skip_if predicate.");
        continue;
      }

      if self.handler_count(&stage.name) == 0 {
        if stage.optional {
          event!(parent: &stage_span, Level::DEBUG, "Optional stage has no handlers, skipping.");
          continue;
        }
        event!(parent: &stage_span, Level::ERROR, "Required stage has no handlers.");
        return Err(Err::from(QuireError::HandlerMissing {
          stage: stage.name.clone(),
        }));
      }

      let control = self.run_stage(&stage.name, &ctx).instrument(stage_span).await?;
      if control == StageControl::Halt {
        return Ok(FlowOutcome::Halted {
          stage: stage.name.clone(),
        });
      }
    }

    event!(Level::DEBUG, "Flow completed.");
    Ok(FlowOutcome::Completed)
  }

  async fn run_stage(&self, stage: &str, ctx: &Shared<T>) -> Result<StageControl, Err> {
    for phase in Phase::ALL {
      for (handler_index, handler) in self.handlers(phase, stage).iter().enumerate() {
        match handler(ctx.clone()).await {
          Ok(StageControl::Continue) => {}
          Ok(StageControl::Halt) => {
            event!(Level::INFO, phase = phase.as_str(), handler_index, "Flow halted by handler.");
            return Ok(StageControl::Halt);
          }
          Err(e) => {
            event!(Level::WARN, phase = phase.as_str(), handler_index, error = %e, "Stage handler failed.");
            return Err(e);
          }
        }
      }
    }
    event!(Level::DEBUG, "Stage finished.");
    Ok(StageControl::Continue)
  }
}
