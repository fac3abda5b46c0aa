// core/tests/flow_execution_tests.rs
mod common;

use common::*;
use quire::{Flow, FlowOutcome, QuireError, Shared, SkipIf, StageControl};
use std::sync::Arc;

#[tokio::test]
async fn stages_run_in_declared_order() {
  setup_tracing();
  let mut flow = Flow::<Ledger, TestError>::new("ordered", &[("a", false, None), ("b", false, None), ("c", false, None)]);
  flow.on("a", recording_handler("a", 1));
  flow.on("b", recording_handler("b", 10));
  flow.on("c", recording_handler("c", 100));

  let ctx = Shared::new(Ledger::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, FlowOutcome::Completed);
  let guard = ctx.read();
  assert_eq!(guard.total, 111);
  assert_eq!(guard.visited, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn phases_run_before_on_after() {
  setup_tracing();
  let mut flow = Flow::<Ledger, TestError>::new("phases", &[("only", false, None)]);
  // Registered out of order on purpose.
  flow.after("only", recording_handler("after", 0));
  flow.on("only", recording_handler("on", 0));
  flow.before("only", recording_handler("before", 0));

  let ctx = Shared::new(Ledger::default());
  flow.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().visited, vec!["before", "on", "after"]);
}

#[tokio::test]
async fn halt_reports_the_stage_and_skips_the_rest() {
  setup_tracing();
  let mut flow = Flow::<Ledger, TestError>::new("halting", &[("a", false, None), ("b", false, None), ("c", false, None)]);
  flow.on("a", recording_handler("a", 1));
  flow.on("b", recording_handler("b", 2));
  flow.after("b", recording_handler("b_after", 4));
  flow.on("c", recording_handler("c", 8));

  let ctx = Shared::new(Ledger {
    halt_at: Some("b".to_string()),
    ..Default::default()
  });
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, FlowOutcome::Halted { stage: "b".to_string() });
  assert!(!outcome.is_completed());
  let guard = ctx.read();
  assert_eq!(guard.total, 3);
  assert_eq!(guard.visited, vec!["a", "b"]);
}

#[tokio::test]
async fn handler_error_is_returned_unchanged() {
  setup_tracing();
  let mut flow = Flow::<Ledger, TestError>::new("failing", &[("ok", false, None), ("bad", false, None), ("never", false, None)]);
  flow.on("ok", recording_handler("ok", 1));
  flow.on("bad", failing_handler("bad", "boom"));
  flow.on("never", recording_handler("never", 100));

  let ctx = Shared::new(Ledger::default());
  let err = flow.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TestError::Stage("boom".to_string()));
  assert_eq!(ctx.read().visited, vec!["ok", "bad"]);
  assert_eq!(ctx.read().total, 1);
}

#[tokio::test]
async fn skip_if_is_evaluated_against_current_state() {
  setup_tracing();
  let already_counted: SkipIf<Ledger> = Arc::new(|ctx: Shared<Ledger>| ctx.read().total > 0);
  let mut flow = Flow::<Ledger, TestError>::new(
    "skipping",
    &[("a", false, None), ("only_when_empty", false, Some(already_counted)), ("c", false, None)],
  );
  flow.on("a", recording_handler("a", 5));
  flow.on("only_when_empty", recording_handler("only_when_empty", 1000));
  flow.on("c", recording_handler("c", 5));

  let ctx = Shared::new(Ledger::default());
  flow.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().visited, vec!["a", "c"]);
  assert_eq!(ctx.read().total, 10);
}

#[tokio::test]
async fn required_stage_without_handlers_fails() {
  setup_tracing();
  let flow = Flow::<Ledger, TestError>::new("empty", &[("lonely", false, None)]);

  let err = flow.run(Shared::new(Ledger::default())).await.unwrap_err();
  match err {
    TestError::Engine(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("lonely"));
    }
    other => panic!("expected engine error, got {:?}", other),
  }
}

#[tokio::test]
async fn optional_stage_without_handlers_is_skipped() {
  setup_tracing();
  let mut flow = Flow::<Ledger, TestError>::new("optional", &[("maybe", true, None), ("always", false, None)]);
  flow.on("always", recording_handler("always", 1));

  let ctx = Shared::new(Ledger::default());
  assert_eq!(flow.run(ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(ctx.read().visited, vec!["always"]);
}

#[tokio::test]
async fn stages_can_be_inserted_and_removed() {
  setup_tracing();
  let mut flow = Flow::<Ledger, TestError>::new("reshaped", &[("a", false, None), ("c", false, None)]);
  flow.insert_stage_after("a", "b", false, None).unwrap();
  flow.insert_stage_before("a", "start", true, None).unwrap();
  assert_eq!(flow.stage_names(), vec!["start", "a", "b", "c"]);

  flow.on("a", recording_handler("a", 1));
  flow.on("b", recording_handler("b", 1));
  flow.on("c", recording_handler("c", 1));
  flow.remove_stage("b").unwrap();
  assert_eq!(flow.handler_count("b"), 0);

  let ctx = Shared::new(Ledger::default());
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().visited, vec!["a", "c"]);
}

#[tokio::test]
async fn reshaping_unknown_stages_is_an_error() {
  let mut flow = Flow::<Ledger, TestError>::new("strict", &[("a", false, None)]);

  assert!(matches!(
    flow.insert_stage_after("missing", "x", false, None),
    Err(QuireError::StageNotFound { .. })
  ));
  assert!(matches!(flow.remove_stage("missing"), Err(QuireError::StageNotFound { .. })));
  assert!(matches!(flow.set_optional("missing", true), Err(QuireError::StageNotFound { .. })));
  assert!(flow.insert_stage_after("a", "a", false, None).is_err());
}

#[tokio::test]
async fn set_optional_and_set_skip_if_change_behaviour() {
  setup_tracing();
  let mut flow = Flow::<Ledger, TestError>::new("tuned", &[("bare", false, None), ("work", false, None)]);
  flow.on("work", recording_handler("work", 1));
  flow.set_optional("bare", true).unwrap();

  let ctx = Shared::new(Ledger::default());
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().visited, vec!["work"]);

  let always: SkipIf<Ledger> = Arc::new(|_ctx: Shared<Ledger>| true);
  flow.set_skip_if("work", Some(always)).unwrap();
  let ctx = Shared::new(Ledger::default());
  flow.run(ctx.clone()).await.unwrap();
  assert!(ctx.read().visited.is_empty());
}

#[tokio::test]
#[should_panic(expected = "not part of flow")]
async fn attaching_to_unknown_stage_panics() {
  let mut flow = Flow::<Ledger, TestError>::new("typo", &[("real", false, None)]);
  flow.on("reel", recording_handler("reel", 0));
}

#[tokio::test]
async fn handlers_may_use_a_narrower_error_type() {
  setup_tracing();
  let mut flow = Flow::<Ledger, TestError>::new("narrow", &[("a", false, None)]);
  flow.on("a", |_ctx: Shared<Ledger>| async move {
    Err::<StageControl, QuireError>(QuireError::Internal("narrow failure".to_string()))
  });

  let err = flow.run(Shared::new(Ledger::default())).await.unwrap_err();
  assert!(matches!(err, TestError::Engine(ref s) if s.contains("narrow failure")));
}
