// tests/flow_tests.rs
mod common;

use common::setup_tracing;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use tuckshop::flow::skip_if;
use tuckshop::{Flow, FlowControl, FlowError, FlowOutcome, Shared, TuckshopError};

#[derive(Clone, Debug, Default)]
struct Trail {
  steps: Vec<String>,
  skip_b: bool,
}

fn record(step: &'static str) -> impl Fn(Shared<Trail>) -> std::future::Ready<Result<FlowControl, TuckshopError>> {
  move |ctx: Shared<Trail>| {
    ctx.write().steps.push(step.to_string());
    std::future::ready(Ok(FlowControl::Continue))
  }
}

#[tokio::test]
async fn runs_before_on_after_in_step_order() {
  setup_tracing();
  let mut flow = Flow::<Trail, TuckshopError>::new("t", &[("a", false, None), ("b", false, None)]);
  flow.after("a", record("a.after")).unwrap();
  flow.on("a", record("a.on")).unwrap();
  flow.before("a", record("a.before")).unwrap();
  flow.on("b", record("b.on")).unwrap();

  let ctx = Shared::new(Trail::default());
  assert_eq!(flow.run(ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(ctx.read().steps, vec!["a.before", "a.on", "a.after", "b.on"]);
}

#[tokio::test]
async fn stop_halts_remaining_steps() {
  setup_tracing();
  let mut flow = Flow::<Trail, TuckshopError>::new("t", &[("a", false, None), ("b", false, None)]);
  flow
    .on("a", |ctx: Shared<Trail>| async move {
      ctx.write().steps.push("a".into());
      Ok::<_, TuckshopError>(FlowControl::Stop)
    })
    .unwrap();
  flow.on("b", record("b")).unwrap();

  let ctx = Shared::new(Trail::default());
  assert_eq!(flow.run(ctx.clone()).await.unwrap(), FlowOutcome::Stopped);
  assert_eq!(ctx.read().steps, vec!["a"]);
}

#[tokio::test]
async fn skip_condition_reads_state() {
  setup_tracing();
  let mut flow = Flow::<Trail, TuckshopError>::new(
    "t",
    &[("a", false, None), ("b", false, skip_if(|t: &Trail| t.skip_b)), ("c", false, None)],
  );
  flow.on("a", record("a")).unwrap();
  flow.on("b", record("b")).unwrap();
  flow.on("c", record("c")).unwrap();

  let ctx = Shared::new(Trail {
    skip_b: true,
    ..Trail::default()
  });
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().steps, vec!["a", "c"]);
}

#[tokio::test]
async fn optional_step_failure_is_tolerated() {
  setup_tracing();
  let mut flow = Flow::<Trail, TuckshopError>::new("t", &[("a", true, None), ("b", false, None)]);
  flow
    .on("a", |_ctx: Shared<Trail>| async move {
      Err::<FlowControl, _>(TuckshopError::Unavailable("flaky".into()))
    })
    .unwrap();
  flow.on("b", record("b")).unwrap();

  let ctx = Shared::new(Trail::default());
  assert_eq!(flow.run(ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(ctx.read().steps, vec!["b"]);
}

#[tokio::test]
async fn required_step_failure_aborts() {
  setup_tracing();
  let mut flow = Flow::<Trail, TuckshopError>::new("t", &[("a", false, None), ("b", false, None)]);
  flow
    .on("a", |_ctx: Shared<Trail>| async move { Err::<FlowControl, _>(TuckshopError::field("x", "bad")) })
    .unwrap();
  flow.on("b", record("b")).unwrap();

  let ctx = Shared::new(Trail::default());
  assert!(matches!(flow.run(ctx.clone()).await, Err(TuckshopError::Validation(_))));
  assert!(ctx.read().steps.is_empty());
}

#[tokio::test]
async fn missing_and_unknown_steps_are_errors() {
  setup_tracing();
  let mut flow = Flow::<Trail, TuckshopError>::new("t", &[("a", false, None), ("maybe", true, None)]);
  assert!(matches!(
    flow.on("nope", record("nope")),
    Err(FlowError::UnknownStep { .. })
  ));
  let result = flow.run(Shared::new(Trail::default())).await;
  assert!(matches!(
    result,
    Err(TuckshopError::Flow(FlowError::MissingHandler { ref step })) if step == "a"
  ));
}

static RUNS: AtomicUsize = AtomicUsize::new(0);

fn counted_flow() -> Flow<Trail, TuckshopError> {
  let mut flow = Flow::<Trail, TuckshopError>::new("counted", &[("count", false, None)]);
  flow
    .on("count", |_ctx: Shared<Trail>| async move {
      RUNS.fetch_add(1, Ordering::SeqCst);
      Ok::<_, TuckshopError>(FlowControl::Continue)
    })
    .unwrap();
  flow
}

#[tokio::test]
#[serial]
async fn one_flow_serves_many_runs() {
  setup_tracing();
  RUNS.store(0, Ordering::SeqCst);
  let flow = counted_flow();
  for _ in 0..3 {
    flow.run(Shared::new(Trail::default())).await.unwrap();
  }
  assert_eq!(RUNS.load(Ordering::SeqCst), 3);
}

#[tokio::test]
#[serial]
async fn concurrent_runs_keep_separate_state() {
  setup_tracing();
  RUNS.store(0, Ordering::SeqCst);
  let flow = std::sync::Arc::new(counted_flow());
  let handles: Vec<_> = (0..4)
    .map(|_| {
      let flow = flow.clone();
      tokio::spawn(async move { flow.run(Shared::new(Trail::default())).await })
    })
    .collect();
  for handle in handles {
    assert_eq!(handle.await.unwrap().unwrap(), FlowOutcome::Completed);
  }
  assert_eq!(RUNS.load(Ordering::SeqCst), 4);
}
