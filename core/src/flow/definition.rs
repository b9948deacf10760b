// core/src/flow/definition.rs

use super::{FlowControl, FlowError, Handler, Shared, SkipIf, StepDef};
use std::collections::HashMap;
use std::future::Future;

/// An ordered set of named steps over shared state `T`, whose handlers fail with `E`.
pub struct Flow<T, E>
where
  T: Send + Sync + 'static,
  E: From<FlowError> + std::fmt::Display + Send + 'static,
{
  pub(crate) name: &'static str,
  pub(crate) steps: Vec<StepDef<T>>,
  pub(crate) before: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) on: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) after: HashMap<String, Vec<Handler<T, E>>>,
}

#[derive(Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl<T, E> Flow<T, E>
where
  T: Send + Sync + 'static,
  E: From<FlowError> + std::fmt::Display + Send + 'static,
{
  /// Creates a flow from `(name, optional, skip_if)` step definitions.
  pub fn new(name: &'static str, step_defs: &[(&str, bool, Option<SkipIf<T>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step, optional, skip_if)| StepDef {
        name: (*step).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name,
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn before<F, UserErr>(
    &mut self,
    step: &str,
    handler: impl Fn(Shared<T>) -> F + Send + Sync + 'static,
  ) -> Result<&mut Self, FlowError>
  where
    F: Future<Output = Result<FlowControl, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + 'static,
  {
    self.register(Phase::Before, step, handler)
  }

  pub fn on<F, UserErr>(
    &mut self,
    step: &str,
    handler: impl Fn(Shared<T>) -> F + Send + Sync + 'static,
  ) -> Result<&mut Self, FlowError>
  where
    F: Future<Output = Result<FlowControl, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + 'static,
  {
    self.register(Phase::On, step, handler)
  }

  pub fn after<F, UserErr>(
    &mut self,
    step: &str,
    handler: impl Fn(Shared<T>) -> F + Send + Sync + 'static,
  ) -> Result<&mut Self, FlowError>
  where
    F: Future<Output = Result<FlowControl, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + 'static,
  {
    self.register(Phase::After, step, handler)
  }

  fn register<F, UserErr>(
    &mut self,
    phase: Phase,
    step: &str,
    handler: impl Fn(Shared<T>) -> F + Send + Sync + 'static,
  ) -> Result<&mut Self, FlowError>
  where
    F: Future<Output = Result<FlowControl, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + 'static,
  {
    if !self.steps.iter().any(|s| s.name == step) {
      return Err(FlowError::UnknownStep { step: step.to_string() });
    }
    let boxed: Handler<T, E> = Box::new(move |state| {
      let fut = handler(state);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    let table = match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    };
    table.entry(step.to_string()).or_default().push(boxed);
    Ok(self)
  }
}
