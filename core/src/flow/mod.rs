// core/src/flow/mod.rs

//! A small step-flow engine: an ordered list of named steps, each with
//! `before` / `on` / `after` handlers, optional steps, skip conditions and
//! continue/stop control. Checkout, sign-in and registration run as flows.

mod definition;
mod execution;
mod shared;

pub use definition::Flow;
pub use shared::Shared;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Signal returned by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
  Continue,
  /// Halt the flow; no further handlers run.
  Stop,
}

/// How a flow run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  Completed,
  Stopped,
}

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step '{step}' has no handlers and is not optional")]
  MissingHandler { step: String },

  #[error("Step '{step}' is not part of this flow")]
  UnknownStep { step: String },
}

pub type HandlerFuture<E> = Pin<Box<dyn Future<Output = Result<FlowControl, E>> + Send>>;

/// A boxed step handler operating on the flow's shared state.
pub type Handler<T, E> = Box<dyn Fn(Shared<T>) -> HandlerFuture<E> + Send + Sync>;

/// Evaluated before a step runs; `true` skips the step.
pub type SkipIf<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A named step in a flow.
#[derive(Clone)]
pub struct StepDef<T: Send + Sync + 'static> {
  pub name: String,
  pub optional: bool,
  pub skip_if: Option<SkipIf<T>>,
}

impl<T: Send + Sync + 'static> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}

/// Convenience for building a skip condition from a closure.
pub fn skip_if<T, F>(f: F) -> Option<SkipIf<T>>
where
  T: Send + Sync + 'static,
  F: Fn(&T) -> bool + Send + Sync + 'static,
{
  Some(Arc::new(f))
}
