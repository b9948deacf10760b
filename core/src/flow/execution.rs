// core/src/flow/execution.rs

use super::{Flow, FlowControl, FlowError, FlowOutcome, Handler, Shared};
use tracing::{event, instrument, Level};

enum PhaseResult<E> {
  Continue,
  Stopped,
  Failed(E),
}

impl<T, E> Flow<T, E>
where
  T: Send + Sync + 'static,
  E: From<FlowError> + std::fmt::Display + Send + 'static,
{
  /// Runs every step in order against `state`.
  ///
  /// A failing handler aborts the flow with its error, except in optional
  /// steps where the failure is logged and the flow moves on.
  #[instrument(name = "Flow::run", skip_all, fields(flow = self.name, num_steps = self.steps.len()))]
  pub async fn run(&self, state: Shared<T>) -> Result<FlowOutcome, E> {
    for step in &self.steps {
      let name = step.name.as_str();

      if let Some(skip) = &step.skip_if {
        let skipped = {
          let guard = state.read();
          skip(&*guard)
        };
        if skipped {
          event!(Level::DEBUG, step = name, "Step skipped.");
          continue;
        }
      }

      let phases = [self.before.get(name), self.on.get(name), self.after.get(name)];
      let has_handlers = phases.iter().any(|p| p.map_or(false, |h| !h.is_empty()));
      if !has_handlers {
        if step.optional {
          event!(Level::DEBUG, step = name, "Optional step has no handlers.");
          continue;
        }
        event!(Level::ERROR, step = name, "Required step has no handlers.");
        return Err(E::from(FlowError::MissingHandler { step: step.name.clone() }));
      }

      for handlers in phases.into_iter().flatten() {
        match run_phase(handlers, &state).await {
          PhaseResult::Continue => {}
          PhaseResult::Stopped => {
            event!(Level::INFO, step = name, "Flow stopped by handler.");
            return Ok(FlowOutcome::Stopped);
          }
          PhaseResult::Failed(err) if step.optional => {
            event!(Level::WARN, step = name, error = %err, "Optional step failed, continuing.");
            break;
          }
          PhaseResult::Failed(err) => {
            event!(Level::ERROR, step = name, error = %err, "Step failed.");
            return Err(err);
          }
        }
      }
    }

    event!(Level::DEBUG, "Flow completed.");
    Ok(FlowOutcome::Completed)
  }
}

async fn run_phase<T, E>(handlers: &[Handler<T, E>], state: &Shared<T>) -> PhaseResult<E>
where
  T: Send + Sync + 'static,
{
  for handler in handlers {
    match handler(state.clone()).await {
      Ok(FlowControl::Continue) => {}
      Ok(FlowControl::Stop) => return PhaseResult::Stopped,
      Err(err) => return PhaseResult::Failed(err),
    }
  }
  PhaseResult::Continue
}
