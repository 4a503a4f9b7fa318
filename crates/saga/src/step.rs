//! Generic step runner with reverse-order compensation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SagaError;
use crate::events::SagaEvent;
use crate::run::SagaRun;

/// What the runner does when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnFailure {
    /// Stop and undo every completed step in reverse order.
    #[default]
    Compensate,
    /// Record the failure and move on to the next step.
    Continue,
}

/// One unit of work in a saga, operating on a shared context `C`.
#[async_trait]
pub trait SagaStep<C: Send>: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_failure(&self) -> OnFailure {
        OnFailure::Compensate
    }

    async fn execute(&self, ctx: &mut C) -> Result<(), SagaError>;

    /// Undoes the effect of a completed `execute`. `cause` is the error of the
    /// step that triggered compensation.
    async fn compensate(&self, _ctx: &mut C, _cause: &SagaError) -> Result<(), SagaError> {
        Ok(())
    }
}

/// Result of running a saga: the trail plus the error of the failing step.
#[derive(Debug)]
pub struct SagaOutcome {
    pub run: SagaRun,
    pub error: Option<SagaError>,
}

impl SagaOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// An ordered list of steps executed against one context.
pub struct Saga<'a, C> {
    saga_type: &'static str,
    steps: Vec<Box<dyn SagaStep<C> + 'a>>,
}

impl<'a, C: Send> Saga<'a, C> {
    pub fn new(saga_type: &'static str) -> Self {
        Self {
            saga_type,
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    pub fn step(mut self, step: impl SagaStep<C> + 'a) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in order.
    ///
    /// On a failing `Compensate` step, completed steps are compensated in
    /// reverse order. A failing compensation is logged and the remaining
    /// compensations still run.
    pub async fn run(&self, ctx: &mut C) -> SagaOutcome {
        let mut run = SagaRun::default();
        let run_id = Uuid::new_v4();
        run.apply(SagaEvent::started(run_id, self.saga_type));
        tracing::debug!(%run_id, saga_type = self.saga_type, "saga started");

        let mut completed: Vec<&(dyn SagaStep<C> + 'a)> = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            match step.execute(ctx).await {
                Ok(()) => {
                    tracing::debug!(%run_id, step = step.name(), "saga step completed");
                    run.apply(SagaEvent::step_completed(step.name()));
                    completed.push(&**step);
                }
                Err(err) if step.on_failure() == OnFailure::Continue => {
                    tracing::warn!(
                        %run_id,
                        step = step.name(),
                        error = %err,
                        "saga step failed, continuing"
                    );
                    run.apply(SagaEvent::step_skipped(step.name(), err.to_string()));
                }
                Err(err) => {
                    tracing::warn!(%run_id, step = step.name(), error = %err, "saga step failed");
                    run.apply(SagaEvent::step_failed(step.name(), err.to_string()));

                    if !completed.is_empty() {
                        run.apply(SagaEvent::compensation_started(step.name()));
                        for done in completed.iter().rev() {
                            match done.compensate(ctx, &err).await {
                                Ok(()) => {
                                    run.apply(SagaEvent::compensation_step_completed(done.name()))
                                }
                                Err(comp_err) => {
                                    tracing::error!(
                                        %run_id,
                                        step = done.name(),
                                        error = %comp_err,
                                        "compensation failed"
                                    );
                                    run.apply(SagaEvent::compensation_step_failed(
                                        done.name(),
                                        comp_err.to_string(),
                                    ));
                                }
                            }
                        }
                    }

                    run.apply(SagaEvent::failed(format!("Step failed: {}", step.name())));
                    return SagaOutcome {
                        run,
                        error: Some(err),
                    };
                }
            }
        }

        run.apply(SagaEvent::completed());
        tracing::debug!(%run_id, "saga completed");
        SagaOutcome { run, error: None }
    }
}
