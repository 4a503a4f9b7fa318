//! The audit trail of one saga execution.

use serde::Serialize;
use uuid::Uuid;

use crate::events::SagaEvent;

/// Lifecycle of a saga run.
///
/// ```text
/// NotStarted -> Running -+-> Completed
///                        +-> Compensating -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum SagaState {
    #[default]
    NotStarted,
    Running,
    Compensating,
    Completed,
    Failed,
}

impl SagaState {
    /// Returns the state reached after `event`.
    pub fn after(self, event: &SagaEvent) -> SagaState {
        match event {
            SagaEvent::Started { .. } => SagaState::Running,
            SagaEvent::CompensationStarted { .. } => SagaState::Compensating,
            SagaEvent::Completed { .. } => SagaState::Completed,
            SagaEvent::Failed { .. } => SagaState::Failed,
            _ => self,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Completed | SagaState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::NotStarted => "NotStarted",
            SagaState::Running => "Running",
            SagaState::Compensating => "Compensating",
            SagaState::Completed => "Completed",
            SagaState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that happened during one saga execution, folded from its events.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SagaRun {
    id: Option<Uuid>,
    saga_type: String,
    state: SagaState,
    completed_steps: Vec<String>,
    skipped_steps: Vec<String>,
    compensated_steps: Vec<String>,
    failed_step: Option<String>,
    failure_reason: Option<String>,
    events: Vec<SagaEvent>,
}

impl SagaRun {
    /// Folds an event into the run and keeps it in the trail.
    pub fn apply(&mut self, event: SagaEvent) {
        self.state = self.state.after(&event);
        match &event {
            SagaEvent::Started {
                run_id, saga_type, ..
            } => {
                self.id = Some(*run_id);
                self.saga_type = saga_type.clone();
            }
            SagaEvent::StepCompleted { step, .. } => self.completed_steps.push(step.clone()),
            SagaEvent::StepSkipped { step, .. } => self.skipped_steps.push(step.clone()),
            SagaEvent::StepFailed { step, error, .. } => {
                self.failed_step = Some(step.clone());
                self.failure_reason = Some(error.clone());
            }
            SagaEvent::CompensationStepCompleted { step, .. } => {
                self.compensated_steps.push(step.clone())
            }
            SagaEvent::CompensationStarted { .. }
            | SagaEvent::CompensationStepFailed { .. }
            | SagaEvent::Completed { .. }
            | SagaEvent::Failed { .. } => {}
        }
        self.events.push(event);
    }

    /// Run identifier, assigned when the saga starts.
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    /// Steps that failed under a continue-on-failure policy.
    pub fn skipped_steps(&self) -> &[String] {
        &self.skipped_steps
    }

    /// Steps whose compensation succeeded, in the order they were undone.
    pub fn compensated_steps(&self) -> &[String] {
        &self.compensated_steps
    }

    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn events(&self) -> &[SagaEvent] {
        &self.events
    }

    pub fn has_completed(&self, step: &str) -> bool {
        self.completed_steps.iter().any(|s| s == step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_run() {
        let mut run = SagaRun::default();
        assert_eq!(run.state(), SagaState::NotStarted);

        let id = Uuid::new_v4();
        run.apply(SagaEvent::started(id, "OrderCheckout"));
        assert_eq!(run.state(), SagaState::Running);
        assert_eq!(run.id(), Some(id));

        run.apply(SagaEvent::step_completed("fetch_cart"));
        run.apply(SagaEvent::step_skipped("clear_cart", "cart service down"));
        run.apply(SagaEvent::completed());

        assert_eq!(run.state(), SagaState::Completed);
        assert!(run.state().is_terminal());
        assert!(run.has_completed("fetch_cart"));
        assert_eq!(run.skipped_steps(), ["clear_cart".to_string()]);
        assert_eq!(run.events().len(), 4);
    }

    #[test]
    fn test_failed_run_with_compensation() {
        let mut run = SagaRun::default();
        run.apply(SagaEvent::started(Uuid::new_v4(), "OrderCheckout"));
        run.apply(SagaEvent::step_completed("persist_order"));
        run.apply(SagaEvent::step_failed("commit_stock", "timeout"));
        run.apply(SagaEvent::compensation_started("commit_stock"));
        assert_eq!(run.state(), SagaState::Compensating);

        run.apply(SagaEvent::compensation_step_completed("persist_order"));
        run.apply(SagaEvent::failed("Step failed: commit_stock"));

        assert_eq!(run.state(), SagaState::Failed);
        assert_eq!(run.failed_step(), Some("commit_stock"));
        assert_eq!(run.failure_reason(), Some("timeout"));
        assert_eq!(run.compensated_steps(), ["persist_order".to_string()]);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SagaState::Compensating.to_string(), "Compensating");
        assert!(!SagaState::Running.is_terminal());
    }
}
