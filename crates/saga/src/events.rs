//! Events recorded while a saga runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry in a saga run's trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SagaEvent {
    Started {
        run_id: Uuid,
        saga_type: String,
        at: DateTime<Utc>,
    },

    StepCompleted {
        step: String,
        at: DateTime<Utc>,
    },

    /// A step failed and the saga is about to compensate.
    StepFailed {
        step: String,
        error: String,
        at: DateTime<Utc>,
    },

    /// A step failed but its policy lets the saga continue.
    StepSkipped {
        step: String,
        error: String,
        at: DateTime<Utc>,
    },

    CompensationStarted {
        failed_step: String,
        at: DateTime<Utc>,
    },

    CompensationStepCompleted {
        step: String,
        at: DateTime<Utc>,
    },

    /// Compensation failures are recorded and the chain continues.
    CompensationStepFailed {
        step: String,
        error: String,
        at: DateTime<Utc>,
    },

    Completed {
        at: DateTime<Utc>,
    },

    Failed {
        reason: String,
        at: DateTime<Utc>,
    },
}

impl SagaEvent {
    pub fn started(run_id: Uuid, saga_type: impl Into<String>) -> Self {
        SagaEvent::Started {
            run_id,
            saga_type: saga_type.into(),
            at: Utc::now(),
        }
    }

    pub fn step_completed(step: impl Into<String>) -> Self {
        SagaEvent::StepCompleted {
            step: step.into(),
            at: Utc::now(),
        }
    }

    pub fn step_failed(step: impl Into<String>, error: impl Into<String>) -> Self {
        SagaEvent::StepFailed {
            step: step.into(),
            error: error.into(),
            at: Utc::now(),
        }
    }

    pub fn step_skipped(step: impl Into<String>, error: impl Into<String>) -> Self {
        SagaEvent::StepSkipped {
            step: step.into(),
            error: error.into(),
            at: Utc::now(),
        }
    }

    pub fn compensation_started(failed_step: impl Into<String>) -> Self {
        SagaEvent::CompensationStarted {
            failed_step: failed_step.into(),
            at: Utc::now(),
        }
    }

    pub fn compensation_step_completed(step: impl Into<String>) -> Self {
        SagaEvent::CompensationStepCompleted {
            step: step.into(),
            at: Utc::now(),
        }
    }

    pub fn compensation_step_failed(step: impl Into<String>, error: impl Into<String>) -> Self {
        SagaEvent::CompensationStepFailed {
            step: step.into(),
            error: error.into(),
            at: Utc::now(),
        }
    }

    pub fn completed() -> Self {
        SagaEvent::Completed { at: Utc::now() }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        SagaEvent::Failed {
            reason: reason.into(),
            at: Utc::now(),
        }
    }

    /// Returns the event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::Started { .. } => "Started",
            SagaEvent::StepCompleted { .. } => "StepCompleted",
            SagaEvent::StepFailed { .. } => "StepFailed",
            SagaEvent::StepSkipped { .. } => "StepSkipped",
            SagaEvent::CompensationStarted { .. } => "CompensationStarted",
            SagaEvent::CompensationStepCompleted { .. } => "CompensationStepCompleted",
            SagaEvent::CompensationStepFailed { .. } => "CompensationStepFailed",
            SagaEvent::Completed { .. } => "Completed",
            SagaEvent::Failed { .. } => "Failed",
        }
    }

    /// Returns the step this event is about, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            SagaEvent::StepCompleted { step, .. }
            | SagaEvent::StepFailed { step, .. }
            | SagaEvent::StepSkipped { step, .. }
            | SagaEvent::CompensationStepCompleted { step, .. }
            | SagaEvent::CompensationStepFailed { step, .. } => Some(step),
            SagaEvent::CompensationStarted { failed_step, .. } => Some(failed_step),
            SagaEvent::Started { .. } | SagaEvent::Completed { .. } | SagaEvent::Failed { .. } => {
                None
            }
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            SagaEvent::Started { at, .. }
            | SagaEvent::StepCompleted { at, .. }
            | SagaEvent::StepFailed { at, .. }
            | SagaEvent::StepSkipped { at, .. }
            | SagaEvent::CompensationStarted { at, .. }
            | SagaEvent::CompensationStepCompleted { at, .. }
            | SagaEvent::CompensationStepFailed { at, .. }
            | SagaEvent::Completed { at }
            | SagaEvent::Failed { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_step() {
        let event = SagaEvent::step_failed("commit_stock", "timeout");
        assert_eq!(event.event_type(), "StepFailed");
        assert_eq!(event.step(), Some("commit_stock"));
        assert_eq!(SagaEvent::completed().step(), None);
    }

    #[test]
    fn test_serialization_is_tagged() {
        let event = SagaEvent::step_skipped("clear_cart", "503");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StepSkipped");
        assert_eq!(json["step"], "clear_cart");

        let back: SagaEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
