//! Append-only audit trail of status changes and notes.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// Actor recorded for changes made by the service itself.
pub const SYSTEM_ACTOR: &str = "system";

/// Prefix applied to free-text notes added by an administrator.
pub const ADMIN_NOTE_PREFIX: &str = "Admin Note: ";

/// One audit record. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusLog {
    /// Assigned by the repository on first save.
    pub id: Option<i64>,

    /// Nullable in storage; always set for entries written by this service.
    pub previous_status: Option<OrderStatus>,

    pub new_status: OrderStatus,

    pub changed_at: DateTime<Utc>,

    /// Admin username or [`SYSTEM_ACTOR`].
    pub changed_by: String,

    pub notes: Option<String>,
}

impl OrderStatusLog {
    /// Records a status change.
    pub fn transition(
        previous: OrderStatus,
        new: OrderStatus,
        actor: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            previous_status: Some(previous),
            new_status: new,
            changed_at: now(),
            changed_by: actor.into(),
            notes: Some(note.into()),
        }
    }

    /// Records a note against the current status.
    pub fn note(current: OrderStatus, actor: impl Into<String>, text: &str) -> Self {
        Self::transition(current, current, actor, format!("{ADMIN_NOTE_PREFIX}{text}"))
    }

    /// Returns true if this entry changed the status.
    pub fn is_status_change(&self) -> bool {
        self.previous_status != Some(self.new_status)
    }
}

/// Current time at the microsecond precision kept by storage.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Default note for a status change made by `actor`.
pub fn default_transition_note(actor: &str) -> String {
    format!("Status changed by {actor}")
}
