//! Order status state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The fulfilment status of an order.
///
/// State transitions:
/// ```text
/// PendingPayment ──┬──► AwaitingPaymentConfirmation ──► Paid
///                  ├──► Paid ──► Processing ──► Shipped ──► Delivered
///                  ├──► Cancelled                              │
///                  └──► Failed ──► PendingPayment | Cancelled  │
/// Paid | Processing | Shipped | Delivered ──► RefundPending ◄──┘
/// RefundPending ──► Refunded | Failed
/// ```
///
/// The authoritative edges are in [`TRANSITIONS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order persisted, awaiting payment.
    #[default]
    PendingPayment,

    /// Payment initiated, waiting for gateway confirmation.
    AwaitingPaymentConfirmation,

    Paid,

    /// Being prepared for shipment.
    Processing,

    Shipped,

    Delivered,

    /// Terminal.
    Cancelled,

    RefundPending,

    /// Terminal.
    Refunded,

    /// Creation or payment failed; needs reconciliation.
    Failed,
}

/// Allowed transitions, keyed by source status.
pub const TRANSITIONS: &[(OrderStatus, &[OrderStatus])] = &[
    (
        OrderStatus::PendingPayment,
        &[
            OrderStatus::AwaitingPaymentConfirmation,
            OrderStatus::Paid,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
        ],
    ),
    (
        OrderStatus::AwaitingPaymentConfirmation,
        &[
            OrderStatus::Paid,
            OrderStatus::Failed,
            OrderStatus::Cancelled,
        ],
    ),
    (
        OrderStatus::Paid,
        &[
            OrderStatus::Processing,
            OrderStatus::RefundPending,
            OrderStatus::Cancelled,
        ],
    ),
    (
        OrderStatus::Processing,
        &[
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
            OrderStatus::RefundPending,
        ],
    ),
    (
        OrderStatus::Shipped,
        &[OrderStatus::Delivered, OrderStatus::RefundPending],
    ),
    (OrderStatus::Delivered, &[OrderStatus::RefundPending]),
    (OrderStatus::Cancelled, &[]),
    (
        OrderStatus::RefundPending,
        &[OrderStatus::Refunded, OrderStatus::Failed],
    ),
    (OrderStatus::Refunded, &[]),
    (
        OrderStatus::Failed,
        &[OrderStatus::Cancelled, OrderStatus::PendingPayment],
    ),
];

impl OrderStatus {
    /// Every status, in declaration order.
    pub const ALL: [OrderStatus; 10] = [
        OrderStatus::PendingPayment,
        OrderStatus::AwaitingPaymentConfirmation,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::RefundPending,
        OrderStatus::Refunded,
        OrderStatus::Failed,
    ];

    /// Returns the statuses reachable from this one in a single transition.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| from == self)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    /// Returns true if the table contains the edge `self -> target`.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Returns true if no transition leaves this status.
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "PendingPayment",
            OrderStatus::AwaitingPaymentConfirmation => "AwaitingPaymentConfirmation",
            OrderStatus::Paid => "Paid",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::RefundPending => "RefundPending",
            OrderStatus::Refunded => "Refunded",
            OrderStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    /// Case-insensitive; accepts `PendingPayment`, `pending_payment` and
    /// `PENDING_PAYMENT` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        OrderStatus::ALL
            .into_iter()
            .find(|status| normalize(status.as_str()) == wanted)
            .ok_or_else(|| OrderError::InvalidStatus {
                value: s.to_string(),
            })
    }
}

/// Payment progress, tracked independently of [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    RefundPending,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 6] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::RefundPending,
        PaymentStatus::Refunded,
        PaymentStatus::PartiallyRefunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::RefundPending => "RefundPending",
            PaymentStatus::Refunded => "Refunded",
            PaymentStatus::PartiallyRefunded => "PartiallyRefunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        PaymentStatus::ALL
            .into_iter()
            .find(|status| normalize(status.as_str()) == wanted)
            .ok_or_else(|| OrderError::InvalidStatus {
                value: s.to_string(),
            })
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending_payment() {
        assert_eq!(OrderStatus::default(), OrderStatus::PendingPayment);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }

    #[test]
    fn test_table_covers_every_status_once() {
        for status in OrderStatus::ALL {
            let rows = TRANSITIONS.iter().filter(|(from, _)| *from == status).count();
            assert_eq!(rows, 1, "{status} must have exactly one row");
        }
    }

    #[test]
    fn test_pending_payment_transitions() {
        let s = OrderStatus::PendingPayment;
        assert!(s.can_transition_to(OrderStatus::AwaitingPaymentConfirmation));
        assert!(s.can_transition_to(OrderStatus::Paid));
        assert!(s.can_transition_to(OrderStatus::Cancelled));
        assert!(s.can_transition_to(OrderStatus::Failed));
        assert!(!s.can_transition_to(OrderStatus::Shipped));
        assert!(!s.can_transition_to(OrderStatus::Processing));
    }

    #[test]
    fn test_paid_must_pass_through_processing() {
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_failed_can_be_reopened_or_cancelled() {
        assert!(OrderStatus::Failed.can_transition_to(OrderStatus::PendingPayment));
        assert!(OrderStatus::Failed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Failed.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_terminal)
            .collect();
        assert_eq!(terminal, vec![OrderStatus::Cancelled, OrderStatus::Refunded]);

        for target in OrderStatus::ALL {
            assert!(!OrderStatus::Cancelled.can_transition_to(target));
            assert!(!OrderStatus::Refunded.can_transition_to(target));
        }
    }

    #[test]
    fn test_no_self_loops_in_table() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!(
            "PENDING_PAYMENT".parse::<OrderStatus>().unwrap(),
            OrderStatus::PendingPayment
        );
        assert_eq!(
            "refund_pending".parse::<OrderStatus>().unwrap(),
            OrderStatus::RefundPending
        );
        assert_eq!(
            " AwaitingPaymentConfirmation ".parse::<OrderStatus>().unwrap(),
            OrderStatus::AwaitingPaymentConfirmation
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "Teleported".parse::<OrderStatus>().unwrap_err();
        assert!(matches!(err, OrderError::InvalidStatus { ref value } if value == "Teleported"));
        assert!("".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        for status in PaymentStatus::ALL {
            assert_eq!(status.to_string().parse::<PaymentStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&OrderStatus::RefundPending).unwrap();
        assert_eq!(json, "\"RefundPending\"");
        let status: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, OrderStatus::RefundPending);
    }
}
