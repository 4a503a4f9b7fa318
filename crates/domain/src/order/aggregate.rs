//! Order aggregate root.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{
    Address, CheckoutDetails, Money, OrderError, OrderItem, OrderStatus, OrderStatusLog,
    PaymentStatus, default_transition_note, status_log::now,
};

/// Result of asking the order to move to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status changed and a log entry was appended.
    Changed,
    /// Target equals the current status; nothing happened.
    Unchanged,
}

/// A placed order together with its items and audit trail.
///
/// Status changes go through [`Order::transition`], which enforces the
/// transition table and appends exactly one [`OrderStatusLog`] per change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: Option<OrderId>,
    #[serde(default)]
    version: i64,
    user_id: UserId,
    customer_email: String,
    customer_name: String,
    total_amount: Money,
    status: OrderStatus,
    payment_status: PaymentStatus,
    shipping_address: Address,
    billing_address: Address,
    payment_method: String,
    shipping_method: Option<String>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    items: Vec<OrderItem>,
    status_logs: Vec<OrderStatusLog>,
}

/// Every stored field of an [`Order`], used by repositories to persist and
/// rebuild the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderParts {
    pub id: Option<OrderId>,
    /// Stored version this order was loaded at; `0` before the first save.
    pub version: i64,
    pub user_id: UserId,
    pub customer_email: String,
    pub customer_name: String,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: String,
    pub shipping_method: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub status_logs: Vec<OrderStatusLog>,
}

impl From<OrderParts> for Order {
    fn from(p: OrderParts) -> Self {
        Self {
            id: p.id,
            version: p.version,
            user_id: p.user_id,
            customer_email: p.customer_email,
            customer_name: p.customer_name,
            total_amount: p.total_amount,
            status: p.status,
            payment_status: p.payment_status,
            shipping_address: p.shipping_address,
            billing_address: p.billing_address,
            payment_method: p.payment_method,
            shipping_method: p.shipping_method,
            tracking_number: p.tracking_number,
            created_at: p.created_at,
            updated_at: p.updated_at,
            items: p.items,
            status_logs: p.status_logs,
        }
    }
}

// Construction
impl Order {
    /// Builds a new, unsaved order in `PendingPayment` / payment `Pending`.
    ///
    /// Unit prices are rounded to currency precision, then the total is
    /// computed once from the items and never recomputed.
    pub fn place(
        user_id: UserId,
        details: &CheckoutDetails,
        mut items: Vec<OrderItem>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                variant_id: item.variant_id,
                quantity: 0,
            });
        }

        for item in &mut items {
            item.unit_price = item.unit_price.rounded();
        }
        let total_amount: Money = items.iter().map(OrderItem::line_total).sum();
        let now = now();

        Ok(Self {
            id: None,
            version: 0,
            user_id,
            customer_email: details.customer_email.trim().to_string(),
            customer_name: details.customer_name.trim().to_string(),
            total_amount,
            status: OrderStatus::PendingPayment,
            payment_status: PaymentStatus::Pending,
            shipping_address: details.shipping_address.clone(),
            billing_address: details.effective_billing_address(),
            payment_method: details.payment_method.trim().to_string(),
            shipping_method: details.effective_shipping_method(),
            tracking_number: None,
            created_at: now,
            updated_at: now,
            items,
            status_logs: Vec::new(),
        })
    }

    /// Splits the order into its stored fields.
    pub fn into_parts(self) -> OrderParts {
        OrderParts {
            id: self.id,
            version: self.version,
            user_id: self.user_id,
            customer_email: self.customer_email,
            customer_name: self.customer_name,
            total_amount: self.total_amount,
            status: self.status,
            payment_status: self.payment_status,
            shipping_address: self.shipping_address,
            billing_address: self.billing_address,
            payment_method: self.payment_method,
            shipping_method: self.shipping_method,
            tracking_number: self.tracking_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items: self.items,
            status_logs: self.status_logs,
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> Option<OrderId> {
        self.id
    }

    /// Version of the stored row this order was read from. Repositories
    /// reject a save whose version no longer matches.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn billing_address(&self) -> &Address {
        &self.billing_address
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn shipping_method(&self) -> Option<&str> {
        self.shipping_method.as_deref()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Audit entries, oldest first.
    pub fn status_logs(&self) -> &[OrderStatusLog] {
        &self.status_logs
    }

    /// Returns the total quantity across all items.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Recomputes the item sum; equals [`Order::total_amount`] for any order
    /// built through [`Order::place`].
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// State machine
impl Order {
    /// Moves the order to `target`, recording `actor` and `note` in the log.
    ///
    /// A same-status request is a no-op and appends nothing. When `note` is
    /// `None` the entry reads "Status changed by <actor>".
    pub fn transition(
        &mut self,
        target: OrderStatus,
        actor: &str,
        note: Option<String>,
    ) -> Result<TransitionOutcome, OrderError> {
        if self.status == target {
            return Ok(TransitionOutcome::Unchanged);
        }

        if !self.status.can_transition_to(target) {
            return Err(OrderError::IllegalTransition {
                from: self.status,
                to: target,
            });
        }

        let note = note.unwrap_or_else(|| default_transition_note(actor));
        let log = OrderStatusLog::transition(self.status, target, actor, note);
        self.updated_at = log.changed_at;
        self.status = target;
        self.status_logs.push(log);

        Ok(TransitionOutcome::Changed)
    }

    /// Appends an admin note without touching the status.
    pub fn add_note(&mut self, actor: &str, text: &str) -> Result<(), OrderError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(OrderError::validation("note: must not be blank"));
        }

        let log = OrderStatusLog::note(self.status, actor, text);
        self.updated_at = log.changed_at;
        self.status_logs.push(log);
        Ok(())
    }
}
