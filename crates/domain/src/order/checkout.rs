//! Checkout details supplied by the customer and their validation rules.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Address, OrderError};

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$").ok()
});

fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(value))
}

/// Customer-entered data needed to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub shipping_address: Address,

    /// Falls back to the shipping address when absent.
    #[serde(default)]
    pub billing_address: Option<Address>,

    pub customer_email: String,

    pub customer_name: String,

    pub payment_method: String,

    #[serde(default)]
    pub shipping_method: Option<String>,
}

impl CheckoutDetails {
    /// Checks every field and reports all violations at once.
    pub fn validate(&self) -> Result<(), OrderError> {
        let mut violations = Vec::new();

        validate_address("shipping_address", &self.shipping_address, &mut violations);
        if let Some(billing) = &self.billing_address {
            validate_address("billing_address", billing, &mut violations);
        }

        required("customer_email", &self.customer_email, 255, &mut violations);
        if !self.customer_email.trim().is_empty() && !is_valid_email(self.customer_email.trim()) {
            violations.push("customer_email: must be a well-formed email address".to_string());
        }
        required("customer_name", &self.customer_name, 255, &mut violations);
        required("payment_method", &self.payment_method, 100, &mut violations);
        if let Some(method) = &self.shipping_method {
            max_len("shipping_method", method, 100, &mut violations);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(OrderError::Validation(violations))
        }
    }

    /// Billing address to store on the order.
    pub fn effective_billing_address(&self) -> Address {
        self.billing_address
            .clone()
            .unwrap_or_else(|| self.shipping_address.clone())
    }

    /// Shipping method with blank values treated as absent.
    pub fn effective_shipping_method(&self) -> Option<String> {
        self.shipping_method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }
}

fn validate_address(prefix: &str, address: &Address, violations: &mut Vec<String>) {
    let field = |name: &str| format!("{prefix}.{name}");

    required(&field("street"), &address.street, 255, violations);
    if let Some(line2) = &address.address_line2 {
        max_len(&field("address_line2"), line2, 100, violations);
    }
    required(&field("city"), &address.city, 100, violations);
    required(&field("state_or_province"), &address.state_or_province, 100, violations);
    required(&field("postal_code"), &address.postal_code, 20, violations);
    required(&field("country"), &address.country, 100, violations);

    let phone = address.contact_phone.trim();
    if phone.is_empty() {
        violations.push(format!("{}: must not be blank", field("contact_phone")));
    } else if !(7..=20).contains(&phone.chars().count()) {
        violations.push(format!(
            "{}: must be between 7 and 20 characters",
            field("contact_phone")
        ));
    }
}

fn required(name: &str, value: &str, max: usize, violations: &mut Vec<String>) {
    if value.trim().is_empty() {
        violations.push(format!("{name}: must not be blank"));
    } else {
        max_len(name, value, max, violations);
    }
}

fn max_len(name: &str, value: &str, max: usize, violations: &mut Vec<String>) {
    if value.chars().count() > max {
        violations.push(format!("{name}: must be at most {max} characters"));
    }
}
