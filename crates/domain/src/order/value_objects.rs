//! Value objects for the order domain.

use common::VariantId;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places kept for currency amounts.
pub const CURRENCY_SCALE: u32 = 2;

/// Exact decimal money amount.
///
/// Arithmetic is exact; only [`Money::rounded`] changes precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a money amount from a decimal value.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Creates a money amount from minor units (e.g. 1999 = 19.99).
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, CURRENCY_SCALE))
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the underlying decimal.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns the amount rounded half-away-from-zero to currency precision.
    pub fn rounded(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0 * Decimal::from(quantity))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rounded = self.rounded().0;
        if rounded.is_sign_negative() && !rounded.is_zero() {
            write!(f, "-${:.2}", rounded.abs())
        } else {
            write!(f, "${:.2}", rounded)
        }
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A postal address captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub state_or_province: String,
    pub postal_code: String,
    pub country: String,
    pub contact_phone: String,
}

/// One product variant captured into an order.
///
/// Name, size, image and price are copies taken from the catalog at checkout
/// and never re-read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Assigned by the repository on first save.
    pub id: Option<i64>,

    pub variant_id: VariantId,

    pub product_name: String,

    pub variant_size: Option<String>,

    pub product_image_url: Option<String>,

    /// Always greater than zero.
    pub quantity: u32,

    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new, not yet persisted order item.
    pub fn new(
        variant_id: impl Into<VariantId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            id: None,
            variant_id: variant_id.into(),
            product_name: product_name.into(),
            variant_size: None,
            product_image_url: None,
            quantity,
            unit_price,
        }
    }

    /// Sets the variant size label.
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.variant_size = Some(size.into());
        self
    }

    /// Sets the product image URL.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.product_image_url = Some(url.into());
        self
    }

    /// Returns `unit_price * quantity`.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}
