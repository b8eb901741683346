//! Exact money arithmetic.

use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Adds another amount, returning `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}
