//! Money represented in integer cents to avoid floating point issues.

use serde::{Deserialize, Serialize};

/// A monetary amount in Kenyan shillings, stored as cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 50_000 = KSh 500.00)
    cents: i64,
}

impl Money {
    /// Creates a new amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new amount from whole shillings.
    pub fn from_shillings(shillings: i64) -> Self {
        Self {
            cents: shillings * 100,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Whole-shilling portion of the amount.
    pub fn shillings(&self) -> i64 {
        self.cents / 100
    }

    /// Cents portion (remainder after whole shillings).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Amount truncated to whole shillings, the unit the payment gateway
    /// accepts for push requests.
    pub fn whole_units(&self) -> i64 {
        self.cents / 100
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * quantity as i64,
        }
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
            write!(f, "-KSh {}.{:02}", self.shillings().abs(), self.cents_part())
        } else {
            write!(f, "KSh {}.{:02}", self.shillings(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cents_and_parts() {
        let m = Money::from_cents(1234);
        assert_eq!(m.cents(), 1234);
        assert_eq!(m.shillings(), 12);
        assert_eq!(m.cents_part(), 34);
    }

    #[test]
    fn from_shillings() {
        let m = Money::from_shillings(500);
        assert_eq!(m.cents(), 50_000);
        assert_eq!(m.whole_units(), 500);
    }

    #[test]
    fn display() {
        assert_eq!(Money::from_cents(1234).to_string(), "KSh 12.34");
        assert_eq!(Money::from_cents(5).to_string(), "KSh 0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-KSh 12.34");
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);
        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply(3).cents(), 3000);
    }

    #[test]
    fn sum_of_line_totals() {
        let total: Money = [Money::from_cents(100), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total.cents(), 350);
    }

    #[test]
    fn whole_units_truncates() {
        assert_eq!(Money::from_cents(12_399).whole_units(), 123);
    }
}
