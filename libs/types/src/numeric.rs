//! Fixed-point amounts and timestamps
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Fungible balances, basket constituents and ask prices are all `Amount`s
//! denominated in the smallest meaningful unit of their asset.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AmountError;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Non-negative fungible amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Wrap a raw decimal without validation.
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Wrap a decimal that must be strictly positive.
    pub fn positive(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    /// Subtract, returning `None` on underflow below zero.
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        if rhs.0 > self.0 {
            return None;
        }
        self.0.checked_sub(rhs.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Self(Decimal::from(v))
    }
}

impl From<Decimal> for Amount {
    fn from(v: Decimal) -> Self {
        Self(v)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .map(Amount)
            .map_err(|e| AmountError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_positive_rejects_zero_and_negative() {
        assert!(Amount::positive(Decimal::ZERO).is_err());
        assert!(Amount::positive(Decimal::from(-5)).is_err());
        assert_eq!(Amount::positive(Decimal::from(5)).unwrap(), Amount::from(5));
    }

    #[test]
    fn test_checked_sub_underflow() {
        assert_eq!(Amount::from(3).checked_sub(Amount::from(5)), None);
        assert_eq!(
            Amount::from(5).checked_sub(Amount::from(3)),
            Some(Amount::from(2))
        );
    }

    #[test]
    fn test_checked_add_overflow() {
        assert_eq!(Amount::new(Decimal::MAX).checked_add(Amount::from(1)), None);
    }

    #[test]
    fn test_parse_fractional() {
        let a: Amount = "0.05".parse().unwrap();
        assert_eq!(a.as_decimal(), Decimal::new(5, 2));
        assert!("five".parse::<Amount>().is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Amount::new(Decimal::new(2050, 2))).unwrap();
        assert_eq!(json, "\"20.50\"");
    }

    proptest! {
        #[test]
        fn prop_add_then_sub_is_identity(a in 0u64..1_000_000_000, b in 0u64..1_000_000_000) {
            let sum = Amount::from(a).checked_add(Amount::from(b)).unwrap();
            prop_assert_eq!(sum.checked_sub(Amount::from(b)), Some(Amount::from(a)));
        }
    }
}
