//! Fixed-point decimal types for prices and quantities
//!
//! Thin newtypes over `rust_decimal::Decimal` so the compiler catches
//! price/quantity mixups and so floating point never touches order math.
//! `Price` is strictly positive and totally ordered (it keys the book);
//! `Quantity` is non-negative and saturates at zero on subtraction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

/// Validation errors for numeric newtypes
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericError {
    #[error("price must be strictly positive")]
    NonPositivePrice,

    #[error("quantity must not be negative")]
    NegativeQuantity,

    #[error("not a valid decimal number")]
    Unparsable,
}

/// Price in quote currency per unit of base currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a validated price
    pub fn new(value: Decimal) -> Result<Self, NumericError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(NumericError::NonPositivePrice)
        }
    }

    /// Convenience constructor for whole-number prices
    pub fn from_u64(value: u64) -> Self {
        debug_assert!(value > 0, "price must be strictly positive");
        Self(Decimal::from(value))
    }

    /// Inner decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Number of significant decimal places, trailing zeros stripped
    ///
    /// `100.10` has one decimal place for the purpose of the instrument
    /// precision admission check.
    pub fn decimal_places(&self) -> u32 {
        self.0.normalize().scale()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|_| NumericError::Unparsable)?;
        Self::new(value)
    }
}

/// Quantity of base currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a validated quantity
    pub fn new(value: Decimal) -> Result<Self, NumericError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(NumericError::NegativeQuantity)
        }
    }

    /// The zero quantity
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Convenience constructor for whole-number quantities
    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Inner decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtraction that never goes below zero
    ///
    /// Remaining quantity is an invariant-protected field; callers check
    /// bounds before subtracting, and this keeps the type honest even if
    /// they don't.
    pub fn saturating_sub(self, other: Quantity) -> Self {
        if other.0 >= self.0 {
            Self(Decimal::ZERO)
        } else {
            Self(self.0 - other.0)
        }
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Quantity {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|_| NumericError::Unparsable)?;
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_must_be_positive() {
        assert!(Price::new(Decimal::from(100)).is_ok());
        assert_eq!(
            Price::new(Decimal::ZERO),
            Err(NumericError::NonPositivePrice)
        );
        assert_eq!(
            Price::new(Decimal::from(-1)),
            Err(NumericError::NonPositivePrice)
        );
    }

    #[test]
    fn test_price_ordering() {
        let low = Price::from_u64(99);
        let high = Price::from_u64(101);
        assert!(low < high);
    }

    #[test]
    fn test_price_decimal_places_ignores_trailing_zeros() {
        let price: Price = "100.10".parse().unwrap();
        assert_eq!(price.decimal_places(), 1);

        let price: Price = "0.12345678".parse().unwrap();
        assert_eq!(price.decimal_places(), 8);

        let price: Price = "42".parse().unwrap();
        assert_eq!(price.decimal_places(), 0);
    }

    #[test]
    fn test_price_parse_rejects_garbage() {
        assert_eq!("abc".parse::<Price>(), Err(NumericError::Unparsable));
        assert_eq!("-5".parse::<Price>(), Err(NumericError::NonPositivePrice));
    }

    #[test]
    fn test_quantity_rejects_negative() {
        assert!(Quantity::new(Decimal::ZERO).is_ok());
        assert_eq!(
            Quantity::new(Decimal::from(-1)),
            Err(NumericError::NegativeQuantity)
        );
    }

    #[test]
    fn test_quantity_saturating_sub() {
        let five = Quantity::from_u64(5);
        let three = Quantity::from_u64(3);
        assert_eq!(five.saturating_sub(three), Quantity::from_u64(2));
        assert_eq!(three.saturating_sub(five), Quantity::zero());
        assert_eq!(three.saturating_sub(three), Quantity::zero());
    }

    #[test]
    fn test_quantity_add() {
        let total = Quantity::from_u64(2) + "0.5".parse::<Quantity>().unwrap();
        assert_eq!(total, "2.5".parse::<Quantity>().unwrap());
    }

    #[test]
    fn test_equal_values_with_different_scales_compare_equal() {
        let a: Price = "100".parse().unwrap();
        let b: Price = "100.00".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serde_round_trip() {
        let price: Price = "50000.25".parse().unwrap();
        let json = serde_json::to_string(&price).unwrap();
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(price, back);
    }
}
