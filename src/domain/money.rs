use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative monetary amount in the single account currency.
///
/// This is a wrapper around `rust_decimal::Decimal` so that a negative value can
/// never reach the aggregation or payment code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value.is_sign_negative() && !value.is_zero() {
            Err(PaymentError::ValidationError(format!(
                "Amount must not be negative, got {value}"
            )))
        } else {
            Ok(Self(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(Amount::new(dec!(0.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_display_drops_trailing_zeros() {
        let amount = Amount::new(dec!(500.00)).unwrap();
        assert_eq!(amount.to_string(), "500");

        let amount = Amount::new(dec!(12.50)).unwrap();
        assert_eq!(amount.to_string(), "12.5");
    }

    #[test]
    fn test_amount_deserialization_rejects_negative() {
        let ok: Amount = serde_json::from_str("\"42.5\"").unwrap();
        assert_eq!(ok.value(), dec!(42.5));

        let err = serde_json::from_str::<Amount>("\"-3\"");
        assert!(err.is_err());
    }
}
