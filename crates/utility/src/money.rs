use std::fmt;

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A validated ISO-4217 currency code, e.g. `THB`, `USD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Currency([u8; 3]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCurrency;

impl fmt::Display for InvalidCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "currency code must be 3 uppercase ASCII letters")
    }
}

impl std::error::Error for InvalidCurrency {}

impl Currency {
    pub fn parse(code: &str) -> Result<Self, InvalidCurrency> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(InvalidCurrency);
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).expect("currency bytes are ascii by construction")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Currency {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Currency::parse(&s).map_err(de::Error::custom)
    }
}

/// A monetary amount with its currency: `{amount: decimal, currency: ISO-4217}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Subtracts `other` from `self`. Callers are responsible for ensuring
    /// both amounts share a currency; the core never converts currencies.
    pub fn checked_sub(&self, other: &Money) -> Option<Decimal> {
        if self.currency != other.currency {
            return None;
        }
        Some(self.amount - other.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn currency_rejects_malformed_codes() {
        assert!(Currency::parse("THB").is_ok());
        assert!(Currency::parse("thb").is_err());
        assert!(Currency::parse("TH").is_err());
        assert!(Currency::parse("THBB").is_err());
    }

    #[test]
    fn checked_sub_requires_matching_currency() {
        let thb = Currency::parse("THB").unwrap();
        let usd = Currency::parse("USD").unwrap();
        let a = Money::new(dec!(500), thb);
        let b = Money::new(dec!(200), thb);
        assert_eq!(a.checked_sub(&b), Some(dec!(300)));

        let c = Money::new(dec!(10), usd);
        assert_eq!(a.checked_sub(&c), None);
    }
}
