//! Money value object.
//!
//! Prices travel through the system as display strings prefixed with a single
//! currency symbol (`"£88.99"`), exactly as they appear in the catalog and in
//! stored carts. Arithmetic only happens on parsed [`Price`] values, backed by
//! `rust_decimal` so totals such as `2 × £88.99` are exact.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// The one currency symbol the catalog uses.
pub const CURRENCY_SYMBOL: char = '£';

/// A non-negative amount in the catalog currency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Parse a currency-prefixed price string.
    ///
    /// Exactly one leading [`CURRENCY_SYMBOL`] is stripped; the remainder must
    /// be ASCII digits with at most one decimal point (no sign, separators or
    /// whitespace).
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let rest = raw
            .strip_prefix(CURRENCY_SYMBOL)
            .ok_or_else(|| DomainError::malformed_price(raw, "missing currency symbol"))?;

        if rest.starts_with(CURRENCY_SYMBOL) {
            return Err(DomainError::malformed_price(
                raw,
                "more than one currency symbol",
            ));
        }
        if rest.is_empty() {
            return Err(DomainError::malformed_price(raw, "no amount"));
        }
        if !is_plain_amount(rest) {
            return Err(DomainError::malformed_price(
                raw,
                "amount must be digits with an optional decimal point",
            ));
        }

        Decimal::from_str(rest)
            .map(Self)
            .map_err(|e| DomainError::malformed_price(raw, e.to_string()))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Line amount for `quantity` units.
    pub fn times(&self, quantity: u32) -> DomainResult<Decimal> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .ok_or(DomainError::AmountOverflow)
    }
}

fn is_plain_amount(s: &str) -> bool {
    let mut digits = 0;
    let mut points = 0;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            _ => return false,
        }
    }
    digits > 0 && points <= 1
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{CURRENCY_SYMBOL}{}", self.0)
    }
}

impl FromStr for Price {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Price::parse("£150").unwrap().amount(), Decimal::from(150));
        assert_eq!(
            Price::parse("£88.99").unwrap().amount(),
            Decimal::new(8899, 2)
        );
        assert_eq!(Price::parse("£0").unwrap().amount(), Decimal::ZERO);
    }

    #[test]
    fn rejects_malformed_strings() {
        for raw in [
            "150", "$150", "££150", "£", "£ 150", "£150 ", "£abc", "£-5", "£1,000", "£1_000",
            "£+5", "£-0", "£.", "£1.2.3", "£1e3",
        ] {
            match Price::parse(raw) {
                Err(DomainError::MalformedPrice { raw: got, .. }) => assert_eq!(got, raw),
                other => panic!("expected MalformedPrice for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn times_is_exact() {
        let price = Price::parse("£88.99").unwrap();
        assert_eq!(price.times(2).unwrap(), Decimal::new(17798, 2));
        assert_eq!(price.times(0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn times_reports_overflow() {
        let price = Price::parse("£79228162514264337593543950335").unwrap();
        assert_eq!(price.times(2), Err(DomainError::AmountOverflow));
    }

    #[test]
    fn display_restores_the_symbol() {
        assert_eq!(Price::parse("£12.50").unwrap().to_string(), "£12.50");
    }
}
