//! Fixed-point money helpers with 2-decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! All amounts are `rust_decimal::Decimal` values carrying exactly
//! two decimal places at rest; JSON payloads carry them as strings.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Errors from parsing amount strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// The string is not a decimal number.
    #[error("malformed amount: {0}")]
    Malformed(String),

    /// The value carries more than two decimal places.
    #[error("amount has more than two decimal places: {0}")]
    TooPrecise(String),
}

/// Rounds to 2 decimal places, half-up (midpoint away from zero).
#[must_use]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parses a decimal amount string (e.g. `"350.40"`).
///
/// Accepts at most two decimal places; anything else is rejected so that
/// precision is never silently dropped at the API boundary.
///
/// # Errors
///
/// Returns `MoneyError::Malformed` for non-numeric input and
/// `MoneyError::TooPrecise` for more than two decimal places.
pub fn parse_amount(s: &str) -> Result<Decimal, MoneyError> {
    let value: Decimal = s
        .trim()
        .parse()
        .map_err(|_| MoneyError::Malformed(s.to_string()))?;

    if value.scale() > 2 {
        return Err(MoneyError::TooPrecise(s.to_string()));
    }

    Ok(value)
}

/// Formats an amount with exactly two decimal places (e.g. `"0.00"`).
#[must_use]
pub fn format_amount(value: Decimal) -> String {
    let mut value = round2(value);
    value.rescale(2);
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(33.333), dec!(33.33))]
    #[case(dec!(33.335), dec!(33.34))]
    #[case(dec!(2.005), dec!(2.01))]
    #[case(dec!(-2.005), dec!(-2.01))]
    #[case(dec!(100.00), dec!(100.00))]
    #[case(dec!(0), dec!(0))]
    fn test_round2_half_up(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(round2(input), expected);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("350.40").unwrap(), dec!(350.40));
        assert_eq!(parse_amount(" 12 ").unwrap(), dec!(12));
        assert_eq!(parse_amount("0.5").unwrap(), dec!(0.5));
    }

    #[test]
    fn test_parse_amount_malformed() {
        assert_eq!(
            parse_amount("abc"),
            Err(MoneyError::Malformed("abc".to_string()))
        );
        assert_eq!(parse_amount(""), Err(MoneyError::Malformed(String::new())));
    }

    #[test]
    fn test_parse_amount_too_precise() {
        assert_eq!(
            parse_amount("1.999"),
            Err(MoneyError::TooPrecise("1.999".to_string()))
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec!(0)), "0.00");
        assert_eq!(format_amount(dec!(200)), "200.00");
        assert_eq!(format_amount(dec!(33.3)), "33.30");
        assert_eq!(format_amount(dec!(1200.00)), "1200.00");
    }
}
