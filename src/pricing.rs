//! Pricing
//!
//! Minor-unit money helpers shared by the catalog, the pricing engine and the
//! record codecs. All arithmetic happens on `i64` cents and is re-wrapped as
//! [`Money`] for callers.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{
    Money, MoneyError,
    iso::{AUD, Currency, EUR, GBP, USD},
};
use thiserror::Error;

/// Errors that can occur while calculating line or order totals.
#[derive(Debug, Error, PartialEq)]
pub enum TotalPriceError {
    /// A line total or sum left the representable minor-unit range.
    #[error("price arithmetic overflowed")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Multiplies a unit price by a quantity.
///
/// # Errors
///
/// Returns [`TotalPriceError::Overflow`] if the product does not fit in minor units.
pub fn line_total<'a>(
    unit_price: &Money<'a, Currency>,
    quantity: u32,
) -> Result<Money<'a, Currency>, TotalPriceError> {
    let minor = unit_price
        .to_minor_units()
        .checked_mul(i64::from(quantity))
        .ok_or(TotalPriceError::Overflow)?;

    Ok(Money::from_minor(minor, unit_price.currency()))
}

/// Sums a sequence of line totals in the given currency.
///
/// An empty sequence sums to zero.
///
/// # Errors
///
/// - [`TotalPriceError::Money`]: a line is in a different currency.
pub fn total_price<'a>(
    totals: impl IntoIterator<Item = Money<'a, Currency>>,
    currency: &'a Currency,
) -> Result<Money<'a, Currency>, TotalPriceError> {
    let total = totals
        .into_iter()
        .try_fold(Money::from_minor(0, currency), |acc, line| acc.add(line))?;

    Ok(total)
}

/// Mean of `count` amounts summing to `total`, rounded half-up to the cent.
/// Zero amounts average to zero.
pub fn average<'a>(total: &Money<'a, Currency>, count: u64) -> Money<'a, Currency> {
    let minor = if count == 0 {
        0
    } else {
        (Decimal::from(total.to_minor_units()) / Decimal::from(count))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or_default()
    };

    Money::from_minor(minor, total.currency())
}

/// Parses a plain decimal amount (e.g. `"25.30"`) into minor units.
///
/// Amounts are rounded half-up to the cent.
pub fn parse_minor_units(s: &str) -> Option<i64> {
    s.trim()
        .parse::<Decimal>()
        .ok()?
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Formats a money value as a plain two-decimal amount for records (`"625.00"`).
pub fn format_amount(money: &Money<'_, Currency>) -> String {
    Decimal::new(money.to_minor_units(), 2).to_string()
}

/// Resolves a supported ISO currency code.
pub fn parse_currency(code: &str) -> Option<&'static Currency> {
    match code.trim().to_ascii_uppercase().as_str() {
        "USD" => Some(USD),
        "AUD" => Some(AUD),
        "GBP" => Some(GBP),
        "EUR" => Some(EUR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn line_total_multiplies_unit_price() -> TestResult {
        let unit = Money::from_minor(2530, USD);

        assert_eq!(line_total(&unit, 3)?, Money::from_minor(7590, USD));

        Ok(())
    }

    #[test]
    fn line_total_overflow_returns_error() {
        let unit = Money::from_minor(i64::MAX, USD);

        assert_eq!(line_total(&unit, 2), Err(TotalPriceError::Overflow));
    }

    #[test]
    fn average_rounds_half_up() {
        let total = Money::from_minor(1_001, USD);

        assert_eq!(average(&total, 2), Money::from_minor(501, USD));
        assert_eq!(average(&total, 0), Money::from_minor(0, USD));
    }

    #[test]
    fn total_price_sums_lines() -> TestResult {
        let lines = [Money::from_minor(60_000, USD), Money::from_minor(2_500, USD)];

        assert_eq!(total_price(lines, USD)?, Money::from_minor(62_500, USD));

        Ok(())
    }

    #[test]
    fn total_price_empty_is_zero() -> TestResult {
        assert_eq!(total_price([], USD)?, Money::from_minor(0, USD));

        Ok(())
    }

    #[test]
    fn total_price_rejects_mixed_currency() {
        let lines = [Money::from_minor(100, USD), Money::from_minor(100, GBP)];

        assert!(matches!(
            total_price(lines, USD),
            Err(TotalPriceError::Money(_))
        ));
    }

    #[test]
    fn parse_minor_units_handles_decimals() {
        assert_eq!(parse_minor_units("200.00"), Some(20_000));
        assert_eq!(parse_minor_units(" 25.3 "), Some(2_530));
        assert_eq!(parse_minor_units("190.705"), Some(19_071));
        assert_eq!(parse_minor_units("abc"), None);
    }

    #[test]
    fn format_amount_keeps_two_places() {
        assert_eq!(format_amount(&Money::from_minor(62_500, USD)), "625.00");
        assert_eq!(format_amount(&Money::from_minor(5, USD)), "0.05");
    }

    #[test]
    fn parse_currency_is_case_insensitive() {
        assert_eq!(parse_currency("aud"), Some(AUD));
        assert_eq!(parse_currency("XYZ"), None);
    }
}
