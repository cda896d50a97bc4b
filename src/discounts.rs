//! Discounts
//!
//! Bundle packaging discounts and reward-point conversions.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;

/// Points are redeemed in blocks of this size, and never fewer than one block.
pub const REDEMPTION_BLOCK: u64 = 100;

/// Errors specific to discount and reward calculations.
#[derive(Debug, Error, PartialEq)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// A reward or redeem rate was negative.
    #[error("rate must not be negative, got {0}")]
    NegativeRate(Decimal),
}

/// Share of the component sum that a bundle costs (a fixed 20% package discount).
pub fn bundle_price_ratio() -> Percentage {
    Percentage::from(Decimal::new(80, 2))
}

/// Calculate a percentage of a minor unit amount, rounding half-up to the cent.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] if the result cannot be represented.
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    ((*percent) * Decimal::ONE)
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}

/// Points earned for paying `total_minor` at the guest's `reward_rate`.
///
/// `round(total * reward_rate / 100)` with round-half-to-even, so a rate of 100
/// awards one point per dollar.
///
/// # Errors
///
/// Returns an error for a negative rate or when the result does not fit.
pub fn reward_points_for(total_minor: i64, reward_rate: Decimal) -> Result<u64, DiscountError> {
    if reward_rate.is_sign_negative() && !reward_rate.is_zero() {
        return Err(DiscountError::NegativeRate(reward_rate));
    }

    let total = Decimal::from_i64(total_minor).ok_or(DiscountError::PercentConversion)?;

    // minor units carry a factor of 100, the rate divisor another 100
    total
        .checked_mul(reward_rate)
        .and_then(|value| value.checked_div(Decimal::from(10_000)))
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .max(Decimal::ZERO)
        .to_u64()
        .ok_or(DiscountError::PercentConversion)
}

/// Discount in minor units for redeeming `points` at `redeem_rate` dollars per 100 points.
///
/// # Errors
///
/// Returns an error for a negative rate or when the result does not fit.
pub fn redemption_discount_minor(points: u64, redeem_rate: Decimal) -> Result<i64, DiscountError> {
    if redeem_rate.is_sign_negative() && !redeem_rate.is_zero() {
        return Err(DiscountError::NegativeRate(redeem_rate));
    }

    let points = Decimal::from_u64(points).ok_or(DiscountError::PercentConversion)?;

    // points * rate / 100 dollars == points * rate cents
    points
        .checked_mul(redeem_rate)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}
