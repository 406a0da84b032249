//! Money

use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use thiserror::Error;

/// Currency the storefront trades in.
pub const CURRENCY: &Currency = iso::VND;

/// A monetary amount in the storefront currency.
pub type Amount = Money<'static, Currency>;

/// Errors converting wire values into amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    /// The value does not fit in minor units.
    #[error("amount {0} cannot be represented in minor units")]
    Overflow(Decimal),
}

/// Build an amount from minor units.
#[must_use]
pub fn amount(minor: i64) -> Amount {
    Money::from_minor(minor, CURRENCY)
}

/// The zero amount.
#[must_use]
pub fn zero() -> Amount {
    amount(0)
}

/// Convert a major-unit decimal (as sent by the API) into minor units.
///
/// Values finer than the currency's minor unit are rounded half away from zero.
///
/// # Errors
///
/// Returns [`AmountError::Overflow`] if the value does not fit in an `i64`.
pub fn minor_units(value: Decimal) -> Result<i64, AmountError> {
    let scale = Decimal::from_i64(10_i64.pow(CURRENCY.exponent)).ok_or(AmountError::Overflow(value))?;

    value
        .checked_mul(scale)
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_i64())
        .ok_or(AmountError::Overflow(value))
}

/// Convert a major-unit decimal into an amount.
///
/// # Errors
///
/// Returns [`AmountError::Overflow`] if the value does not fit in minor units.
pub fn from_decimal(value: Decimal) -> Result<Amount, AmountError> {
    Ok(amount(minor_units(value)?))
}

/// Percentage (0-100 scale) of a minor unit amount, rounded half away from zero.
///
/// # Errors
///
/// Returns [`AmountError::Overflow`] if the product cannot be represented.
pub fn percent_of_minor(percent: Decimal, minor: i64) -> Result<i64, AmountError> {
    let Some(minor) = Decimal::from_i64(minor) else {
        return Err(AmountError::Overflow(percent));
    };

    let Some(applied) = minor.checked_mul(percent) else {
        return Err(AmountError::Overflow(percent));
    };

    let Some(share) = applied.checked_div(Decimal::ONE_HUNDRED) else {
        return Err(AmountError::Overflow(percent));
    };

    share
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(AmountError::Overflow(percent))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn minor_units_rounds_fractional_dong() -> TestResult {
        assert_eq!(minor_units(Decimal::new(10_000_050, 2))?, 100_001);
        assert_eq!(minor_units(Decimal::new(10_000_049, 2))?, 100_000);

        Ok(())
    }

    #[test]
    fn minor_units_overflow_returns_error() {
        let result = minor_units(Decimal::MAX);

        assert!(matches!(result, Err(AmountError::Overflow(_))));
    }

    #[test]
    fn percent_of_minor_returns_share() -> TestResult {
        assert_eq!(percent_of_minor(Decimal::TEN, 500_000)?, 50_000);
        assert_eq!(percent_of_minor(Decimal::new(125, 1), 1_000)?, 125);

        Ok(())
    }

    #[test]
    fn percent_of_minor_rounds_half_away_from_zero() -> TestResult {
        // 15% of 10 dong is 1.5 dong
        assert_eq!(percent_of_minor(Decimal::new(15, 0), 10)?, 2);

        Ok(())
    }

    #[test]
    fn from_decimal_uses_storefront_currency() -> TestResult {
        let value = from_decimal(Decimal::new(150_000, 0))?;

        assert_eq!(value, amount(150_000));
        assert_eq!(value.currency(), CURRENCY);

        Ok(())
    }
}
