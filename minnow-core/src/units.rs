//! Conversion between human-scale decimals and base units
//!
//! Deposits and entitlements are tracked as integer base units. Operators
//! think in whole assets ("0.4"), so conversions go through `Decimal` and
//! never through floats.

use crate::{types::Amount, Error, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Largest scale a `Decimal` can carry
const MAX_DECIMALS: u32 = 28;

/// Convert a decimal value into base units.
///
/// `parse_units(0.4, 18)` yields `400_000_000_000_000_000`. Values with more
/// fractional digits than `decimals` are rejected instead of truncated.
pub fn parse_units(value: Decimal, decimals: u32) -> Result<Amount> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::InvalidAmount(format!("{} is negative", value)));
    }

    let normalized = value.normalize();
    if normalized.scale() > decimals {
        return Err(Error::InvalidAmount(format!(
            "{} has more than {} decimal places",
            value, decimals
        )));
    }

    let mantissa = u128::try_from(normalized.mantissa().abs())
        .map_err(|_| Error::InvalidAmount(format!("{} out of range", value)))?;
    let factor = 10u128
        .checked_pow(decimals - normalized.scale())
        .ok_or_else(|| Error::ArithmeticOverflow(format!("10^{}", decimals)))?;

    mantissa
        .checked_mul(factor)
        .ok_or_else(|| Error::ArithmeticOverflow(format!("{} * 10^{}", value, decimals)))
}

/// Parse a decimal string into base units
pub fn parse_units_str(value: &str, decimals: u32) -> Result<Amount> {
    let decimal = Decimal::from_str(value.trim())
        .map_err(|e| Error::InvalidAmount(format!("{}: {}", value, e)))?;
    parse_units(decimal, decimals)
}

/// Convert base units back into a decimal value
pub fn format_units(amount: Amount, decimals: u32) -> Result<Decimal> {
    if decimals > MAX_DECIMALS {
        return Err(Error::InvalidAmount(format!(
            "{} decimals exceeds the maximum of {}",
            decimals, MAX_DECIMALS
        )));
    }

    let signed = i128::try_from(amount)
        .map_err(|_| Error::ArithmeticOverflow(format!("{} out of range", amount)))?;
    let value = Decimal::try_from_i128_with_scale(signed, decimals)
        .map_err(|e| Error::ArithmeticOverflow(format!("{}: {}", amount, e)))?;
    Ok(value.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ether_amounts() {
        assert_eq!(parse_units_str("0.4", 18).unwrap(), 400_000_000_000_000_000);
        assert_eq!(parse_units_str("1", 18).unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(parse_units_str("1.000", 18).unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(parse_units_str("0", 18).unwrap(), 0);
        assert_eq!(parse_units_str("12.5", 2).unwrap(), 1250);
    }

    #[test]
    fn test_parse_rejects_excess_precision() {
        let err = parse_units_str("0.001", 2).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[test]
    fn test_parse_rejects_negative() {
        let err = parse_units(Decimal::new(-4, 1), 18).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[test]
    fn test_format_units() {
        let formatted = format_units(1_200_000_000_000_000_000, 18).unwrap();
        assert_eq!(formatted, Decimal::new(12, 1));
        assert!(format_units(1, 29).is_err());
    }
}
