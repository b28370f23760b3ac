//! # Fixed-Point Units
//!
//! Every amount on the ledger is an integer count of the smallest unit.
//! With 18 decimals, one whole token is `10^18` units. This module converts
//! between that integer form and the decimal strings humans type.
//!
//! The ledger never divides. Decimals exist for display and input only.

use thiserror::Error;

/// An amount in smallest units.
pub type Amount = u128;

/// Largest decimal count whose scale factor (`10^decimals`) fits in `u128`.
pub const MAX_DECIMALS: u8 = 38;

/// Errors produced when converting between decimal strings and amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    /// The input string was empty.
    #[error("empty amount")]
    Empty,

    /// The input contained something other than digits and one `.`.
    #[error("invalid amount: {0:?}")]
    InvalidDigit(String),

    /// More fractional digits were given than the token supports.
    #[error("too many fractional digits: {given} given, {decimals} allowed")]
    TooPrecise {
        /// Fractional digits in the input.
        given: usize,
        /// Token decimals.
        decimals: u8,
    },

    /// The value does not fit in a `u128`.
    #[error("amount overflows 128 bits: {0}")]
    Overflow(String),

    /// The scale factor for this many decimals does not fit in a `u128`.
    #[error("unsupported decimals: {0} (max {MAX_DECIMALS})")]
    UnsupportedDecimals(u8),
}

fn scale(decimals: u8) -> Result<Amount, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    Ok(10u128.pow(decimals as u32))
}

/// Converts a whole-token count to smallest units, checking for overflow.
pub fn to_base_units(whole: Amount, decimals: u8) -> Result<Amount, UnitsError> {
    whole
        .checked_mul(scale(decimals)?)
        .ok_or_else(|| UnitsError::Overflow(whole.to_string()))
}

/// Parses a decimal string such as `"1.5"` into smallest units.
///
/// Accepts digits with at most one `.`; a leading or trailing `.` is allowed
/// (`".5"`, `"3."`). Signs, exponents, and separators are rejected.
pub fn parse_units(input: &str, decimals: u8) -> Result<Amount, UnitsError> {
    let s = input.trim();
    if s.is_empty() || s == "." {
        return Err(UnitsError::Empty);
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(UnitsError::InvalidDigit(input.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            given: frac.len(),
            decimals,
        });
    }

    let overflow = || UnitsError::Overflow(input.to_string());

    let whole_value: Amount = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let frac_value: Amount = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse().map_err(|_| overflow())?
    };

    whole_value
        .checked_mul(scale(decimals)?)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(overflow)
}

/// Formats an amount in smallest units as a decimal string.
///
/// Trailing fractional zeros are trimmed; whole numbers have no `.`.
pub fn format_units(amount: Amount, decimals: u8) -> String {
    let Ok(factor) = scale(decimals) else {
        return amount.to_string();
    };
    let whole = amount / factor;
    let frac = amount % factor;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}

/// Serde helper: (de)serialize an [`Amount`] as a decimal string.
///
/// JSON numbers lose precision past 2^53 in most clients, and a 10^29
/// supply is well past that.
pub mod amount_string {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<Amount>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_and_fractional() {
        assert_eq!(parse_units("1", 18).unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(parse_units("1.5", 18).unwrap(), 1_500_000_000_000_000_000);
        assert_eq!(parse_units(".25", 2).unwrap(), 25);
        assert_eq!(parse_units("3.", 2).unwrap(), 300);
        assert_eq!(parse_units("0.000000000000000001", 18).unwrap(), 1);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_units("", 18), Err(UnitsError::Empty));
        assert_eq!(parse_units(".", 18), Err(UnitsError::Empty));
        assert!(matches!(parse_units("-1", 18), Err(UnitsError::InvalidDigit(_))));
        assert!(matches!(parse_units("1.2.3", 18), Err(UnitsError::InvalidDigit(_))));
        assert!(matches!(parse_units("1e18", 18), Err(UnitsError::InvalidDigit(_))));
    }

    #[test]
    fn parse_rejects_excess_precision() {
        assert_eq!(
            parse_units("1.234", 2),
            Err(UnitsError::TooPrecise {
                given: 3,
                decimals: 2
            })
        );
    }

    #[test]
    fn parse_detects_overflow() {
        // u128::MAX has 39 digits; scaling by 10^18 cannot fit.
        let huge = Amount::MAX.to_string();
        assert!(matches!(parse_units(&huge, 18), Err(UnitsError::Overflow(_))));
        assert_eq!(parse_units(&huge, 0).unwrap(), Amount::MAX);
    }

    #[test]
    fn format_trims_trailing_zeros() {
        assert_eq!(format_units(1_500_000_000_000_000_000, 18), "1.5");
        assert_eq!(format_units(2_000_000_000_000_000_000, 18), "2");
        assert_eq!(format_units(1, 18), "0.000000000000000001");
        assert_eq!(format_units(0, 18), "0");
    }

    #[test]
    fn to_base_units_scales_and_checks() {
        assert_eq!(to_base_units(50, 18).unwrap(), 50 * 10u128.pow(18));
        assert!(to_base_units(Amount::MAX, 1).is_err());
        assert_eq!(to_base_units(1, 39), Err(UnitsError::UnsupportedDecimals(39)));
    }

    #[test]
    fn initial_supply_formats_as_whole_tokens() {
        let supply = to_base_units(100_000_000_000, 18).unwrap();
        assert_eq!(format_units(supply, 18), "100000000000");
        assert_eq!(parse_units("100000000000", 18).unwrap(), supply);
    }
}
