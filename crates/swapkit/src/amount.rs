//! Conversion between human-readable decimal amounts and integer base units.

use num_bigint::BigUint;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("not a decimal number: {0}")]
    NotANumber(String),

    #[error("{amount} has more than {decimals} decimal places")]
    TooPrecise { amount: String, decimals: u8 },
}

/// Parse `"1.5"` with 6 decimals into `1500000`.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<BigUint, AmountError> {
    let amount = amount.trim();
    let (integer_part, fraction_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (integer_part.is_empty() && fraction_part.is_empty())
        || !all_digits(integer_part)
        || !all_digits(fraction_part)
    {
        return Err(AmountError::NotANumber(amount.to_string()));
    }

    let fraction = fraction_part.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(AmountError::TooPrecise {
            amount: amount.to_string(),
            decimals,
        });
    }

    let mut digits = String::with_capacity(integer_part.len() + decimals as usize);
    digits.push_str(integer_part);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat_n('0', decimals as usize - fraction.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(BigUint::from(0u8));
    }
    digits
        .parse::<BigUint>()
        .map_err(|_| AmountError::NotANumber(amount.to_string()))
}

/// Render base units as a decimal string: `1500000` with 6 decimals is
/// `"1.5"`. Trailing fractional zeros are dropped, zero renders as `"0"`.
pub fn format_units(amount: &BigUint, decimals: u8) -> String {
    let scale = decimals as usize;
    let raw = amount.to_string();
    let padded = format!("{raw:0>width$}", width = scale + 1);
    let (whole, fraction) = padded.split_at(padded.len() - scale);
    match fraction.trim_end_matches('0') {
        "" => whole.to_string(),
        fraction => format!("{whole}.{fraction}"),
    }
}

/// [`format_units`] over a decimal base-unit string, as carried in
/// allowance records and route responses.
pub fn format_base_units(amount: &str, decimals: u8) -> Result<String, AmountError> {
    let value = amount
        .trim()
        .parse::<BigUint>()
        .map_err(|_| AmountError::NotANumber(amount.to_string()))?;
    Ok(format_units(&value, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_base_units() {
        assert_eq!(to_base_units("1.5", 6).unwrap(), BigUint::from(1_500_000u64));
        assert_eq!(to_base_units("1", 18).unwrap().to_string(), "1000000000000000000");
        assert_eq!(to_base_units(".25", 2).unwrap(), BigUint::from(25u64));
        assert_eq!(to_base_units("0.000123", 6).unwrap(), BigUint::from(123u64));
        assert_eq!(to_base_units("1.50", 1).unwrap(), BigUint::from(15u64));
        assert_eq!(to_base_units("0", 6).unwrap(), BigUint::from(0u64));
    }

    #[test]
    fn test_to_base_units_rejects() {
        assert!(matches!(to_base_units("abc", 6), Err(AmountError::NotANumber(_))));
        assert!(matches!(to_base_units("-1", 6), Err(AmountError::NotANumber(_))));
        assert!(matches!(to_base_units(".", 6), Err(AmountError::NotANumber(_))));
        assert!(matches!(
            to_base_units("0.1234567", 6),
            Err(AmountError::TooPrecise { .. })
        ));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(&BigUint::from(1_000_000u64), 6), "1");
        assert_eq!(format_units(&BigUint::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(&BigUint::from(500_000u64), 6), "0.5");
        assert_eq!(format_units(&BigUint::from(123u64), 6), "0.000123");
        assert_eq!(format_units(&BigUint::from(0u64), 18), "0");
        assert_eq!(format_units(&BigUint::from(42u64), 0), "42");
        assert_eq!(format_units(&BigUint::from(1_230_000_000_000_000_000u64), 18), "1.23");
    }

    #[test]
    fn test_format_base_units() {
        assert_eq!(format_base_units("2500000", 6).unwrap(), "2.5");
        assert_eq!(format_base_units("0", 6).unwrap(), "0");
        assert!(matches!(format_base_units("1.5", 6), Err(AmountError::NotANumber(_))));
        assert!(matches!(format_base_units("-1", 6), Err(AmountError::NotANumber(_))));
    }
}
