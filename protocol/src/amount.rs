//! Token amounts.
//!
//! Balances, supplies, limits and fees are all unsigned 256-bit integers.
//! Negative values cannot be represented, so they are rejected at the only
//! place they can appear: when an amount is parsed from text.

use crate::error::ProtocolError;

/// A token amount in the smallest denomination.
pub type Amount = primitive_types::U256;

/// Parses a decimal or `0x`-prefixed hexadecimal amount.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidAmount`] for empty input, a leading `-`,
/// non-digit characters, or values that do not fit in 256 bits.
pub fn parse_amount(s: &str) -> Result<Amount, ProtocolError> {
    let trimmed = s.trim();
    let invalid = || ProtocolError::InvalidAmount(s.to_string());

    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(invalid());
    }

    match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => {
            if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            Amount::from_str_radix(hex, 16).map_err(|_| invalid())
        }
        None => {
            if !trimmed.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            Amount::from_dec_str(trimmed).map_err(|_| invalid())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex() {
        assert_eq!(parse_amount("262144").unwrap(), Amount::from(1u64 << 18));
        assert_eq!(parse_amount("0x40000").unwrap(), Amount::from(1u64 << 18));
        assert_eq!(parse_amount(" 7 ").unwrap(), Amount::from(7u64));
        assert_eq!(parse_amount("0").unwrap(), Amount::zero());
    }

    #[test]
    fn negative_and_garbage_rejected() {
        for bad in ["", "-1", "-0x10", "12a", "0x", "0xzz", "1.5"] {
            assert_eq!(
                parse_amount(bad),
                Err(ProtocolError::InvalidAmount(bad.to_string())),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn overflow_rejected() {
        let too_big = format!("1{}", "0".repeat(80));
        assert!(parse_amount(&too_big).is_err());
    }
}
