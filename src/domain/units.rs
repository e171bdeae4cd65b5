//! Unit conversion between human decimal amounts and wei

use alloy_primitives::utils::{parse_units, ParseUnits, UnitsError};
use alloy_primitives::U256;
use thiserror::Error;

const ETHER_DECIMALS: u8 = 18;

#[derive(Debug, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must not be negative")]
    Negative,
    #[error("invalid amount: {0}")]
    Units(#[from] UnitsError),
}

/// Parse a decimal string such as `"0.01"` into wei (18-decimal scaling)
pub fn parse_ether(input: &str) -> Result<U256, AmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AmountError::Empty);
    }
    match parse_units(input, ETHER_DECIMALS)? {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => Err(AmountError::Negative),
    }
}

/// Format wei as a trimmed decimal (`10^16` -> `"0.01"`)
pub fn format_ether(wei: U256) -> String {
    format_units(wei, ETHER_DECIMALS)
}

/// Format a base-unit amount with `decimals` places, trailing zeros trimmed
pub fn format_units(amount: U256, decimals: u8) -> String {
    let unit = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / unit;
    let frac = amount % unit;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac_str = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ether() {
        assert_eq!(
            parse_ether("0.01").unwrap(),
            U256::from(10_000_000_000_000_000u64)
        );
        assert_eq!(
            parse_ether("1.5").unwrap(),
            U256::from(1_500_000_000_000_000_000u64)
        );
        assert_eq!(parse_ether(" 2 ").unwrap(), U256::from(2_000_000_000_000_000_000u64));
    }

    #[test]
    fn test_parse_ether_rejects_garbage() {
        assert!(parse_ether("abc").is_err());
        assert!(matches!(parse_ether("  "), Err(AmountError::Empty)));
        assert!(matches!(parse_ether("-1"), Err(AmountError::Negative)));
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(U256::from(1_000_000_000_000_000_000u64)), "1");
        assert_eq!(format_ether(U256::from(1_500_000_000_000_000_000u64)), "1.5");
        assert_eq!(format_ether(U256::from(10_000_000_000_000_000u64)), "0.01");
        assert_eq!(format_ether(U256::ZERO), "0");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
    }
}
