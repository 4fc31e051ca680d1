//! Conversion between integer token amounts and decimal strings.

use crate::entities::U256;

/// One whole token expressed in base units (`10^decimals`).
pub fn unit_value(decimals: u32) -> U256 {
    U256::exp10(decimals as usize)
}

/// Render a base-unit amount as a decimal string, trimming trailing zeros.
///
/// `to_decimal_string(15_000, 4) == "1.5"`
pub fn to_decimal_string(amount: U256, decimals: u32) -> String {
    if decimals == 0 {
        return amount.to_string();
    }

    let unit = unit_value(decimals);
    let whole = amount / unit;
    let fraction = amount % unit;
    if fraction.is_zero() {
        return whole.to_string();
    }

    let digits = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
