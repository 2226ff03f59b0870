use num_bigint::BigUint;
use std::cmp::Ordering;

// Wide enough for any token decimals (0-18 accepted) plus threshold strings
pub(crate) const COMPARE_SCALE: u8 = 36;

/// Convert a raw integer balance to its exact decimal representation.
///
/// Integer division by 10^decimals, fractional part zero-padded to
/// `decimals` digits, then trailing zeros and a trailing point stripped.
/// Exact for balances up to 2^256 - 1; no floating point anywhere.
pub fn normalize(raw: &BigUint, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }

    let divisor = BigUint::from(10u8).pow(decimals as u32);
    let integer = raw / &divisor;
    let fraction = raw % &divisor;

    if fraction == BigUint::from(0u8) {
        return integer.to_string();
    }

    let mut fraction = format!(
        "{:0>width$}",
        fraction.to_string(),
        width = decimals as usize
    );
    while fraction.ends_with('0') {
        fraction.pop();
    }

    format!("{}.{}", integer, fraction)
}

/// Exact inverse of [`normalize`]: parse a decimal string back into raw
/// base units. Returns `None` for malformed input or a fractional part
/// longer than `decimals`.
pub fn parse_units(value: &str, decimals: u8) -> Option<BigUint> {
    let (integer, fraction) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };

    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if fraction.len() > decimals as usize {
        return None;
    }

    let scale = BigUint::from(10u8).pow(decimals as u32);
    let integer_part = if integer.is_empty() {
        BigUint::from(0u8)
    } else {
        BigUint::parse_bytes(integer.as_bytes(), 10)?
    };

    let fraction_part = if fraction.is_empty() {
        BigUint::from(0u8)
    } else {
        // Right-pad to `decimals` digits: "5" at 18 decimals is 5 * 10^17
        let padding = BigUint::from(10u8).pow((decimals as usize - fraction.len()) as u32);
        BigUint::parse_bytes(fraction.as_bytes(), 10)? * padding
    };

    Some(integer_part * scale + fraction_part)
}

/// Compare two decimal strings exactly, by scaling both to a common
/// fixed-point representation. Returns `None` when either side is
/// malformed.
pub fn cmp_decimal(a: &str, b: &str) -> Option<Ordering> {
    let a = parse_units(a, COMPARE_SCALE)?;
    let b = parse_units(b, COMPARE_SCALE)?;
    Some(a.cmp(&b))
}
