//! Exact conversion between raw base-unit amounts and decimal display strings.

use thiserror::Error;

use crate::types::{RawAmount, UnitScale};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid character {0:?} in amount")]
    InvalidCharacter(char),
    #[error("amount has {found} fractional digits, scale allows {scale}")]
    TooPrecise { found: usize, scale: UnitScale },
    #[error("amount does not fit in 128 bits")]
    Overflow,
}

/// Formats `raw` base units with `scale` decimal places, trimming trailing zeros.
///
/// Pure integer arithmetic; never goes through floating point.
pub fn format_amount(raw: RawAmount, scale: UnitScale) -> String {
    if scale == 0 {
        return raw.to_string();
    }

    let (integer, fraction) = match 10u128.checked_pow(u32::from(scale)) {
        Some(divisor) => (raw / divisor, raw % divisor),
        // 10^scale exceeds u128::MAX, so every representable raw is below it
        None => (0, raw),
    };

    let padded = format!("{:0>width$}", fraction, width = usize::from(scale));
    let trimmed = padded.trim_end_matches('0');
    if trimmed.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{trimmed}")
    }
}

/// Lossy UI amount used for ranking only. Never compare these for correctness.
pub fn to_display_amount(raw: RawAmount, scale: UnitScale) -> f64 {
    raw as f64 / 10f64.powi(i32::from(scale))
}

/// Inverse of [`format_amount`]: parses a decimal string into base units.
pub fn parse_amount(text: &str, scale: UnitScale) -> Result<RawAmount, AmountError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }

    let (integer, fraction) = match text.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (text, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return Err(AmountError::Empty);
    }
    if let Some(bad) = integer
        .chars()
        .chain(fraction.chars())
        .find(|c| !c.is_ascii_digit())
    {
        return Err(AmountError::InvalidCharacter(bad));
    }
    if fraction.len() > usize::from(scale) {
        return Err(AmountError::TooPrecise {
            found: fraction.len(),
            scale,
        });
    }

    let mut raw: RawAmount = 0;
    let digits = integer
        .bytes()
        .chain(fraction.bytes())
        .chain(std::iter::repeat(b'0').take(usize::from(scale) - fraction.len()));
    for digit in digits {
        raw = raw
            .checked_mul(10)
            .and_then(|value| value.checked_add(RawAmount::from(digit - b'0')))
            .ok_or(AmountError::Overflow)?;
    }
    Ok(raw)
}
