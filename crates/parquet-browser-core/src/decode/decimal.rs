//! Decimal rendering from unscaled integers.

/// Widest byte-string decimal that fits an `i128`.
const MAX_DECIMAL_BYTES: usize = 16;

/// Interpret big-endian two's-complement bytes as a signed integer.
///
/// Returns `None` when the value is wider than 16 bytes.
pub(crate) fn unscaled_from_be_bytes(bytes: &[u8]) -> Option<i128> {
    if bytes.len() > MAX_DECIMAL_BYTES {
        return None;
    }
    let negative = bytes.first().is_some_and(|b| b & 0x80 != 0);
    let seed: i128 = if negative { -1 } else { 0 };
    Some(
        bytes
            .iter()
            .fold(seed, |acc, b| (acc << 8) | i128::from(*b)),
    )
}

/// Place the decimal point `scale` digits from the right.
pub(crate) fn format_decimal(unscaled: i128, scale: i32) -> String {
    if scale <= 0 {
        let zeros = "0".repeat(scale.unsigned_abs() as usize);
        return if unscaled == 0 {
            "0".to_string()
        } else {
            format!("{unscaled}{zeros}")
        };
    }

    let scale = scale as usize;
    let digits = unscaled.unsigned_abs().to_string();
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let sign = if unscaled < 0 { "-" } else { "" };
    format!("{sign}{int_part}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_unscaled_values() {
        assert_eq!(format_decimal(123, 2), "1.23");
        assert_eq!(format_decimal(-5, 3), "-0.005");
        assert_eq!(format_decimal(0, 2), "0.00");
        assert_eq!(format_decimal(42, 0), "42");
        assert_eq!(format_decimal(42, -2), "4200");
    }

    #[test]
    fn big_endian_twos_complement() {
        assert_eq!(unscaled_from_be_bytes(&[0x00, 0x7B]), Some(123));
        assert_eq!(unscaled_from_be_bytes(&[0xFF, 0x85]), Some(-123));
        assert_eq!(unscaled_from_be_bytes(&[]), Some(0));
        assert_eq!(unscaled_from_be_bytes(&[0u8; 17]), None);
    }
}
