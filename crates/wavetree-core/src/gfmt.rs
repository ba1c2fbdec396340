//! A Rust implementation of C's `%g` general floating-point format.
//!
//! The source's text persistence format is written with `fprintf(..., "%.9g", ...)`
//! and `fprintf(..., "%.10g", ...)`. Rust's built-in formatters only offer
//! fixed-point (`{:.N}`) or scientific (`{:.N e}`) notation, neither of
//! which match `%g` byte-for-byte, so the wire format needs this helper
//! rather than either built-in.
//!
//! `%g` with precision `P` picks scientific notation when the decimal
//! exponent is `< -4` or `>= P`, and fixed-point notation otherwise; in
//! both cases trailing zeros (and a bare trailing `.`) are stripped.

/// Format `value` the way C's `printf("%.*g", precision, value)` would.
#[must_use]
pub fn format_g(value: f64, precision: usize) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() {
            "-0".to_string()
        } else {
            "0".to_string()
        };
    }
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }

    let precision = precision.max(1);
    // Round and renormalise through Rust's own scientific formatter so the
    // exponent reflects any carry from rounding (e.g. 9.9999 -> 1.00e1).
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exp_str) = sci
        .split_once('e')
        .expect("Rust's scientific formatter always emits an exponent");
    let exponent: i32 = exp_str.parse().expect("exponent is always an integer");

    if exponent < -4 || exponent >= precision as i32 {
        let mantissa = trim_trailing(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_trailing(&format!("{value:.decimals$}"))
    }
}

fn trim_trailing(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_values_drop_the_decimal_point() {
        assert_eq!(format_g(1.0, 9), "1");
        assert_eq!(format_g(-2.0, 10), "-2");
        assert_eq!(format_g(0.0, 9), "0");
    }

    #[test]
    fn trims_trailing_zeros_in_fixed_notation() {
        assert_eq!(format_g(0.5, 9), "0.5");
        assert_eq!(format_g(3.140_000, 9), "3.14");
    }

    #[test]
    fn switches_to_scientific_outside_the_exponent_window() {
        assert_eq!(format_g(0.00001234, 9), "1.234e-05");
        assert_eq!(format_g(123_400_000_000.0, 9), "1.234e+11");
    }

    #[test]
    fn full_precision_matches_pi() {
        assert_eq!(format_g(std::f64::consts::PI, 9), "3.14159265");
        assert_eq!(format_g(std::f64::consts::PI, 10), "3.141592654");
    }

    #[test]
    fn negative_values_round_trip() {
        assert_eq!(format_g(-0.125, 9), "-0.125");
    }
}
