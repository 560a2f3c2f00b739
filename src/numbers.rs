// ABOUTME: Token classification for integer and float literals across bases

use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, opt, recognize},
    IResult, Parser,
};

/// Inclusive lower bound of the evaluator's integer type.
pub const SIGNED_32_MIN: i128 = -(1i128 << 31);
/// Exclusive upper bound of the evaluator's integer type.
pub const SIGNED_32_MAX: i128 = 1i128 << 31;

/// Classification of a raw token. Integers are carried as `i128` so that
/// overlong literals survive to the range check instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i128),
    Float(f64),
}

pub fn in_signed_32(value: i128) -> bool {
    (SIGNED_32_MIN..SIGNED_32_MAX).contains(&value)
}

/// Classify a token with no surrounding whitespace.
///
/// Recognition precedence: float, base-prefixed integer (0b/0t/0x),
/// scientific-notation integer, plain decimal integer. Anything else is
/// not numeric and is left for the caller to treat as a symbol.
pub fn recognize_numeric(token: &str) -> Option<Numeric> {
    if all_consuming(float_literal).parse(token).is_ok() {
        return token.parse::<f64>().ok().map(Numeric::Float);
    }

    if let Some(value) = based_integer(token) {
        return Some(Numeric::Int(value));
    }

    if let Ok((_, (mantissa, exponent))) = all_consuming(scientific_literal).parse(token) {
        return Some(Numeric::Int(scientific_value(mantissa, exponent)));
    }

    if all_consuming(decimal_literal).parse(token).is_ok() {
        let digits: String = token.chars().filter(|c| *c != '_').collect();
        return digits.parse::<i128>().ok().map(Numeric::Int);
    }

    None
}

/// Handles: 3.14, -3.14, .5, -.5, 42.
fn float_literal(input: &str) -> IResult<&str, &str> {
    recognize((
        opt(one_of("+-")),
        alt((
            recognize((digit1, char('.'), opt(digit1))),
            recognize((char('.'), digit1)),
        )),
    ))
    .parse(input)
}

/// Handles: 1e3, -4E2, 2e+6, 17e-1 (integer mantissa and exponent only)
fn scientific_literal(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, mantissa) = recognize((opt(one_of("+-")), digit1)).parse(input)?;
    let (input, _) = one_of("eE")(input)?;
    let (input, exponent) = recognize((opt(one_of("+-")), digit1)).parse(input)?;
    Ok((input, (mantissa, exponent)))
}

/// Handles: 42, -42, +42, 1_000_000
fn decimal_literal(input: &str) -> IResult<&str, &str> {
    recognize((
        opt(one_of("+-")),
        digit1,
        take_while(|c: char| c.is_ascii_digit() || c == '_'),
    ))
    .parse(input)
}

/// Parse an `0b`/`0t`/`0x` literal (bases 2, 3, 16), optionally negated.
fn based_integer(token: &str) -> Option<i128> {
    let (negative, rest) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let (radix, digits) = if let Some(digits) = rest.strip_prefix("0b") {
        (2, digits)
    } else if let Some(digits) = rest.strip_prefix("0t") {
        (3, digits)
    } else if let Some(digits) = rest.strip_prefix("0x") {
        (16, digits)
    } else {
        return None;
    };

    if digits.is_empty() {
        return None;
    }

    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let value = i128::from_str_radix(&cleaned, radix).ok()?;
    Some(if negative { -value } else { value })
}

/// Evaluate `mantissa × 10^exponent` in integer arithmetic, saturating so
/// that overflowing literals fail the signed-32 range check downstream.
fn scientific_value(mantissa: &str, exponent: &str) -> i128 {
    let negative = mantissa.starts_with('-');
    let mantissa: i128 = mantissa
        .parse()
        .unwrap_or(if negative { i128::MIN } else { i128::MAX });
    if mantissa == 0 {
        return 0;
    }

    let exponent: i64 = exponent.parse().unwrap_or(i64::MAX);
    if exponent >= 0 {
        let mut value = mantissa;
        for _ in 0..exponent.min(40) {
            value = value.saturating_mul(10);
        }
        value
    } else {
        let mut value = mantissa;
        for _ in 0..exponent.unsigned_abs().min(40) {
            value /= 10;
            if value == 0 {
                break;
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_integers() {
        assert_eq!(recognize_numeric("42"), Some(Numeric::Int(42)));
        assert_eq!(recognize_numeric("-42"), Some(Numeric::Int(-42)));
        assert_eq!(recognize_numeric("+42"), Some(Numeric::Int(42)));
        assert_eq!(recognize_numeric("0"), Some(Numeric::Int(0)));
    }

    #[test]
    fn test_underscore_separators() {
        assert_eq!(recognize_numeric("1_000"), Some(Numeric::Int(1000)));
        assert_eq!(recognize_numeric("1_000_000"), Some(Numeric::Int(1_000_000)));
        // A leading separator is not a number.
        assert_eq!(recognize_numeric("_100"), None);
    }

    #[test]
    fn test_based_integers() {
        assert_eq!(recognize_numeric("0b1010"), Some(Numeric::Int(10)));
        assert_eq!(recognize_numeric("0t12"), Some(Numeric::Int(5)));
        assert_eq!(recognize_numeric("0xff"), Some(Numeric::Int(255)));
        assert_eq!(recognize_numeric("-0x10"), Some(Numeric::Int(-16)));
        assert_eq!(recognize_numeric("0b"), None);
        assert_eq!(recognize_numeric("0xzz"), None);
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(recognize_numeric("1e3"), Some(Numeric::Int(1000)));
        assert_eq!(recognize_numeric("-4E2"), Some(Numeric::Int(-400)));
        assert_eq!(recognize_numeric("2e+2"), Some(Numeric::Int(200)));
        // Negative exponents divide in integer arithmetic.
        assert_eq!(recognize_numeric("17e-1"), Some(Numeric::Int(1)));
        assert_eq!(recognize_numeric("1e-3"), Some(Numeric::Int(0)));
    }

    #[test]
    fn test_scientific_overflow_saturates_out_of_range() {
        match recognize_numeric("9e99") {
            Some(Numeric::Int(value)) => assert!(!in_signed_32(value)),
            other => panic!("expected saturated integer, got {:?}", other),
        }
    }

    #[test]
    fn test_floats() {
        assert_eq!(recognize_numeric("2.5"), Some(Numeric::Float(2.5)));
        assert_eq!(recognize_numeric("-2.5"), Some(Numeric::Float(-2.5)));
        assert_eq!(recognize_numeric(".5"), Some(Numeric::Float(0.5)));
        assert_eq!(recognize_numeric("42."), Some(Numeric::Float(42.0)));
    }

    #[test]
    fn test_float_takes_precedence_over_scientific() {
        // "1.5e3" matches neither rule fully and stays symbolic.
        assert_eq!(recognize_numeric("1.5e3"), None);
    }

    #[test]
    fn test_non_numeric_tokens() {
        assert_eq!(recognize_numeric("foo"), None);
        assert_eq!(recognize_numeric("+"), None);
        assert_eq!(recognize_numeric("-"), None);
        assert_eq!(recognize_numeric(""), None);
        assert_eq!(recognize_numeric("1.2.3"), None);
    }

    #[test]
    fn test_signed_32_range() {
        assert!(in_signed_32(2147483647));
        assert!(in_signed_32(-2147483648));
        assert!(!in_signed_32(2147483648));
        assert!(!in_signed_32(-2147483649));
    }
}
