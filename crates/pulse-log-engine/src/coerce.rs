use std::sync::LazyLock;

use pulse_core::MetricValue;
use regex::Regex;

/// Same class as `\d` in the rule patterns.
static DECIMAL_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{Nd}$").expect("decimal digit class is valid"));

/// Matched text that is neither an integer nor a decimal number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a number: '{0}'")]
pub struct CoerceError(pub String);

/// Convert a captured token into a number, integer first.
///
/// Integers: optional leading `-`, decimal digits only, must fit in `i64`.
/// Floats: optional leading `-`, digits with a single `.`, at least one digit.
/// Digits may come from any script (`٣`, `３`), since `\d` captures them.
/// Anything else (empty text, `+`, whitespace, exponents, `inf`, `NaN`) fails.
pub fn coerce(text: &str) -> Result<MetricValue, CoerceError> {
    let normalized = ascii_digits(text);
    let unsigned = normalized.strip_prefix('-').unwrap_or(&normalized);

    if !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(v) = normalized.parse::<i64>() {
            return Ok(MetricValue::Integer(v));
        }
        // Too wide for i64; still a valid decimal.
    }

    if is_decimal(unsigned) {
        if let Ok(v) = normalized.parse::<f64>() {
            if v.is_finite() {
                return Ok(MetricValue::Float(v));
            }
        }
    }

    Err(CoerceError(text.to_string()))
}

fn is_decimal(s: &str) -> bool {
    let mut digits = 0usize;
    let mut dots = 0usize;
    for b in s.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

/// Rewrite every decimal digit as its ASCII form, leaving other chars alone.
fn ascii_digits(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    text.chars()
        .map(|c| match digit_value(c) {
            Some(d) => char::from(b'0' + d),
            None => c,
        })
        .collect()
}

fn is_decimal_digit(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_digit();
    }
    DECIMAL_DIGIT.is_match(c.encode_utf8(&mut [0; 4]))
}

/// Value of a non-ASCII decimal digit.
///
/// Unicode lays out every `Nd` run contiguously starting at zero, so the
/// value is the offset from the start of the run, modulo ten.
fn digit_value(c: char) -> Option<u8> {
    if !is_decimal_digit(c) {
        return None;
    }
    let mut offset = 0u32;
    let mut code = c as u32;
    while let Some(prev) = code.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        offset += 1;
        code -= 1;
    }
    u8::try_from(offset % 10).ok()
}
