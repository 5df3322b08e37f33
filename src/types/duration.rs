//! Go-style duration strings
//!
//! Accepts the format used by the issuance endpoint's `duration` query
//! parameter: an optional sign followed by one or more decimal numbers, each
//! with an optional fraction and a mandatory unit suffix, e.g. `"300ms"`,
//! `"-1.5h"` or `"2h45m"`. Valid units are `ns`, `us` (or `µs`), `ms`, `s`,
//! `m` and `h`.

use chrono::Duration;

use crate::types::TurnstileError;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "\u{00b5}s" | "\u{03bc}s" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

fn invalid(input: &str) -> TurnstileError {
    TurnstileError::InvalidInput(format!("invalid duration {:?}", input))
}

/// Parse a Go-style duration string into a signed duration.
pub fn parse_duration(input: &str) -> Result<Duration, TurnstileError> {
    let mut rest = input;
    let mut negative = false;

    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(invalid(input));
    }

    // Largest magnitude representable as i64 nanoseconds for this sign
    let limit: u128 = if negative {
        i64::MAX as u128 + 1
    } else {
        i64::MAX as u128
    };

    let mut total: u128 = 0;

    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_frac) = match after_int.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail.bytes().take_while(u8::is_ascii_digit).count();
                tail.split_at(frac_len)
            }
            None => ("", after_int),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid(input));
        }

        let unit_len = after_frac
            .char_indices()
            .find(|(_, c)| *c == '.' || c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(after_frac.len());
        if unit_len == 0 {
            return Err(TurnstileError::InvalidInput(format!(
                "missing unit in duration {:?}",
                input
            )));
        }
        let (unit, tail) = after_frac.split_at(unit_len);
        let scale = unit_nanos(unit).ok_or_else(|| {
            TurnstileError::InvalidInput(format!("unknown unit {:?} in duration {:?}", unit, input))
        })?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<u128>().map_err(|_| invalid(input))?
        };
        let mut value = whole.checked_mul(scale).ok_or_else(|| invalid(input))?;

        // Fractional digits beyond nanosecond precision cannot change the result
        let mut divisor: u128 = 1;
        let mut fraction: u128 = 0;
        for digit in frac_part.bytes().take(18) {
            fraction = fraction * 10 + u128::from(digit - b'0');
            divisor *= 10;
        }
        if fraction > 0 {
            value += fraction * scale / divisor;
        }

        total = total.checked_add(value).ok_or_else(|| invalid(input))?;
        if total > limit {
            return Err(invalid(input));
        }
        rest = tail;
    }

    let nanos = if negative {
        // limit allows exactly i64::MIN
        (-(total as i128)) as i64
    } else {
        total as i64
    };
    Ok(Duration::nanoseconds(nanos))
}
