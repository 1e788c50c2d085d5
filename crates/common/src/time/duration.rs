//! Duration parsing from strings
//!
//! Configuration files express timeouts and intervals as short strings such
//! as `"30s"`, `"250ms"` or `"1h 30m"`.

use std::time::Duration;

use thiserror::Error;

/// Error type for duration parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Duration overflow: {0}")]
    Overflow(String),

    #[error("Empty duration string")]
    EmptyString,
}

/// Parse a duration string into a Duration
///
/// Each component is an unsigned integer followed by a unit; components may
/// be separated by whitespace and are summed.
///
/// | unit | meaning |
/// |------|---------|
/// | `ms` | milliseconds |
/// | `s`  | seconds |
/// | `m`  | minutes |
/// | `h`  | hours |
/// | `d`  | days |
///
/// ```
/// # #[cfg(feature = "runtime")]
/// # {
/// use std::time::Duration;
///
/// use eventsync_common::time::duration::parse_duration;
///
/// assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
/// # }
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationParseError::EmptyString);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        rest = rest.trim_start();

        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(DurationParseError::InvalidFormat(format!(
                "expected a number at '{rest}'"
            )));
        }
        let (number, after_number) = rest.split_at(digits_end);
        let value: u64 =
            number.parse().map_err(|_| DurationParseError::InvalidNumber(number.to_string()))?;

        let unit_end = after_number
            .find(|c: char| c.is_ascii_digit() || c.is_whitespace())
            .unwrap_or(after_number.len());
        let (unit, after_unit) = after_number.split_at(unit_end);
        if unit.is_empty() {
            return Err(DurationParseError::InvalidFormat(format!(
                "missing unit after '{number}'"
            )));
        }

        let component = component_duration(value, unit)?;
        total = total
            .checked_add(component)
            .ok_or_else(|| DurationParseError::Overflow(s.to_string()))?;
        rest = after_unit;
    }

    Ok(total)
}

fn component_duration(value: u64, unit: &str) -> Result<Duration, DurationParseError> {
    let seconds_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        other => return Err(DurationParseError::UnknownUnit(other.to_string())),
    };
    value
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| DurationParseError::Overflow(format!("{value}{unit}")))
}
