//! Human-readable duration formatting
//!
//! The output is accepted back by [`parse_duration`](super::parse_duration),
//! so configuration can be echoed into logs in the same notation.

use std::time::Duration;

/// Format a duration into a human-readable string
///
/// ```
/// # #[cfg(feature = "runtime")]
/// # {
/// use std::time::Duration;
///
/// use eventsync_common::time::format::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(5)), "5s");
/// assert_eq!(format_duration(Duration::from_secs(3665)), "1h 1m 5s");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1s 500ms");
/// # }
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    let parts = [
        (total_secs / 86_400, "d"),
        ((total_secs % 86_400) / 3_600, "h"),
        ((total_secs % 3_600) / 60, "m"),
        (total_secs % 60, "s"),
        (u64::from(millis), "ms"),
    ];

    let rendered: Vec<String> = parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, suffix)| format!("{value}{suffix}"))
        .collect();

    if rendered.is_empty() {
        "0s".to_string()
    } else {
        rendered.join(" ")
    }
}
