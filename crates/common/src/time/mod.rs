//! Time utilities
//!
//! - **[`duration`]**: parsing human duration strings (`"30s"`, `"1h 30m"`)
//! - **[`format`]**: human-readable duration formatting
//! - **[`deadline`]**: bounding a future with a timeout
//! - **[`serde_duration`]**: serde adapter for durations written as strings
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "runtime")]
//! # {
//! use std::time::Duration;
//!
//! use eventsync_common::time::{format_duration, parse_duration};
//!
//! let formatted = format_duration(Duration::from_secs(3665));
//! assert_eq!(formatted, "1h 1m 5s");
//!
//! let duration = parse_duration("2h 30m").unwrap();
//! assert_eq!(duration, Duration::from_secs(9000));
//! # }
//! ```

pub mod deadline;
pub mod duration;
pub mod format;
pub mod serde_duration;

pub use deadline::{with_deadline, DeadlineExceeded};
pub use duration::{parse_duration, DurationParseError};
pub use format::format_duration;
