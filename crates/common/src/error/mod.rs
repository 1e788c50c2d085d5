//! Error classification shared by every EventSync error type.
//!
//! Concrete error enums live next to the code that raises them; this module
//! only defines the vocabulary used to decide how a failure is reported and
//! whether an external redelivery policy may try again.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Classification contract implemented by error types that cross a crate
/// boundary.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if the same
    /// request is submitted again later:
    /// - Network timeouts
    /// - Rate limiting
    /// - Temporary service unavailability
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    ///
    /// Used for logging decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when the failing system told us how long to
    /// back off (e.g. a `Retry-After` header), `None` otherwise.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Error severity levels for logging and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flaky;

    impl ErrorClassification for Flaky {
        fn is_retryable(&self) -> bool {
            true
        }

        fn severity(&self) -> ErrorSeverity {
            ErrorSeverity::Warning
        }
    }

    #[test]
    fn default_methods_follow_severity() {
        assert!(Flaky.is_retryable());
        assert!(!Flaky.is_critical());
        assert_eq!(Flaky.retry_after(), None);
    }

    #[test]
    fn severity_ordering_and_display() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
        assert_eq!(serde_json::to_string(&ErrorSeverity::Error).unwrap(), "\"error\"");
    }
}
