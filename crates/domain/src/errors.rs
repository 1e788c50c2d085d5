//! Error types used throughout EventSync

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for EventSync ports and adapters
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum EventSyncError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_secs: Option<u64>,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EventSyncError {
    /// Failures that may succeed on a later attempt without any change on our
    /// side: store hiccups, network errors, throttling and timeouts.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Network(_) | Self::RateLimited { .. } | Self::Timeout(_)
        )
    }

    /// Server-provided back-off hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after_secs, .. } => retry_after_secs.map(Duration::from_secs),
            _ => None,
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_secs: retry_after.map(|d| d.as_secs()),
        }
    }
}

/// Result type alias for EventSync operations
pub type Result<T> = std::result::Result<T, EventSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_variants() {
        assert!(EventSyncError::Network("reset".into()).is_transient());
        assert!(EventSyncError::Timeout("list".into()).is_transient());
        assert!(EventSyncError::rate_limited("slow down", None).is_transient());
        assert!(!EventSyncError::NotFound("calendar".into()).is_transient());
        assert!(!EventSyncError::Auth("bad key".into()).is_transient());
        assert!(!EventSyncError::InvalidInput("date".into()).is_transient());
    }

    #[test]
    fn rate_limit_carries_retry_after() {
        let err = EventSyncError::rate_limited("quota", Some(Duration::from_secs(30)));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(err.to_string(), "Rate limited: quota");
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&EventSyncError::NotFound("org".into())).unwrap();
        assert_eq!(json, r#"{"type":"NotFound","message":"org"}"#);
    }
}
