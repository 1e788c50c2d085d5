//! Request-level failure taxonomy
//!
//! Every failure that ends a request maps to exactly one [`SyncFailure`]
//! variant. The variant decides how the failure is logged and whether an
//! external redelivery policy may retry; nothing is retried inside the engine.

use std::fmt;
use std::time::Duration;

use eventsync_common::error::{ErrorClassification, ErrorSeverity};
use eventsync_common::validation::ValidationError;
use eventsync_domain::{CorrelationKey, EventSyncError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reconcile::ApplyReport;

#[derive(Debug, Error)]
pub enum SyncFailure {
    #[error("invalid synchronization request: {0}")]
    Validation(#[from] ValidationError),

    #[error("authorization failed for organisation '{organisation}': {source}")]
    Authorization { organisation: String, source: EventSyncError },

    #[error("reading {what} failed: {source}")]
    TransientRead { what: &'static str, source: EventSyncError },

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    PartialFailure(#[from] PartialFailure),

    #[error("synchronization aborted: {0}")]
    Fatal(EventSyncError),
}

impl SyncFailure {
    /// Stable, machine-readable name of the failure kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Authorization { .. } => "authorization",
            Self::TransientRead { .. } => "transient_read",
            Self::NotFound(_) => "not_found",
            Self::PartialFailure(_) => "partial_failure",
            Self::Fatal(_) => "fatal",
        }
    }

    /// Classify a failed read on behalf of `organisation`. Transient
    /// store/provider errors stay retryable; anything else ends the request
    /// for good.
    pub fn from_read(what: &'static str, organisation: &str, error: EventSyncError) -> Self {
        match error {
            e if e.is_transient() => Self::TransientRead { what, source: e },
            EventSyncError::NotFound(message) => Self::NotFound(format!("{what}: {message}")),
            e @ EventSyncError::Auth(_) => {
                Self::Authorization { organisation: organisation.to_string(), source: e }
            }
            other => Self::Fatal(other),
        }
    }
}

impl ErrorClassification for SyncFailure {
    fn is_retryable(&self) -> bool {
        match self {
            Self::TransientRead { .. } => true,
            Self::PartialFailure(partial) => partial.failures.iter().any(|f| f.error.is_transient()),
            Self::Validation(_) | Self::Authorization { .. } | Self::NotFound(_) | Self::Fatal(_) => {
                false
            }
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation(_) | Self::TransientRead { .. } => ErrorSeverity::Warning,
            Self::NotFound(_) | Self::PartialFailure(_) => ErrorSeverity::Error,
            Self::Authorization { .. } | Self::Fatal(_) => ErrorSeverity::Critical,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TransientRead { source, .. } => source.retry_after(),
            Self::PartialFailure(partial) => {
                partial.failures.iter().filter_map(|f| f.error.retry_after()).max()
            }
            _ => None,
        }
    }
}

/// Remote write performed by the apply engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Remove,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// One remote write that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedOperation {
    pub kind: OperationKind,
    pub key: Option<CorrelationKey>,
    pub event_id: Option<String>,
    pub summary: String,
    pub error: EventSyncError,
}

impl fmt::Display for FailedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.kind)?;
        match (&self.key, &self.event_id) {
            (Some(key), _) => write!(f, "activity {key}")?,
            (None, Some(id)) => write!(f, "event {id}")?,
            (None, None) => write!(f, "'{}'", self.summary)?,
        }
        write!(f, ": {}", self.error)
    }
}

/// Some remote writes failed. Successful writes are kept; the report shows
/// what was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFailure {
    pub report: ApplyReport,
    pub failures: Vec<FailedOperation>,
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attempted = self.report.applied() + self.failures.len();
        write!(f, "{} of {attempted} remote operations failed: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PartialFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(error: EventSyncError) -> FailedOperation {
        FailedOperation {
            kind: OperationKind::Create,
            key: Some(CorrelationKey::new(3)),
            event_id: None,
            summary: "Midsommar".into(),
            error,
        }
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(SyncFailure::NotFound("org".into()).label(), "not_found");
        assert_eq!(SyncFailure::Validation(ValidationError::new()).label(), "validation");
        assert_eq!(SyncFailure::Fatal(EventSyncError::Internal("x".into())).label(), "fatal");
    }

    #[test]
    fn read_errors_are_classified() {
        let transient =
            SyncFailure::from_read("activities", "Mithlond", EventSyncError::Database("busy".into()));
        assert_eq!(transient.label(), "transient_read");
        assert!(transient.is_retryable());

        let missing =
            SyncFailure::from_read("remote events", "Mithlond", EventSyncError::NotFound("cal".into()));
        assert_eq!(missing.label(), "not_found");
        assert!(!missing.is_retryable());

        let denied =
            SyncFailure::from_read("remote events", "Mithlond", EventSyncError::Auth("401".into()));
        assert_eq!(denied.label(), "authorization");
        assert!(denied.to_string().contains("'Mithlond'"));

        let malformed = SyncFailure::from_read(
            "remote events",
            "Mithlond",
            EventSyncError::InvalidInput("bad".into()),
        );
        assert_eq!(malformed.label(), "fatal");
    }

    #[test]
    fn partial_failure_retryability_follows_items() {
        let permanent = PartialFailure {
            report: ApplyReport::default(),
            failures: vec![failed(EventSyncError::InvalidInput("bad".into()))],
        };
        assert!(!SyncFailure::from(permanent).is_retryable());

        let throttled = PartialFailure {
            report: ApplyReport::default(),
            failures: vec![failed(EventSyncError::rate_limited(
                "quota",
                Some(Duration::from_secs(20)),
            ))],
        };
        let failure = SyncFailure::from(throttled);
        assert!(failure.is_retryable());
        assert_eq!(failure.retry_after(), Some(Duration::from_secs(20)));
    }

    #[test]
    fn partial_failure_message_lists_items() {
        let partial = PartialFailure {
            report: ApplyReport { created: 2, ..ApplyReport::default() },
            failures: vec![failed(EventSyncError::Network("reset".into()))],
        };
        assert_eq!(
            partial.to_string(),
            "1 of 3 remote operations failed: create activity 3: Network error: reset"
        );
    }
}
