//! Deadline helper around [`tokio::time::timeout`].

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Returned when an operation does not finish before its deadline.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{operation} did not complete within {limit:?}")]
pub struct DeadlineExceeded {
    pub operation: &'static str,
    pub limit: Duration,
}

/// Run `future` with an upper bound on its duration.
///
/// The caller maps [`DeadlineExceeded`] into its own error type; whether an
/// expired deadline is fatal or per-item is the caller's decision.
pub async fn with_deadline<F, T>(
    operation: &'static str,
    limit: Duration,
    future: F,
) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, future).await.map_err(|_| DeadlineExceeded { operation, limit })
}
