//! Conversions from external infrastructure errors into domain errors.

use std::time::Duration;

use eventsync_domain::EventSyncError;
use jsonwebtoken::errors::Error as JwtError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub EventSyncError);

impl From<InfraError> for EventSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<EventSyncError> for InfraError {
    fn from(value: EventSyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoEventSyncError {
    fn into_eventsync(self) -> EventSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → EventSyncError */
/* -------------------------------------------------------------------------- */

impl IntoEventSyncError for SqlError {
    fn into_eventsync(self) -> EventSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        EventSyncError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        EventSyncError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        EventSyncError::InvalidInput(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => EventSyncError::InvalidInput(format!(
                        "foreign key constraint violation: {message}"
                    )),
                    _ => EventSyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => EventSyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                EventSyncError::Internal(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                EventSyncError::Internal(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidQuery => EventSyncError::Internal("invalid SQL query".into()),
            other => EventSyncError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_eventsync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → EventSyncError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(EventSyncError::Database(format!("connection pool: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → EventSyncError */
/* -------------------------------------------------------------------------- */

impl IntoEventSyncError for HttpError {
    fn into_eventsync(self) -> EventSyncError {
        if self.is_timeout() {
            return EventSyncError::Timeout("HTTP request timed out".into());
        }

        if self.is_connect() {
            return EventSyncError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return status_error(status, None, String::new());
        }

        if self.is_decode() {
            return EventSyncError::Internal(format!("malformed provider response: {self}"));
        }

        EventSyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_eventsync())
    }
}

/// Map a non-success HTTP status to a domain error. `detail` is the response
/// body, used for the message and to spot quota errors reported as 403.
pub(crate) fn status_error(
    status: reqwest::StatusCode,
    retry_after: Option<Duration>,
    detail: String,
) -> EventSyncError {
    let code = status.as_u16();
    let mut message =
        format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
    if !detail.trim().is_empty() {
        message.push_str(": ");
        message.push_str(detail.trim());
    }

    match code {
        429 => EventSyncError::rate_limited(message, retry_after),
        403 if detail.to_ascii_lowercase().contains("ratelimitexceeded") => {
            EventSyncError::rate_limited(message, retry_after)
        }
        401 | 403 => EventSyncError::Auth(message),
        404 | 410 => EventSyncError::NotFound(message),
        408 => EventSyncError::Timeout(message),
        400..=499 => EventSyncError::InvalidInput(message),
        _ => EventSyncError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* jsonwebtoken::Error → EventSyncError */
/* -------------------------------------------------------------------------- */

impl From<JwtError> for InfraError {
    fn from(value: JwtError) -> Self {
        InfraError(EventSyncError::Auth(format!("cannot sign service account assertion: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error / serde_json::Error → EventSyncError */
/* -------------------------------------------------------------------------- */

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(EventSyncError::Internal(format!("I/O error: {value}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(EventSyncError::Internal(format!("JSON error: {value}")))
    }
}

/// Map a failed `spawn_blocking` join into a domain error.
pub fn map_join_error(err: JoinError) -> EventSyncError {
    if err.is_cancelled() {
        EventSyncError::Internal("blocking task cancelled".into())
    } else {
        EventSyncError::Internal(format!("blocking task failed: {err}"))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
