//! Remote calendar port interfaces
//!
//! The engine reaches the calendar provider only through these traits. The
//! bundled Google adapter lives in `eventsync-infra`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventsync_domain::{Credential, CredentialKey, RemoteEvent, Result, ServiceAccountSecret};

/// An authorized handle on one organisation's calendars.
#[async_trait]
pub trait RemoteCalendar: Send + Sync {
    /// Events overlapping `[time_min, time_max)`, following pagination.
    ///
    /// Throttling, 5xx responses, network errors and timeouts surface as
    /// transient errors (`EventSyncError::is_transient`); an unknown calendar
    /// as `NotFound`; rejected credentials as `Auth`.
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<RemoteEvent>>;

    /// Create an event; returns it with its provider identifier.
    async fn insert_event(&self, calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent>;

    /// Replace an existing event. `event.id` must be set.
    async fn update_event(&self, calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()>;
}

/// Hands out authorized calendar handles per organisation.
///
/// Implementations memoize credentials; see the credential cache in
/// `eventsync-infra`.
#[async_trait]
pub trait CalendarClientProvider: Send + Sync {
    async fn calendar_for(&self, organisation: &str) -> Result<Arc<dyn RemoteCalendar>>;
}

/// Organisation-scoped secret material (account identifier and private key).
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn lookup(&self, organisation: &str, service: &str) -> Result<ServiceAccountSecret>;
}

/// Performs the authorization handshake for one credential key.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, key: &CredentialKey) -> Result<Credential>;
}
