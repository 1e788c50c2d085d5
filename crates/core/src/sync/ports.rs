//! Port interfaces for request processing

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use eventsync_domain::{
    Activity, DeploymentTag, EventCalendar, InboundMessage, Organisation, Result,
    WindowBoundaryPolicy,
};

use super::errors::SyncFailure;

/// Read access to the authoritative activity store.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Activities of the given organisations whose `[start, end]` interval is
    /// selected by `policy` for the half-open window `[start, end)`, in local
    /// wall-clock time.
    async fn find_activities(
        &self,
        organisation_ids: &[i64],
        start: NaiveDateTime,
        end: NaiveDateTime,
        policy: WindowBoundaryPolicy,
    ) -> Result<Vec<Activity>>;
}

/// Read access to organisations and their event calendars.
#[async_trait]
pub trait OrganisationRepository: Send + Sync {
    async fn find_organisation_by_name(&self, name: &str) -> Result<Option<Organisation>>;

    async fn find_event_calendar(
        &self,
        organisation_id: i64,
        calendar_identifier: &str,
        environment: &DeploymentTag,
    ) -> Result<Option<EventCalendar>>;
}

/// Shared request channel consumed by the worker pool.
#[async_trait]
pub trait RequestQueue: Send + Sync {
    async fn enqueue(&self, message: &InboundMessage) -> Result<()>;

    /// Claim the next request for `worker_id`. A claimed request that is not
    /// acknowledged within `lease` becomes visible again.
    async fn dequeue(&self, worker_id: &str, lease: Duration) -> Result<Option<InboundMessage>>;

    /// Extend the lease `worker_id` holds on a claimed request to `lease`
    /// from now. Returns `false` when the worker no longer holds it.
    async fn renew_lease(&self, message_id: &str, worker_id: &str, lease: Duration)
        -> Result<bool>;

    /// Remove a processed request.
    async fn acknowledge(&self, message_id: &str) -> Result<()>;
}

/// Destination for requests that could not be processed.
///
/// Receives the original body and properties unchanged, together with the
/// failure that stopped processing.
#[async_trait]
pub trait FailureChannel: Send + Sync {
    async fn publish(&self, message: &InboundMessage, failure: &SyncFailure) -> Result<()>;
}
