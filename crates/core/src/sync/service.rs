//! Synchronization of one validated request: resolve, read, reconcile,
//! apply.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use eventsync_common::time::with_deadline;
use eventsync_domain::{
    Activity, DeploymentTag, EventCalendar, EventStatus, EventSyncError, Organisation, RemoteEvent,
    SynchronizationRequest, WindowBoundaryPolicy,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::errors::SyncFailure;
use super::ports::{ActivityRepository, OrganisationRepository};
use crate::calendar_ports::{CalendarClientProvider, RemoteCalendar};
use crate::reconcile::{reconcile, ApplyEngine, ApplyReport, EventConverter, Reconciliation};

/// Tunables of the synchronization service.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Deployment whose calendars this process serves.
    pub deployment: DeploymentTag,
    pub boundary_policy: WindowBoundaryPolicy,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Remote writes in flight per request.
    pub write_concurrency: usize,
}

impl SyncSettings {
    pub fn new(deployment: DeploymentTag) -> Self {
        Self {
            deployment,
            boundary_policy: WindowBoundaryPolicy::default(),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(15),
            write_concurrency: 4,
        }
    }
}

/// Counts for one successfully synchronized request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub foreign: usize,
    /// Activities left out because their stored interval is invalid.
    pub skipped: usize,
}

pub struct SyncService {
    organisations: Arc<dyn OrganisationRepository>,
    activities: Arc<dyn ActivityRepository>,
    calendars: Arc<dyn CalendarClientProvider>,
    settings: SyncSettings,
}

impl SyncService {
    pub fn new(
        organisations: Arc<dyn OrganisationRepository>,
        activities: Arc<dyn ActivityRepository>,
        calendars: Arc<dyn CalendarClientProvider>,
        settings: SyncSettings,
    ) -> Self {
        Self { organisations, activities, calendars, settings }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    #[instrument(
        skip_all,
        fields(
            organisation = %request.organisation_name,
            calendar = %request.calendar_identifier
        )
    )]
    pub async fn synchronize(
        &self,
        request: &SynchronizationRequest,
    ) -> Result<SyncReport, SyncFailure> {
        let organisation_name = request.organisation_name.as_str();
        let (organisation, calendar) = self.resolve(request).await?;

        let client = self.calendars.calendar_for(organisation_name).await.map_err(|source| {
            SyncFailure::Authorization { organisation: organisation_name.to_string(), source }
        })?;

        let (activities, events) =
            self.read_both(request, &organisation, &calendar, client.as_ref()).await?;

        let (activities, events, skipped) = self.screen(request, &calendar, activities, events);
        debug!(
            activities = activities.len(),
            events = events.len(),
            skipped,
            "read local and remote state"
        );

        let converter = EventConverter::new(calendar.time_zone);
        let plan = reconcile(&converter, activities, events);
        let mut report = SyncReport {
            unchanged: plan.unchanged.len(),
            foreign: plan.foreign,
            skipped,
            ..SyncReport::default()
        };

        if plan.is_empty() {
            info!(unchanged = report.unchanged, foreign = report.foreign, "calendar already in sync");
            return Ok(report);
        }

        let applied = self.apply(&converter, client.as_ref(), &calendar, plan).await?;
        report.created = applied.created;
        report.updated = applied.updated;
        report.removed = applied.removed;

        info!(
            created = report.created,
            updated = report.updated,
            removed = report.removed,
            unchanged = report.unchanged,
            foreign = report.foreign,
            "calendar synchronized"
        );
        Ok(report)
    }

    async fn resolve(
        &self,
        request: &SynchronizationRequest,
    ) -> Result<(Organisation, EventCalendar), SyncFailure> {
        let name = request.organisation_name.as_str();

        let organisation = self
            .bounded_read("organisation", name, self.organisations.find_organisation_by_name(name))
            .await?
            .ok_or_else(|| SyncFailure::NotFound(format!("organisation '{name}'")))?;

        let lookup = self.organisations.find_event_calendar(
            organisation.id,
            &request.calendar_identifier,
            &self.settings.deployment,
        );
        let calendar = self.bounded_read("event calendar", name, lookup).await?.ok_or_else(|| {
            SyncFailure::NotFound(format!(
                "event calendar '{}' of '{name}' in deployment {}",
                request.calendar_identifier, self.settings.deployment
            ))
        })?;

        Ok((organisation, calendar))
    }

    /// Local and remote reads run concurrently; both must succeed.
    async fn read_both(
        &self,
        request: &SynchronizationRequest,
        organisation: &Organisation,
        calendar: &EventCalendar,
        client: &dyn RemoteCalendar,
    ) -> Result<(Vec<Activity>, Vec<RemoteEvent>), SyncFailure> {
        let name = organisation.name.as_str();
        let (local_start, local_end) = request.window.local_bounds();
        let (utc_start, utc_end) = request.window.utc_bounds(calendar.time_zone);
        let organisation_ids = [organisation.id];

        let local = self.bounded_read(
            "activities",
            name,
            self.activities.find_activities(
                &organisation_ids,
                local_start,
                local_end,
                self.settings.boundary_policy,
            ),
        );
        let remote = self.bounded_read(
            "remote events",
            name,
            client.list_events(&calendar.calendar_identifier, utc_start, utc_end),
        );

        futures::try_join!(local, remote)
    }

    /// A read bounded by the read timeout. Timeouts count as transient read
    /// failures.
    async fn bounded_read<T, F>(
        &self,
        what: &'static str,
        organisation: &str,
        read: F,
    ) -> Result<T, SyncFailure>
    where
        F: Future<Output = eventsync_domain::Result<T>>,
    {
        with_deadline(what, self.settings.read_timeout, read)
            .await
            .map_err(|e| EventSyncError::Timeout(e.to_string()))
            .and_then(|result| result)
            .map_err(|e| SyncFailure::from_read(what, organisation, e))
    }

    /// Drop activities that break the start/end invariant, together with
    /// their remote events, unclaimed keyed events the boundary policy does
    /// not select for this window, and deleted events no activity claims any
    /// more. Events claimed by a loaded activity always reach the differ.
    fn screen(
        &self,
        request: &SynchronizationRequest,
        calendar: &EventCalendar,
        activities: Vec<Activity>,
        events: Vec<RemoteEvent>,
    ) -> (Vec<Activity>, Vec<RemoteEvent>, usize) {
        let (valid, invalid): (Vec<_>, Vec<_>) =
            activities.into_iter().partition(|a| a.validate().is_ok());
        for activity in &invalid {
            warn!(
                activity = activity.id,
                start = %activity.start_time,
                end = %activity.end_time,
                "skipping activity with inverted interval"
            );
        }
        let skipped_keys: Vec<_> = invalid.iter().map(Activity::correlation_key).collect();
        let claimed_keys: HashSet<_> = valid.iter().map(Activity::correlation_key).collect();

        let (window_start, window_end) = request.window.utc_bounds(calendar.time_zone);
        let policy = self.settings.boundary_policy;
        let events = events
            .into_iter()
            .filter(|event| match event.correlation_key() {
                None => true,
                Some(key) if skipped_keys.contains(&key) => false,
                Some(key) if claimed_keys.contains(&key) => true,
                Some(_) if event.status == EventStatus::Cancelled => false,
                Some(_) => policy.admits(&event.start, &event.end, &window_start, &window_end),
            })
            .collect();

        (valid, events, invalid.len())
    }

    async fn apply(
        &self,
        converter: &EventConverter,
        client: &dyn RemoteCalendar,
        calendar: &EventCalendar,
        plan: Reconciliation,
    ) -> Result<ApplyReport, SyncFailure> {
        let to_create = plan.to_create.iter().map(|a| converter.to_remote_event(a)).collect();
        let to_update = plan
            .to_update
            .iter()
            .map(|pair| converter.apply_activity_to(&pair.existing, &pair.activity))
            .collect();

        let engine =
            ApplyEngine::new(self.settings.write_timeout, self.settings.write_concurrency);
        engine
            .synchronize(client, &calendar.calendar_identifier, to_create, to_update, plan.to_remove)
            .await
            .map_err(SyncFailure::from)
    }
}
