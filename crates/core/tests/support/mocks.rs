//! In-memory port implementations.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use eventsync_core::calendar_ports::{CalendarClientProvider, RemoteCalendar};
use eventsync_core::sync::{
    ActivityRepository, FailureChannel, OrganisationRepository, SyncFailure,
};
use eventsync_domain::{
    Activity, DeploymentTag, EventCalendar, EventSyncError, InboundMessage, Organisation,
    RemoteEvent, Result as DomainResult, WindowBoundaryPolicy,
};

/// Activities, organisations and calendars held in memory.
#[derive(Default)]
pub struct InMemoryStore {
    organisations: Mutex<Vec<Organisation>>,
    calendars: Mutex<Vec<EventCalendar>>,
    activities: Mutex<Vec<Activity>>,
    fail_activity_reads: AtomicBool,
}

impl InMemoryStore {
    pub fn new(organisation: Organisation, calendar: EventCalendar) -> Self {
        let store = Self::default();
        store.organisations.lock().unwrap().push(organisation);
        store.calendars.lock().unwrap().push(calendar);
        store
    }

    pub fn set_activities(&self, activities: Vec<Activity>) {
        *self.activities.lock().unwrap() = activities;
    }

    pub fn fail_activity_reads(&self) {
        self.fail_activity_reads.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActivityRepository for InMemoryStore {
    async fn find_activities(
        &self,
        organisation_ids: &[i64],
        start: NaiveDateTime,
        end: NaiveDateTime,
        policy: WindowBoundaryPolicy,
    ) -> DomainResult<Vec<Activity>> {
        if self.fail_activity_reads.load(Ordering::SeqCst) {
            return Err(EventSyncError::Database("database is locked".into()));
        }
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| organisation_ids.contains(&a.organisation_id))
            .filter(|a| policy.admits(&a.start_time, &a.end_time, &start, &end))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrganisationRepository for InMemoryStore {
    async fn find_organisation_by_name(&self, name: &str) -> DomainResult<Option<Organisation>> {
        Ok(self.organisations.lock().unwrap().iter().find(|o| o.name == name).cloned())
    }

    async fn find_event_calendar(
        &self,
        organisation_id: i64,
        calendar_identifier: &str,
        environment: &DeploymentTag,
    ) -> DomainResult<Option<EventCalendar>> {
        Ok(self
            .calendars
            .lock()
            .unwrap()
            .iter()
            .find(|c| {
                c.organisation_id == organisation_id
                    && c.calendar_identifier == calendar_identifier
                    && &c.environment == environment
            })
            .cloned())
    }
}

/// A remote calendar backed by a vector, with failure injection.
#[derive(Default)]
pub struct MockCalendar {
    events: Mutex<Vec<RemoteEvent>>,
    failing_summaries: Mutex<HashSet<String>>,
    list_error: Mutex<Option<EventSyncError>>,
    next_id: AtomicUsize,
    writes: AtomicUsize,
}

impl MockCalendar {
    pub fn with_events(events: Vec<RemoteEvent>) -> Self {
        let calendar = Self::default();
        *calendar.events.lock().unwrap() = events;
        calendar
    }

    /// Writes of events with this summary fail with a network error.
    pub fn fail_writes_for(&self, summary: &str) {
        self.failing_summaries.lock().unwrap().insert(summary.to_string());
    }

    pub fn fail_listing_with(&self, error: EventSyncError) {
        *self.list_error.lock().unwrap() = Some(error);
    }

    pub fn events(&self) -> Vec<RemoteEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event(&self, id: &str) -> Option<RemoteEvent> {
        self.events.lock().unwrap().iter().find(|e| e.id.as_deref() == Some(id)).cloned()
    }

    /// Successful and failed insert, update and delete calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self, event: &RemoteEvent) -> DomainResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing_summaries.lock().unwrap().contains(&event.summary) {
            return Err(EventSyncError::Network(format!("connection reset writing {}", event.summary)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCalendar for MockCalendar {
    async fn list_events(
        &self,
        _calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> DomainResult<Vec<RemoteEvent>> {
        if let Some(error) = self.list_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.start < time_max && e.end > time_min)
            .cloned()
            .collect())
    }

    async fn insert_event(&self, _calendar_id: &str, event: &RemoteEvent) -> DomainResult<RemoteEvent> {
        self.check_write(event)?;
        let mut created = event.clone();
        created.id = Some(format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.events.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_event(&self, _calendar_id: &str, event: &RemoteEvent) -> DomainResult<RemoteEvent> {
        self.check_write(event)?;
        let mut events = self.events.lock().unwrap();
        let slot = events
            .iter_mut()
            .find(|e| e.id.is_some() && e.id == event.id)
            .ok_or_else(|| EventSyncError::NotFound(format!("event {:?}", event.id)))?;
        *slot = event.clone();
        Ok(event.clone())
    }

    async fn delete_event(&self, _calendar_id: &str, event_id: &str) -> DomainResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.id.as_deref() != Some(event_id));
        if events.len() == before {
            return Err(EventSyncError::NotFound(format!("event {event_id}")));
        }
        Ok(())
    }
}

/// Hands out one shared calendar, or refuses authorization.
pub struct MockProvider {
    calendar: Arc<MockCalendar>,
    deny: AtomicBool,
}

impl MockProvider {
    pub fn new(calendar: Arc<MockCalendar>) -> Self {
        Self { calendar, deny: AtomicBool::new(false) }
    }

    pub fn deny(&self) {
        self.deny.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CalendarClientProvider for MockProvider {
    async fn calendar_for(&self, organisation: &str) -> DomainResult<Arc<dyn RemoteCalendar>> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(EventSyncError::Auth(format!("no service account for {organisation}")));
        }
        let calendar: Arc<dyn RemoteCalendar> = self.calendar.clone();
        Ok(calendar)
    }
}

/// A published failure as the failure channel saw it.
#[derive(Debug, Clone)]
pub struct RoutedMessage {
    pub message: InboundMessage,
    pub kind: &'static str,
    pub reason: String,
}

#[derive(Default)]
pub struct RecordingFailureChannel {
    routed: Mutex<Vec<RoutedMessage>>,
    reject: AtomicBool,
}

impl RecordingFailureChannel {
    pub fn routed(&self) -> Vec<RoutedMessage> {
        self.routed.lock().unwrap().clone()
    }

    pub fn reject_publishes(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FailureChannel for RecordingFailureChannel {
    async fn publish(&self, message: &InboundMessage, failure: &SyncFailure) -> DomainResult<()> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(EventSyncError::Database("dead letter table unavailable".into()));
        }
        self.routed.lock().unwrap().push(RoutedMessage {
            message: message.clone(),
            kind: failure.label(),
            reason: failure.to_string(),
        });
        Ok(())
    }
}
