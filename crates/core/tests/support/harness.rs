use std::sync::Arc;

use chrono_tz::Europe::Stockholm;
use eventsync_core::reconcile::EventConverter;
use eventsync_core::sync::{RequestConsumer, SyncService, SyncSettings};
use eventsync_domain::{Activity, RemoteEvent};

use super::fixtures::{deployment, event_calendar, organisation};
use super::mocks::{InMemoryStore, MockCalendar, MockProvider, RecordingFailureChannel};

/// A synchronization service wired to in-memory ports.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub calendar: Arc<MockCalendar>,
    pub provider: Arc<MockProvider>,
    pub failures: Arc<RecordingFailureChannel>,
    pub service: Arc<SyncService>,
}

impl Harness {
    pub fn new(activities: Vec<Activity>, events: Vec<RemoteEvent>) -> Self {
        Self::with_settings(activities, events, SyncSettings::new(deployment()))
    }

    pub fn with_settings(
        activities: Vec<Activity>,
        events: Vec<RemoteEvent>,
        settings: SyncSettings,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new(organisation(), event_calendar()));
        store.set_activities(activities);
        let calendar = Arc::new(MockCalendar::with_events(events));
        let provider = Arc::new(MockProvider::new(calendar.clone()));
        let service =
            Arc::new(SyncService::new(store.clone(), store.clone(), provider.clone(), settings));
        Self { store, calendar, provider, failures: Arc::default(), service }
    }

    pub fn consumer(&self) -> RequestConsumer {
        RequestConsumer::new(self.service.clone(), self.failures.clone())
    }
}

pub fn converter() -> EventConverter {
    EventConverter::new(Stockholm)
}

/// The event a previous run would have created for `activity`.
pub fn synced_event(activity: &Activity, id: &str) -> RemoteEvent {
    let mut event = converter().to_remote_event(activity);
    event.id = Some(id.to_string());
    event
}

/// An event created by someone else, inside the fixture day.
pub fn foreign_event(id: &str, start_hour: u32, end_hour: u32) -> RemoteEvent {
    let mut event = synced_event(&super::fixtures::activity(0, start_hour, end_hour), id);
    event.summary = "Board meeting".into();
    event.private_properties.clear();
    event.private_properties.insert("source".into(), "manual".into());
    event
}
