//! End-to-end behaviour of the synchronization service against in-memory
//! ports.

mod support;

use chrono::Duration;
use chrono_tz::Europe::Stockholm;
use eventsync_common::error::ErrorClassification;
use eventsync_core::sync::{decode_request, OperationKind, SyncFailure, SyncReport, SyncSettings};
use eventsync_domain::{
    local_to_utc, CorrelationKey, EventStatus, EventSyncError, SynchronizationRequest,
    WindowBoundaryPolicy,
};
use support::fixtures::{activity, at, deployment, request_message};
use support::harness::{foreign_event, synced_event, Harness};

fn request() -> SynchronizationRequest {
    decode_request(&request_message()).unwrap()
}

#[tokio::test]
async fn creates_missing_and_leaves_current_and_foreign_events() {
    let a1 = activity(1, 10, 11);
    let a2 = activity(2, 14, 15);
    let e1 = synced_event(&a1, "e1");
    let e3 = foreign_event("e3", 9, 10);
    let harness = Harness::new(vec![a1, a2], vec![e1.clone(), e3.clone()]);

    let report = harness.service.synchronize(&request()).await.unwrap();

    assert_eq!(
        report,
        SyncReport { created: 1, unchanged: 1, foreign: 1, ..SyncReport::default() }
    );
    assert_eq!(harness.calendar.event("e1"), Some(e1));
    assert_eq!(harness.calendar.event("e3"), Some(e3));
    let created: Vec<_> = harness
        .calendar
        .events()
        .into_iter()
        .filter(|e| e.correlation_key() == Some(CorrelationKey::new(2)))
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].start, local_to_utc(at(14), Stockholm));
}

#[tokio::test]
async fn moved_activity_updates_event_in_place() {
    let original = activity(1, 10, 11);
    let moved = activity(1, 12, 13);
    let harness = Harness::new(vec![moved], vec![synced_event(&original, "e1")]);

    let report = harness.service.synchronize(&request()).await.unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.created + report.removed, 0);
    let events = harness.calendar.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id.as_deref(), Some("e1"));
    assert_eq!(events[0].start, local_to_utc(at(12), Stockholm));
    assert_eq!(events[0].end, local_to_utc(at(13), Stockholm));
}

#[tokio::test]
async fn event_without_activity_is_removed() {
    let harness = Harness::new(Vec::new(), vec![synced_event(&activity(1, 10, 11), "e1")]);

    let report = harness.service.synchronize(&request()).await.unwrap();

    assert_eq!(report.removed, 1);
    assert!(harness.calendar.events().is_empty());
}

#[tokio::test]
async fn second_run_without_local_changes_writes_nothing() {
    let activities = vec![activity(1, 10, 11), activity(2, 14, 15), activity(3, 18, 20)];
    let harness = Harness::new(activities, vec![foreign_event("x", 8, 9)]);

    let first = harness.service.synchronize(&request()).await.unwrap();
    assert_eq!(first.created, 3);
    let writes = harness.calendar.writes();

    let second = harness.service.synchronize(&request()).await.unwrap();
    assert_eq!(
        second,
        SyncReport { unchanged: 3, foreign: 1, ..SyncReport::default() }
    );
    assert_eq!(harness.calendar.writes(), writes);
}

#[tokio::test]
async fn deleted_event_without_activity_is_not_removed_again() {
    let mut deleted = synced_event(&activity(1, 10, 11), "e1");
    deleted.status = EventStatus::Cancelled;
    let harness = Harness::new(Vec::new(), vec![deleted]);

    let report = harness.service.synchronize(&request()).await.unwrap();

    assert_eq!(report, SyncReport::default());
    assert_eq!(harness.calendar.writes(), 0);
}

#[tokio::test]
async fn deleted_event_of_live_activity_is_restored() {
    let a1 = activity(1, 10, 11);
    let mut deleted = synced_event(&a1, "e1");
    deleted.status = EventStatus::Cancelled;
    let harness = Harness::new(vec![a1], vec![deleted]);

    let report = harness.service.synchronize(&request()).await.unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(harness.calendar.event("e1").unwrap().status, EventStatus::Confirmed);
}

#[tokio::test]
async fn foreign_events_are_never_touched() {
    let mut garbled = foreign_event("garbled", 12, 13);
    garbled.private_properties.insert("activityId".into(), "not-a-number".into());
    let foreign = vec![foreign_event("f1", 8, 9), foreign_event("f2", 10, 11), garbled];
    let harness = Harness::new(vec![activity(1, 10, 11)], foreign.clone());

    let report = harness.service.synchronize(&request()).await.unwrap();

    assert_eq!(report.foreign, 3);
    assert_eq!(report.removed, 0);
    for event in foreign {
        assert_eq!(harness.calendar.event(event.id.as_deref().unwrap()), Some(event));
    }
}

#[tokio::test]
async fn one_failed_create_does_not_stop_the_others() {
    let activities = vec![activity(1, 10, 11), activity(2, 12, 13), activity(3, 14, 15)];
    let harness = Harness::new(activities, Vec::new());
    harness.calendar.fail_writes_for("Activity 2");

    let failure = harness.service.synchronize(&request()).await.unwrap_err();

    let SyncFailure::PartialFailure(partial) = &failure else {
        panic!("expected a partial failure, got {failure:?}");
    };
    assert_eq!(partial.report.created, 2);
    assert_eq!(partial.failures.len(), 1);
    assert_eq!(partial.failures[0].kind, OperationKind::Create);
    assert_eq!(partial.failures[0].key, Some(CorrelationKey::new(2)));
    assert!(failure.is_retryable());
    assert_eq!(harness.calendar.events().len(), 2);

    // A retry only attempts what is still missing.
    let writes = harness.calendar.writes();
    let again = harness.service.synchronize(&request()).await.unwrap_err();
    assert_eq!(again.label(), "partial_failure");
    assert_eq!(harness.calendar.writes(), writes + 1);
    assert_eq!(harness.calendar.events().len(), 2);
}

#[tokio::test]
async fn activities_with_inverted_interval_are_skipped_with_their_events() {
    let valid = activity(1, 10, 11);
    let mut broken = activity(2, 14, 15);
    broken.end_time = broken.start_time - Duration::hours(1);
    let stale = synced_event(&activity(2, 14, 15), "e2");
    let harness = Harness::new(vec![valid, broken], vec![stale.clone()]);

    let report = harness.service.synchronize(&request()).await.unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.created, 1);
    assert_eq!(report.removed, 0);
    assert_eq!(harness.calendar.event("e2"), Some(stale));
}

#[tokio::test]
async fn events_outside_the_boundary_policy_are_left_alone() {
    // Starts the evening before the requested day and ends inside it.
    let mut overnight = activity(5, 0, 1);
    overnight.start_time = at(23) - Duration::days(1);
    let event = synced_event(&overnight, "overnight");

    let mut settings = SyncSettings::new(deployment());
    settings.boundary_policy = WindowBoundaryPolicy::StartsWithin;
    let harness = Harness::with_settings(vec![overnight.clone()], vec![event.clone()], settings);

    let report = harness.service.synchronize(&request()).await.unwrap();
    assert_eq!(report, SyncReport::default());
    assert_eq!(harness.calendar.event("overnight"), Some(event.clone()));

    // The default policy selects it and finds it current.
    let harness = Harness::new(vec![overnight], vec![event]);
    let report = harness.service.synchronize(&request()).await.unwrap();
    assert_eq!(report.unchanged, 1);
}

#[tokio::test]
async fn activity_moved_into_the_window_updates_its_stale_event() {
    let mut overnight = activity(5, 0, 1);
    overnight.start_time = at(23) - Duration::days(1);
    let stale = synced_event(&overnight, "overnight");
    let moved = activity(5, 10, 11);

    let mut settings = SyncSettings::new(deployment());
    settings.boundary_policy = WindowBoundaryPolicy::StartsWithin;
    let harness = Harness::with_settings(vec![moved], vec![stale], settings);

    let report = harness.service.synchronize(&request()).await.unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 1);

    let keyed: Vec<_> = harness
        .calendar
        .events()
        .into_iter()
        .filter(|e| e.correlation_key() == Some(CorrelationKey::new(5)))
        .collect();
    assert_eq!(keyed.len(), 1);
    assert_eq!(keyed[0].id.as_deref(), Some("overnight"));
    assert_eq!(keyed[0].start, local_to_utc(at(10), Stockholm));
}

#[tokio::test]
async fn unknown_organisation_is_not_found() {
    let harness = Harness::new(Vec::new(), Vec::new());
    let mut request = request();
    request.organisation_name = "Lindon".into();

    let failure = harness.service.synchronize(&request).await.unwrap_err();
    assert!(matches!(failure, SyncFailure::NotFound(ref what) if what.contains("Lindon")));
    assert!(!failure.is_retryable());
}

#[tokio::test]
async fn calendar_of_another_deployment_is_not_found() {
    let harness = Harness::with_settings(
        Vec::new(),
        Vec::new(),
        SyncSettings::new("production".parse().unwrap()),
    );

    let failure = harness.service.synchronize(&request()).await.unwrap_err();
    assert_eq!(failure.label(), "not_found");
}

#[tokio::test]
async fn refused_authorization_aborts_before_reading() {
    let harness = Harness::new(vec![activity(1, 10, 11)], Vec::new());
    harness.provider.deny();

    let failure = harness.service.synchronize(&request()).await.unwrap_err();
    assert!(matches!(failure, SyncFailure::Authorization { ref organisation, .. } if organisation == "Mithlond"));
    assert_eq!(harness.calendar.writes(), 0);
}

#[tokio::test]
async fn store_outage_is_a_transient_read_failure() {
    let harness = Harness::new(vec![activity(1, 10, 11)], Vec::new());
    harness.store.fail_activity_reads();

    let failure = harness.service.synchronize(&request()).await.unwrap_err();
    assert!(matches!(failure, SyncFailure::TransientRead { what: "activities", .. }));
    assert!(failure.is_retryable());
    assert_eq!(harness.calendar.writes(), 0);
}

#[tokio::test]
async fn throttled_listing_keeps_retry_hint() {
    let harness = Harness::new(vec![activity(1, 10, 11)], Vec::new());
    harness.calendar.fail_listing_with(EventSyncError::rate_limited(
        "quota exceeded",
        Some(std::time::Duration::from_secs(30)),
    ));

    let failure = harness.service.synchronize(&request()).await.unwrap_err();
    assert_eq!(failure.label(), "transient_read");
    assert_eq!(failure.retry_after(), Some(std::time::Duration::from_secs(30)));
}

#[tokio::test]
async fn unknown_remote_calendar_is_not_found() {
    let harness = Harness::new(Vec::new(), Vec::new());
    harness.calendar.fail_listing_with(EventSyncError::NotFound("calendar".into()));

    let failure = harness.service.synchronize(&request()).await.unwrap_err();
    assert_eq!(failure.label(), "not_found");
}
