//! SQLite repositories, request inbox and dead-letter table against a real
//! database on disk.

mod support;

use std::sync::Arc;
use std::time::Duration;

use eventsync_core::sync::{
    ActivityRepository, FailureChannel, OrganisationRepository, RequestQueue, SyncFailure,
};
use eventsync_domain::{DeploymentTag, EventSyncError, WindowBoundaryPolicy};
use eventsync_infra::database::{
    SqliteActivityRepository, SqliteFailureChannel, SqliteOrganisationRepository,
    SqliteRequestQueue,
};
use support::{activity, at, day, deployment, event_calendar, organisation, request_message, TestDatabase};

async fn seeded() -> (TestDatabase, SqliteActivityRepository, SqliteOrganisationRepository) {
    let db = TestDatabase::new();
    let organisations = SqliteOrganisationRepository::new(Arc::clone(&db.manager));
    organisations.save_organisation(&organisation()).await.unwrap();
    organisations.save_event_calendar(&event_calendar()).await.unwrap();
    let activities = SqliteActivityRepository::new(Arc::clone(&db.manager));
    (db, activities, organisations)
}

#[tokio::test(flavor = "multi_thread")]
async fn activity_round_trips_with_admissions() {
    let (_db, activities, _) = seeded().await;
    let stored = activity(1, at(18), at(23));
    activities.save_activity(&stored).await.unwrap();

    let (start, end) = (day().and_hms_opt(0, 0, 0).unwrap(), at(0) + chrono::Duration::days(1));
    let loaded =
        activities.find_activities(&[1], start, end, WindowBoundaryPolicy::Intersects).await.unwrap();

    assert_eq!(loaded, vec![stored]);
}

#[tokio::test(flavor = "multi_thread")]
async fn saving_again_replaces_admissions() {
    let (_db, activities, _) = seeded().await;
    let mut stored = activity(1, at(18), at(23));
    activities.save_activity(&stored).await.unwrap();

    stored.admissions.truncate(1);
    stored.short_desc = "Renamed".into();
    activities.save_activity(&stored).await.unwrap();

    let loaded = activities
        .find_activities(&[1], at(0), at(23) + chrono::Duration::hours(1), WindowBoundaryPolicy::Intersects)
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].short_desc, "Renamed");
    assert_eq!(loaded[0].admissions.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn boundary_policies_select_overnight_activity_differently() {
    let (_db, activities, _) = seeded().await;
    // 22:00 the day before until 02:00 on the fixture day.
    let overnight = activity(1, at(22) - chrono::Duration::days(1), at(2));
    activities.save_activity(&overnight).await.unwrap();
    activities.save_activity(&activity(2, at(10), at(12))).await.unwrap();

    let (start, end) = (at(0), at(0) + chrono::Duration::days(1));
    let ids = |list: Vec<eventsync_domain::Activity>| list.into_iter().map(|a| a.id).collect::<Vec<_>>();

    let intersecting =
        activities.find_activities(&[1], start, end, WindowBoundaryPolicy::Intersects).await.unwrap();
    let starting =
        activities.find_activities(&[1], start, end, WindowBoundaryPolicy::StartsWithin).await.unwrap();
    let contained = activities
        .find_activities(&[1], start, end, WindowBoundaryPolicy::ContainedWithin)
        .await
        .unwrap();

    assert_eq!(ids(intersecting), vec![1, 2]);
    assert_eq!(ids(starting), vec![2]);
    assert_eq!(ids(contained), vec![2]);
}

#[tokio::test(flavor = "multi_thread")]
async fn activities_of_other_organisations_are_not_returned() {
    let (_db, activities, organisations) = seeded().await;
    let mut other = organisation();
    other.id = 2;
    other.name = "Imladris".into();
    organisations.save_organisation(&other).await.unwrap();

    let mut foreign = activity(5, at(10), at(11));
    foreign.organisation_id = 2;
    activities.save_activity(&foreign).await.unwrap();
    activities.save_activity(&activity(6, at(10), at(11))).await.unwrap();

    let loaded = activities
        .find_activities(&[1], at(0), at(23), WindowBoundaryPolicy::Intersects)
        .await
        .unwrap();
    assert_eq!(loaded.iter().map(|a| a.id).collect::<Vec<_>>(), vec![6]);
    assert!(activities
        .find_activities(&[], at(0), at(23), WindowBoundaryPolicy::Intersects)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn event_calendar_lookup_is_scoped_by_deployment() {
    let (_db, _, organisations) = seeded().await;

    let found = organisations.find_organisation_by_name("Mithlond").await.unwrap().unwrap();
    assert_eq!(found, organisation());
    assert!(organisations.find_organisation_by_name("Lindon").await.unwrap().is_none());

    let calendar = organisations
        .find_event_calendar(1, support::CALENDAR_ID, &deployment())
        .await
        .unwrap();
    assert_eq!(calendar, Some(event_calendar()));

    let production = DeploymentTag::new("Production").unwrap();
    let elsewhere =
        organisations.find_event_calendar(1, support::CALENDAR_ID, &production).await.unwrap();
    assert!(elsewhere.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn inbox_claims_each_request_once_until_lease_expires() {
    let db = TestDatabase::new();
    let inbox = SqliteRequestQueue::new(Arc::clone(&db.manager));
    let message = request_message();
    inbox.enqueue(&message).await.unwrap();

    let claimed = inbox.dequeue("worker-0", Duration::from_secs(60)).await.unwrap().unwrap();
    assert_eq!(claimed.id, message.id);
    assert_eq!(claimed.properties, message.properties);
    assert_eq!(claimed.delivery_count, 1);
    assert!(inbox.dequeue("worker-1", Duration::from_secs(60)).await.unwrap().is_none());

    inbox.acknowledge(&claimed.id).await.unwrap();
    assert_eq!(inbox.pending_count().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_lease_is_delivered_again() {
    let db = TestDatabase::new();
    let inbox = SqliteRequestQueue::new(Arc::clone(&db.manager));
    inbox.enqueue(&request_message()).await.unwrap();

    let first = inbox.dequeue("worker-0", Duration::ZERO).await.unwrap().unwrap();
    let second = inbox.dequeue("worker-1", Duration::from_secs(60)).await.unwrap().unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.delivery_count, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn renewed_lease_is_only_granted_to_its_holder() {
    let db = TestDatabase::new();
    let inbox = SqliteRequestQueue::new(Arc::clone(&db.manager));
    inbox.enqueue(&request_message()).await.unwrap();

    let claimed = inbox.dequeue("worker-0", Duration::ZERO).await.unwrap().unwrap();
    assert!(inbox.renew_lease(&claimed.id, "worker-0", Duration::from_secs(60)).await.unwrap());
    assert!(inbox.dequeue("worker-1", Duration::from_secs(60)).await.unwrap().is_none());
    assert!(!inbox.renew_lease(&claimed.id, "worker-1", Duration::from_secs(60)).await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn inbox_delivers_oldest_first() {
    let db = TestDatabase::new();
    let inbox = SqliteRequestQueue::new(Arc::clone(&db.manager));
    let mut older = request_message();
    older.received_at -= chrono::Duration::minutes(5);
    let newer = request_message();
    inbox.enqueue(&newer).await.unwrap();
    inbox.enqueue(&older).await.unwrap();

    let lease = Duration::from_secs(60);
    assert_eq!(inbox.dequeue("w", lease).await.unwrap().unwrap().id, older.id);
    assert_eq!(inbox.dequeue("w", lease).await.unwrap().unwrap().id, newer.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn dead_letters_keep_the_request_verbatim_and_can_be_resubmitted() {
    let db = TestDatabase::new();
    let inbox = SqliteRequestQueue::new(Arc::clone(&db.manager));
    let dead_letters = SqliteFailureChannel::new(Arc::clone(&db.manager));

    let mut message = request_message();
    message.delivery_count = 2;
    let failure = SyncFailure::NotFound("organisation 'Mithlond'".into());
    dead_letters.publish(&message, &failure).await.unwrap();

    let letters = dead_letters.list_dead_letters().await.unwrap();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].message.id, message.id);
    assert_eq!(letters[0].message.body, message.body);
    assert_eq!(letters[0].message.properties, message.properties);
    assert_eq!(letters[0].message.delivery_count, 2);
    assert_eq!(letters[0].failure_kind, "not_found");
    assert!(letters[0].failure_reason.contains("Mithlond"));

    dead_letters.resubmit(&message.id).await.unwrap();
    assert!(dead_letters.list_dead_letters().await.unwrap().is_empty());
    let redelivered = inbox.dequeue("worker-0", Duration::from_secs(60)).await.unwrap().unwrap();
    assert_eq!(redelivered.id, message.id);
    assert_eq!(redelivered.delivery_count, 1);

    let missing = dead_letters.resubmit(&message.id).await.unwrap_err();
    assert!(matches!(missing, EventSyncError::NotFound(_)));
}
