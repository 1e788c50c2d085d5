#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Europe::Stockholm;
use eventsync_domain::{
    Activity, Admission, DatabaseConfig, DeploymentTag, EventCalendar, InboundMessage, Location,
    MessageProperties, Organisation,
};
use eventsync_infra::database::DbManager;
use tempfile::TempDir;

pub const ORGANISATION: &str = "Mithlond";
pub const CALENDAR_ID: &str = "events@group.calendar.google.com";
pub const DEPLOYMENT: &str = "Test";
pub const SERVICE_KEY_PEM: &str = include_str!("../fixtures/serviceKey.pem");

/// Temporary database with the schema applied. The directory lives as long
/// as the value.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let config = DatabaseConfig::new(temp_dir.path().join("eventsync.db"));
        let manager = DbManager::new(&config).expect("db manager should be created");
        manager.run_migrations().expect("schema should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

pub fn deployment() -> DeploymentTag {
    DeploymentTag::new(DEPLOYMENT).unwrap()
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 14).unwrap()
}

pub fn at(hour: u32) -> NaiveDateTime {
    day().and_hms_opt(hour, 0, 0).unwrap()
}

pub fn organisation() -> Organisation {
    Organisation { id: 1, name: ORGANISATION.into(), email_suffix: "mithlond.se".into() }
}

pub fn event_calendar() -> EventCalendar {
    EventCalendar {
        id: 10,
        organisation_id: 1,
        calendar_identifier: CALENDAR_ID.into(),
        environment: deployment(),
        short_desc: "Events".into(),
        full_desc: "Public events".into(),
        time_zone: Stockholm,
    }
}

pub fn activity(id: i64, start: NaiveDateTime, end: NaiveDateTime) -> Activity {
    Activity {
        id,
        organisation_id: 1,
        short_desc: format!("Activity {id}"),
        full_desc: format!("Description of activity {id}"),
        start_time: start,
        end_time: end,
        cancelled: false,
        location: Location {
            street: Some("Storgatan".into()),
            number: None,
            zip_code: "111 22".into(),
            city: "Stockholm".into(),
            country: "Sverige".into(),
        },
        address_short_description: "Klubbhuset".into(),
        address_category: "venue".into(),
        cost: 12_550,
        late_admission_cost: 15_000,
        currency: "SEK".into(),
        late_admission_date: day().pred_opt().unwrap(),
        last_admission_date: day(),
        dress_code: Some("Kavaj".into()),
        responsible_group: None,
        admissions: vec![
            Admission {
                alias: "Cirdan".into(),
                email_alias: "cirdan".into(),
                organisation_email_suffix: "mithlond.se".into(),
                responsible: true,
                note: Some("Brings the boats".into()),
            },
            Admission {
                alias: "Elrond".into(),
                email_alias: "elrond".into(),
                organisation_email_suffix: "imladris.se".into(),
                responsible: false,
                note: None,
            },
        ],
    }
}

/// A request for the fixture day.
pub fn request_message() -> InboundMessage {
    InboundMessage::new("{}", MessageProperties::new())
        .with_property("organisation_name", ORGANISATION)
        .with_property("start_time", "2024-09-14")
        .with_property("end_time", "2024-09-14")
        .with_property("active_membership_alias", "Cirdan")
        .with_property("active_membership_id", 7_i64)
        .with_property("calendar_identifier", CALENDAR_ID)
}

/// Lay out `<root>/<organisation>/google/calendar/` with the fixture key.
pub fn write_service_account(root: &Path, organisation: &str) {
    let dir = root.join(organisation).join("google").join("calendar");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("serviceAccountEmail.txt"), "svc@mithlond.iam.gserviceaccount.com\n")
        .unwrap();
    std::fs::write(dir.join("serviceKey.pem"), SERVICE_KEY_PEM).unwrap();
}
