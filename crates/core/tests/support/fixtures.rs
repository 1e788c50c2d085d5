use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Europe::Stockholm;
use eventsync_domain::{
    Activity, Admission, DeploymentTag, EventCalendar, InboundMessage, Location,
    MessageProperties, Organisation,
};

pub const ORGANISATION: &str = "Mithlond";
pub const CALENDAR_ID: &str = "events@group.calendar.google.com";
pub const DEPLOYMENT: &str = "test";

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 14).unwrap()
}

pub fn at(hour: u32) -> NaiveDateTime {
    day().and_hms_opt(hour, 0, 0).unwrap()
}

pub fn deployment() -> DeploymentTag {
    DeploymentTag::new(DEPLOYMENT).unwrap()
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

/// An activity on the fixture day between the given local hours.
pub fn activity(id: i64, start_hour: u32, end_hour: u32) -> Activity {
    Activity {
        id,
        organisation_id: 1,
        short_desc: format!("Activity {id}"),
        full_desc: format!("Description of activity {id}"),
        start_time: at(start_hour),
        end_time: at(end_hour),
        cancelled: false,
        location: Location {
            street: Some("Storgatan".into()),
            number: Some("1".into()),
            zip_code: "111 22".into(),
            city: "Stockholm".into(),
            country: "Sverige".into(),
        },
        address_short_description: "Klubbhuset".into(),
        address_category: "venue".into(),
        cost: 15_000,
        late_admission_cost: 0,
        currency: "SEK".into(),
        late_admission_date: day(),
        last_admission_date: day(),
        dress_code: None,
        responsible_group: None,
        admissions: vec![Admission {
            alias: "Cirdan".into(),
            email_alias: "cirdan".into(),
            organisation_email_suffix: "mithlond.se".into(),
            responsible: true,
            note: None,
        }],
    }
}

/// A well-formed request covering the fixture day.
pub fn request_message() -> InboundMessage {
    InboundMessage::new("{\"trigger\":\"manual\"}", MessageProperties::new())
        .with_property("organisation_name", ORGANISATION)
        .with_property("start_time", "2024-09-14")
        .with_property("end_time", "2024-09-14")
        .with_property("active_membership_alias", "Cirdan")
        .with_property("active_membership_id", 7_i64)
        .with_property("calendar_identifier", CALENDAR_ID)
}
