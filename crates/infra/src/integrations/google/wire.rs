//! Google Calendar v3 JSON shapes and their mapping to [`RemoteEvent`].

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use eventsync_domain::constants::EXT_ACTIVITY_ID;
use eventsync_domain::{
    local_to_utc, Attendee, CorrelationKey, EventStatus, EventSyncError, Reminder,
    ReminderMethod, RemoteEvent, Result,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventList {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    /// Calendar zone, used for all-day events.
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(default)]
    pub attendees: Vec<GoogleAttendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<GoogleReminders>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guests_can_modify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guests_can_invite_others: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<ExtendedProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    /// Set instead of `date_time` for all-day events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleAttendee {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub organizer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleReminders {
    #[serde(default)]
    pub use_default: bool,
    #[serde(default)]
    pub overrides: Vec<GoogleReminder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GoogleReminder {
    pub method: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ExtendedProperties {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub private: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub shared: BTreeMap<String, String>,
}

impl From<&RemoteEvent> for GoogleEvent {
    fn from(event: &RemoteEvent) -> Self {
        let properties = ExtendedProperties {
            private: event.private_properties.clone(),
            shared: event.shared_properties.clone(),
        };

        Self {
            id: event.id.clone(),
            summary: Some(event.summary.clone()),
            description: Some(event.description.clone()),
            location: Some(event.location.clone()),
            status: Some(event.status.to_string()),
            start: EventTime { date_time: Some(event.start.fixed_offset()), date: None },
            end: EventTime { date_time: Some(event.end.fixed_offset()), date: None },
            attendees: event
                .attendees
                .iter()
                .map(|a| GoogleAttendee {
                    email: a.email.clone(),
                    display_name: Some(a.display_name.clone()),
                    organizer: a.organizer,
                    response_status: Some(a.response_status.clone()),
                    comment: a.comment.clone(),
                })
                .collect(),
            reminders: Some(GoogleReminders {
                use_default: false,
                overrides: event
                    .reminders
                    .iter()
                    .map(|r| GoogleReminder { method: r.method.to_string(), minutes: r.minutes })
                    .collect(),
            }),
            guests_can_modify: Some(event.guests_can_modify),
            guests_can_invite_others: Some(event.guests_can_invite_others),
            extended_properties: Some(properties),
        }
    }
}

impl GoogleEvent {
    /// Whether the event carries an activity correlation key.
    pub fn is_correlated(&self) -> bool {
        self.extended_properties
            .as_ref()
            .and_then(|p| p.private.get(EXT_ACTIVITY_ID))
            .and_then(|v| CorrelationKey::from_property(v))
            .is_some()
    }

    /// Cancelled occurrences of recurring events come back with only an id,
    /// a status and `originalStartTime`.
    pub fn has_times(&self) -> bool {
        self.start.is_set() && self.end.is_set()
    }

    /// Convert a provider event. All-day dates are read as midnight in
    /// `zone`; unknown statuses and reminder methods are dropped to defaults.
    pub fn into_remote(self, zone: Tz) -> Result<RemoteEvent> {
        let label = self.id.clone().unwrap_or_else(|| "<unsaved>".to_string());
        let start = self.start.resolve(zone).ok_or_else(|| missing_time(&label, "start"))?;
        let end = self.end.resolve(zone).ok_or_else(|| missing_time(&label, "end"))?;

        let reminders = match self.reminders {
            Some(r) if !r.use_default => r
                .overrides
                .into_iter()
                .filter_map(|o| {
                    let method = o.method.parse::<ReminderMethod>().ok()?;
                    Some(Reminder { method, minutes: o.minutes })
                })
                .collect(),
            _ => Vec::new(),
        };
        let properties = self.extended_properties.unwrap_or_default();

        Ok(RemoteEvent {
            id: self.id,
            summary: self.summary.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            status: self
                .status
                .and_then(|s| s.parse::<EventStatus>().ok())
                .unwrap_or_default(),
            start,
            end,
            attendees: self
                .attendees
                .into_iter()
                .map(|a| Attendee {
                    display_name: a.display_name.unwrap_or_default(),
                    email: a.email,
                    organizer: a.organizer,
                    response_status: a.response_status.unwrap_or_default(),
                    comment: a.comment.filter(|c| !c.trim().is_empty()),
                })
                .collect(),
            reminders,
            guests_can_modify: self.guests_can_modify.unwrap_or(false),
            guests_can_invite_others: self.guests_can_invite_others.unwrap_or(true),
            private_properties: properties.private,
            shared_properties: properties.shared,
        })
    }
}

impl EventTime {
    fn is_set(&self) -> bool {
        self.date_time.is_some() || self.date.is_some()
    }

    fn resolve(&self, zone: Tz) -> Option<DateTime<Utc>> {
        match (self.date_time, self.date) {
            (Some(at), _) => Some(at.with_timezone(&Utc)),
            (None, Some(day)) => Some(local_to_utc(day.and_time(chrono::NaiveTime::MIN), zone)),
            (None, None) => None,
        }
    }
}

fn missing_time(event: &str, which: &str) -> EventSyncError {
    EventSyncError::Internal(format!("provider event {event} has no {which} time"))
}
