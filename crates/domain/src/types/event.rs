//! Provider-side representation of a synchronized activity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::correlation::CorrelationKey;
use crate::constants::EXT_ACTIVITY_ID;
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

impl_domain_status_conversions!(EventStatus {
    Confirmed => "confirmed",
    Tentative => "tentative",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Popup,
    Email,
}

impl_domain_status_conversions!(ReminderMethod {
    Popup => "popup",
    Email => "email",
});

/// Reminder offset in minutes before the event starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub display_name: String,
    pub email: String,
    pub organizer: bool,
    pub response_status: String,
    pub comment: Option<String>,
}

/// An event as stored by the remote calendar provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEvent {
    /// Provider-assigned identifier; `None` until the event is created.
    pub id: Option<String>,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub status: EventStatus,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<Attendee>,
    pub reminders: Vec<Reminder>,
    pub guests_can_modify: bool,
    pub guests_can_invite_others: bool,
    pub private_properties: BTreeMap<String, String>,
    pub shared_properties: BTreeMap<String, String>,
}

impl RemoteEvent {
    /// The correlation key embedded by a previous synchronization, if any.
    /// Events without one are foreign to the engine.
    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        self.private_properties.get(EXT_ACTIVITY_ID).and_then(|v| CorrelationKey::from_property(v))
    }

    /// Identifier for logs: the provider id, or the key for unsaved events.
    pub fn describe(&self) -> String {
        match (&self.id, self.correlation_key()) {
            (Some(id), _) => id.clone(),
            (None, Some(key)) => format!("activity:{key}"),
            (None, None) => format!("unsaved:{}", self.summary),
        }
    }
}
