//! Activity to remote event conversion.
//!
//! Pure functions of their inputs; the only context is the calendar's time
//! zone, which turns activity wall-clock times into instants.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use eventsync_domain::constants::{
    EMAIL_REMINDER_HOUR, EMAIL_REMINDER_MINUTE, EXT_ACTIVITY_ID, EXT_COST, EXT_CURRENCY,
    EXT_DRESS_CODE, EXT_LATE_ADMISSION_COST, MAX_REMINDER_MINUTES, POPUP_REMINDER_MINUTES,
};
use eventsync_domain::{
    format_minor_units, local_to_utc, Activity, Admission, Attendee, EventStatus, Reminder,
    ReminderMethod, RemoteEvent,
};

/// Private properties written from activity fields. Other private properties
/// on an existing event belong to someone else and are left alone.
const ACTIVITY_PRIVATE_PROPERTIES: [&str; 4] =
    [EXT_ACTIVITY_ID, EXT_COST, EXT_CURRENCY, EXT_LATE_ADMISSION_COST];

/// Converts activities into remote events for one calendar.
#[derive(Debug, Clone, Copy)]
pub struct EventConverter {
    zone: Tz,
}

impl EventConverter {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// A new remote event for `activity`, carrying its correlation key.
    pub fn to_remote_event(&self, activity: &Activity) -> RemoteEvent {
        let mut private_properties = BTreeMap::new();
        private_properties
            .insert(EXT_ACTIVITY_ID.to_string(), activity.correlation_key().to_property());
        private_properties.insert(EXT_COST.to_string(), format_minor_units(activity.cost));
        private_properties.insert(EXT_CURRENCY.to_string(), activity.currency.clone());
        private_properties.insert(
            EXT_LATE_ADMISSION_COST.to_string(),
            format_minor_units(activity.late_admission_cost),
        );

        let mut shared_properties = BTreeMap::new();
        if let Some(dress_code) = non_blank(activity.dress_code.as_deref()) {
            shared_properties.insert(EXT_DRESS_CODE.to_string(), dress_code.to_string());
        }

        RemoteEvent {
            id: None,
            summary: activity.short_desc.clone(),
            description: describe(activity),
            location: activity.location.single_line(),
            status: if activity.cancelled { EventStatus::Cancelled } else { EventStatus::Confirmed },
            start: local_to_utc(activity.start_time, self.zone),
            end: local_to_utc(activity.end_time, self.zone),
            attendees: activity.admissions.iter().map(attendee).collect(),
            reminders: reminders(activity),
            guests_can_modify: false,
            guests_can_invite_others: false,
            private_properties,
            shared_properties,
        }
    }

    /// `existing` with every activity-sourced field overwritten from
    /// `activity`. The provider identifier, the correlation key and
    /// properties written by others are preserved.
    pub fn apply_activity_to(&self, existing: &RemoteEvent, activity: &Activity) -> RemoteEvent {
        let fresh = self.to_remote_event(activity);
        let mut updated = existing.clone();

        updated.summary = fresh.summary;
        updated.description = fresh.description;
        updated.location = fresh.location;
        updated.status = fresh.status;
        updated.start = fresh.start;
        updated.end = fresh.end;
        updated.attendees = fresh.attendees;
        updated.reminders = fresh.reminders;
        updated.guests_can_modify = fresh.guests_can_modify;
        updated.guests_can_invite_others = fresh.guests_can_invite_others;

        for name in ACTIVITY_PRIVATE_PROPERTIES {
            if name == EXT_ACTIVITY_ID && updated.private_properties.contains_key(name) {
                continue;
            }
            match fresh.private_properties.get(name) {
                Some(value) => updated.private_properties.insert(name.to_string(), value.clone()),
                None => updated.private_properties.remove(name),
            };
        }
        match fresh.shared_properties.get(EXT_DRESS_CODE) {
            Some(value) => updated.shared_properties.insert(EXT_DRESS_CODE.to_string(), value.clone()),
            None => updated.shared_properties.remove(EXT_DRESS_CODE),
        };

        updated
    }

    /// Whether `existing` already shows everything `activity` would write.
    pub fn is_current(&self, existing: &RemoteEvent, activity: &Activity) -> bool {
        content_equals(existing, &self.apply_activity_to(existing, activity))
    }
}

/// Compare the activity-sourced content of two events. Attendees and
/// reminders compare as sets; a missing attendee comment equals an empty one.
pub fn content_equals(left: &RemoteEvent, right: &RemoteEvent) -> bool {
    left.summary == right.summary
        && left.description == right.description
        && left.location == right.location
        && left.status == right.status
        && left.start == right.start
        && left.end == right.end
        && left.guests_can_modify == right.guests_can_modify
        && left.guests_can_invite_others == right.guests_can_invite_others
        && attendee_set(left) == attendee_set(right)
        && reminder_set(left) == reminder_set(right)
        && activity_properties(left) == activity_properties(right)
        && left.shared_properties.get(EXT_DRESS_CODE) == right.shared_properties.get(EXT_DRESS_CODE)
}

type AttendeeView<'a> = (&'a str, &'a str, bool, &'a str, &'a str);

fn attendee_set(event: &RemoteEvent) -> BTreeSet<AttendeeView<'_>> {
    event
        .attendees
        .iter()
        .map(|a| {
            (
                a.email.as_str(),
                a.display_name.as_str(),
                a.organizer,
                a.response_status.as_str(),
                a.comment.as_deref().unwrap_or(""),
            )
        })
        .collect()
}

fn reminder_set(event: &RemoteEvent) -> BTreeSet<(&'static str, i64)> {
    event.reminders.iter().map(|r| (r.method.as_str(), r.minutes)).collect()
}

fn activity_properties(event: &RemoteEvent) -> Vec<Option<&String>> {
    ACTIVITY_PRIVATE_PROPERTIES.iter().map(|name| event.private_properties.get(*name)).collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Full description followed by place, dress code and cost lines.
fn describe(activity: &Activity) -> String {
    let mut text = format!(
        "{}\n\nPlats: {}  ({})",
        activity.full_desc, activity.address_short_description, activity.address_category
    );
    if let Some(dress_code) = non_blank(activity.dress_code.as_deref()) {
        text.push_str("\nDresscode: ");
        text.push_str(dress_code);
    }
    text.push_str("\nKostnad: ");
    text.push_str(&cost_line(activity));
    text
}

/// `"<cost> <currency>"`, extended with the late admission price when it
/// differs from the regular one.
pub fn cost_line(activity: &Activity) -> String {
    let currency = &activity.currency;
    let cost = activity.cost.max(0);
    let late = activity.late_admission_cost.max(0);

    let mut line = format!("{} {currency}", format_minor_units(cost));
    if late > 0 && late != cost {
        line.push_str(&format!(
            " till {}, därefter {} {currency}",
            activity.late_admission_date.format("%Y-%m-%d"),
            format_minor_units(late)
        ));
    }
    line
}

fn attendee(admission: &Admission) -> Attendee {
    Attendee {
        display_name: admission.alias.clone(),
        email: admission.email(),
        organizer: admission.responsible,
        response_status: "accepted".to_string(),
        comment: admission.note.clone().filter(|n| !n.trim().is_empty()),
    }
}

/// Popup two hours ahead, an email at 09:30 on the day, and another at 09:30
/// on the late admission date when a late admission cost applies.
fn reminders(activity: &Activity) -> Vec<Reminder> {
    let mut reminders = vec![Reminder { method: ReminderMethod::Popup, minutes: POPUP_REMINDER_MINUTES }];

    reminders.push(Reminder {
        method: ReminderMethod::Email,
        minutes: minutes_before(activity.start_time, activity.start_time.date()),
    });

    if activity.has_late_admission_cost() {
        reminders.push(Reminder {
            method: ReminderMethod::Email,
            minutes: minutes_before(activity.start_time, activity.late_admission_date),
        });
    }

    reminders
}

/// Minutes from 09:30 on `day` until `start`, clamped to what the provider
/// accepts.
fn minutes_before(start: NaiveDateTime, day: NaiveDate) -> i64 {
    let reminder_time =
        NaiveTime::from_hms_opt(EMAIL_REMINDER_HOUR, EMAIL_REMINDER_MINUTE, 0).unwrap_or(NaiveTime::MIN);
    let reminder_at = day.and_time(reminder_time);
    (start - reminder_at).num_minutes().clamp(0, MAX_REMINDER_MINUTES)
}
