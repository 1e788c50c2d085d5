//! Decoding and validation of inbound synchronization requests.

use chrono::NaiveDate;
use eventsync_common::validation::{FieldValidator, ValidationResult};
use eventsync_domain::constants::{
    PROP_ACTIVE_MEMBERSHIP_ALIAS, PROP_ACTIVE_MEMBERSHIP_ID, PROP_CALENDAR_IDENTIFIER,
    PROP_END_TIME, PROP_ORGANISATION_NAME, PROP_START_TIME,
};
use eventsync_domain::{InboundMessage, PropertyValue, SyncWindow, SynchronizationRequest};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

/// Decode the message properties into a request, reporting every missing or
/// malformed property at once.
pub fn decode_request(message: &InboundMessage) -> ValidationResult<SynchronizationRequest> {
    let mut validator = FieldValidator::new();

    let text = |name: &str| message.property(name).map(PropertyValue::to_string);

    let organisation = text(PROP_ORGANISATION_NAME);
    let start = text(PROP_START_TIME);
    let end = text(PROP_END_TIME);
    let alias = text(PROP_ACTIVE_MEMBERSHIP_ALIAS);
    let calendar = text(PROP_CALENDAR_IDENTIFIER);

    let organisation = validator.require(PROP_ORGANISATION_NAME, organisation.as_deref());
    let start = validator.require(PROP_START_TIME, start.as_deref());
    let end = validator.require(PROP_END_TIME, end.as_deref());
    let alias = validator.require(PROP_ACTIVE_MEMBERSHIP_ALIAS, alias.as_deref());
    let calendar = validator.require(PROP_CALENDAR_IDENTIFIER, calendar.as_deref());

    let membership_id = match message.property(PROP_ACTIVE_MEMBERSHIP_ID) {
        None => {
            validator.reject(PROP_ACTIVE_MEMBERSHIP_ID, "is required");
            None
        }
        Some(value) => {
            let parsed = value.as_integer();
            if parsed.is_none() {
                validator.reject(PROP_ACTIVE_MEMBERSHIP_ID, format!("'{value}' is not an integer"));
            }
            parsed
        }
    };

    let start_date = start.and_then(|s| parse_date(&mut validator, PROP_START_TIME, s));
    let end_date = end.and_then(|s| parse_date(&mut validator, PROP_END_TIME, s));

    let window = match (start_date, end_date) {
        (Some(s), Some(e)) => match SyncWindow::new(s, e) {
            Ok(window) => Some(window),
            Err(_) => {
                validator.reject(PROP_END_TIME, format!("{e} precedes {PROP_START_TIME} {s}"));
                None
            }
        },
        _ => None,
    };

    match (organisation, window, calendar, alias, membership_id) {
        (Some(organisation), Some(window), Some(calendar), Some(alias), Some(membership_id))
            if !validator.has_errors() =>
        {
            Ok(SynchronizationRequest {
                organisation_name: organisation.to_string(),
                window,
                calendar_identifier: calendar.to_string(),
                active_membership_alias: alias.to_string(),
                active_membership_id: membership_id,
            })
        }
        _ => {
            validator.finish()?;
            // Every `None` above records an error, so `finish` has already
            // returned; this keeps the match exhaustive.
            Err(eventsync_common::validation::ValidationError::field(
                "request",
                "incomplete synchronization request",
            ))
        }
    }
}

fn parse_date(validator: &mut FieldValidator, field: &str, value: &str) -> Option<NaiveDate> {
    let parsed =
        DATE_FORMATS.iter().find_map(|format| NaiveDate::parse_from_str(value, format).ok());
    if parsed.is_none() {
        validator.reject(field, format!("'{value}' is not a date (YYYY-MM-DD or YYYYMMDD)"));
    }
    parsed
}
