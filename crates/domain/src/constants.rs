//! Domain constants
//!
//! Message property names, provider conventions and defaults shared by the
//! engine and its adapters.

// Inbound request properties
pub const PROP_ORGANISATION_NAME: &str = "organisation_name";
pub const PROP_START_TIME: &str = "start_time";
pub const PROP_END_TIME: &str = "end_time";
pub const PROP_ACTIVE_MEMBERSHIP_ALIAS: &str = "active_membership_alias";
pub const PROP_ACTIVE_MEMBERSHIP_ID: &str = "active_membership_id";
pub const PROP_CALENDAR_IDENTIFIER: &str = "calendar_identifier";

// Remote event extended properties
pub const EXT_ACTIVITY_ID: &str = "activityId";
pub const EXT_COST: &str = "cost";
pub const EXT_CURRENCY: &str = "currency";
pub const EXT_LATE_ADMISSION_COST: &str = "lateAdmissionCost";
pub const EXT_DRESS_CODE: &str = "Dresscode";

// Credential scope
pub const CALENDAR_SERVICE: &str = "google/calendar";
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const SERVICE_ACCOUNT_EMAIL_FILE: &str = "serviceAccountEmail.txt";
pub const SERVICE_ACCOUNT_KEY_FILE: &str = "serviceKey.pem";

// Reminders
pub const POPUP_REMINDER_MINUTES: i64 = 120;
pub const EMAIL_REMINDER_HOUR: u32 = 9;
pub const EMAIL_REMINDER_MINUTE: u32 = 30;
/// Largest reminder offset the provider accepts (four weeks).
pub const MAX_REMINDER_MINUTES: i64 = 40_320;

pub const DEFAULT_TIME_ZONE: chrono_tz::Tz = chrono_tz::Europe::Stockholm;
pub const DEFAULT_CURRENCY: &str = "SEK";
