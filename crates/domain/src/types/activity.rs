//! Locally authoritative activities.
//!
//! Activity times are wall-clock times in the owning calendar's time zone;
//! conversion to instants happens when an activity is rendered for the remote
//! provider.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::correlation::CorrelationKey;
use crate::errors::{EventSyncError, Result};

/// A scheduled activity with admissions, location and responsible parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub organisation_id: i64,
    pub short_desc: String,
    pub full_desc: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub cancelled: bool,
    pub location: Location,
    pub address_short_description: String,
    pub address_category: String,
    /// Admission cost in minor currency units.
    pub cost: i64,
    /// Cost after `late_admission_date`, in minor currency units.
    pub late_admission_cost: i64,
    pub currency: String,
    pub late_admission_date: NaiveDate,
    pub last_admission_date: NaiveDate,
    pub dress_code: Option<String>,
    pub responsible_group: Option<String>,
    pub admissions: Vec<Admission>,
}

impl Activity {
    /// Correlation key derived from the stable identifier only.
    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey::new(self.id)
    }

    /// Check the structural invariants of a loaded activity.
    pub fn validate(&self) -> Result<()> {
        if self.start_time > self.end_time {
            return Err(EventSyncError::InvalidInput(format!(
                "activity {} starts ({}) after it ends ({})",
                self.id, self.start_time, self.end_time
            )));
        }
        Ok(())
    }

    pub fn has_late_admission_cost(&self) -> bool {
        self.late_admission_cost > 0
    }
}

/// Postal location of an activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub street: Option<String>,
    pub number: Option<String>,
    pub zip_code: String,
    pub city: String,
    pub country: String,
}

impl Location {
    /// Single-line form: `"<street> <number>, <zip> <city>, <country>"`.
    /// Missing or blank parts are left out together with their separators.
    pub fn single_line(&self) -> String {
        let street = join_non_blank(&[self.street.as_deref(), self.number.as_deref()], " ");
        let town = join_non_blank(&[Some(self.zip_code.as_str()), Some(self.city.as_str())], " ");
        join_non_blank(
            &[Some(street.as_str()), Some(town.as_str()), Some(self.country.as_str())],
            ", ",
        )
    }
}

fn join_non_blank(parts: &[Option<&str>], separator: &str) -> String {
    parts
        .iter()
        .filter_map(|p| p.map(str::trim))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// One admitted member of an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub alias: String,
    pub email_alias: String,
    /// Email domain of the admitted member's organisation.
    pub organisation_email_suffix: String,
    pub responsible: bool,
    pub note: Option<String>,
}

impl Admission {
    pub fn email(&self) -> String {
        format!("{}@{}", self.email_alias, self.organisation_email_suffix)
    }
}

/// Render an amount held in minor units: `"150"` or `"150.50"`.
pub fn format_minor_units(amount: i64) -> String {
    let major = amount / 100;
    let minor = (amount % 100).abs();
    if minor == 0 {
        major.to_string()
    } else if amount < 0 && major == 0 {
        format!("-0.{minor:02}")
    } else {
        format!("{major}.{minor:02}")
    }
}
