//! Organisations, their event calendars and the deployment tag that scopes
//! both.

use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TIME_ZONE;
use crate::errors::EventSyncError;

static DEPLOYMENT_TAG_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]+$").ok());

/// Name of the running deployment (e.g. `Production`, `Staging`).
///
/// A letter followed by at least one letter or digit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeploymentTag(String);

impl DeploymentTag {
    pub fn new(tag: impl Into<String>) -> Result<Self, EventSyncError> {
        let tag = tag.into();
        if DEPLOYMENT_TAG_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(&tag)) {
            Ok(Self(tag))
        } else {
            Err(EventSyncError::Config(format!(
                "invalid deployment tag '{tag}': expected a letter followed by letters or digits"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeploymentTag {
    type Err = EventSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl TryFrom<String> for DeploymentTag {
    type Error = EventSyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeploymentTag> for String {
    fn from(tag: DeploymentTag) -> Self {
        tag.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: i64,
    pub name: String,
    /// Domain used for member email aliases, e.g. `mithlond.se`.
    pub email_suffix: String,
}

/// A remote calendar bound to an organisation and a deployment.
///
/// `(organisation_id, calendar_identifier, environment)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCalendar {
    pub id: i64,
    pub organisation_id: i64,
    pub calendar_identifier: String,
    pub environment: DeploymentTag,
    pub short_desc: String,
    pub full_desc: String,
    /// Zone in which the organisation's activity times are expressed.
    #[serde(default = "default_time_zone")]
    pub time_zone: Tz,
}

fn default_time_zone() -> Tz {
    DEFAULT_TIME_ZONE
}
