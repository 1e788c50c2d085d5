use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable link between an activity and the remote event created for it.
///
/// Derived only from the activity identifier. The remote side carries it as
/// the decimal string stored under the private extended property
/// `activityId`; anything that does not parse as an integer is not a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(i64);

impl CorrelationKey {
    pub fn new(activity_id: i64) -> Self {
        Self(activity_id)
    }

    pub fn activity_id(&self) -> i64 {
        self.0
    }

    /// Parse the stored property value.
    pub fn from_property(value: &str) -> Option<Self> {
        value.trim().parse::<i64>().ok().map(Self)
    }

    pub fn to_property(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
