//! Inbound requests as they arrive on the request channel, and the validated
//! form the engine works with.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::window::SyncWindow;

/// A typed message property. Properties survive the round trip to the
/// failure channel unchanged, so the original type is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Text(String),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; textual integers are accepted as well.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Boolean(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

pub type MessageProperties = BTreeMap<String, PropertyValue>;

/// A message taken from the request channel: opaque body plus properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub body: String,
    pub properties: MessageProperties,
    pub received_at: DateTime<Utc>,
    /// How many times this message has been handed to a worker.
    #[serde(default)]
    pub delivery_count: u32,
}

impl InboundMessage {
    pub fn new(body: impl Into<String>, properties: MessageProperties) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            body: body.into(),
            properties,
            received_at: Utc::now(),
            delivery_count: 0,
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// A request parked on the failure channel, kept verbatim next to the
/// failure that stopped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub message: InboundMessage,
    /// Stable failure label, e.g. `validation` or `partial_failure`.
    pub failure_kind: String,
    pub failure_reason: String,
    pub failed_at: DateTime<Utc>,
}

/// A validated synchronization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynchronizationRequest {
    pub organisation_name: String,
    pub window: SyncWindow,
    pub calendar_identifier: String,
    pub active_membership_alias: String,
    pub active_membership_id: i64,
}
