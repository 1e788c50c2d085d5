//! Domain types and models

pub mod activity;
pub mod calendar;
pub mod correlation;
pub mod credential;
pub mod event;
pub mod message;
pub mod window;

pub use activity::{format_minor_units, Activity, Admission, Location};
pub use calendar::{DeploymentTag, EventCalendar, Organisation};
pub use correlation::CorrelationKey;
pub use credential::{Credential, CredentialKey, ServiceAccountSecret};
pub use event::{Attendee, EventStatus, Reminder, ReminderMethod, RemoteEvent};
pub use message::{DeadLetter, InboundMessage, MessageProperties, PropertyValue, SynchronizationRequest};
pub use window::{local_to_utc, SyncWindow, WindowBoundaryPolicy};
