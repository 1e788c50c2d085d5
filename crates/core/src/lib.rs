//! # EventSync Core
//!
//! Reconciliation of local activities with remote calendars.
//!
//! This crate contains:
//! - The event converter and the three-way reconciliation
//! - The apply engine for remote writes
//! - Request decoding, the synchronization service and failure routing
//! - Port interfaces (traits) for storage, queues and the calendar provider
//!
//! ## Architecture Principles
//! - Only depends on `eventsync-common` and `eventsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod calendar_ports;
pub mod reconcile;
pub mod sync;

pub use calendar_ports::{Authorizer, CalendarClientProvider, CredentialSource, RemoteCalendar};
pub use reconcile::{reconcile, ApplyEngine, ApplyReport, EventConverter, Reconciliation};
pub use sync::{
    decode_request, ActivityRepository, FailureChannel, OrganisationRepository, ProcessOutcome,
    RequestConsumer, RequestQueue, SyncFailure, SyncReport, SyncService, SyncSettings,
};
