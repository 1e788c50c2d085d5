//! # EventSync Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - SQLite repositories, the durable request inbox and the dead-letter
//!   failure channel
//! - In-memory request and failure channels
//! - The Google Calendar adapter with service-account authorization and the
//!   credential cache
//! - The worker pool, configuration loading and logging setup
//!
//! ## Architecture
//! - Implements traits defined in `eventsync-core`
//! - Contains all I/O: SQLite, HTTP, filesystem, clocks

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod messaging;
pub mod observability;
pub mod sync;

pub use database::{
    DbManager, SqliteActivityRepository, SqliteFailureChannel, SqliteOrganisationRepository,
    SqliteRequestQueue,
};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::{
    CredentialCache, GoogleCalendarClient, GoogleCalendarProvider, ServiceAccountAuthorizer,
    ServiceAccountCredentialSource,
};
pub use messaging::{InMemoryFailureChannel, InMemoryRequestQueue};
pub use observability::init_tracing;
pub use sync::{SyncWorkerPool, WorkerError, WorkerPoolConfig};
