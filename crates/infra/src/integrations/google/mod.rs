//! Google Calendar adapter: wire format, REST client, service-account
//! authorization and the credential cache.

pub mod client;
pub mod credential_cache;
pub mod credentials;
mod wire;

pub use client::GoogleCalendarClient;
pub use credential_cache::{CredentialCache, GoogleCalendarProvider};
pub use credentials::{ServiceAccountAuthorizer, ServiceAccountCredentialSource};
