//! External service integrations

pub mod google;

pub use google::{
    CredentialCache, GoogleCalendarClient, GoogleCalendarProvider, ServiceAccountAuthorizer,
    ServiceAccountCredentialSource,
};
