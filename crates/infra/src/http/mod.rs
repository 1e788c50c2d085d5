//! Outbound HTTP plumbing

pub mod client;

pub use client::{error_for_status, HttpClient, HttpClientBuilder};
