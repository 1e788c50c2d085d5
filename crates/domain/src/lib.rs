//! # EventSync Domain
//!
//! Business domain types for the calendar reconciliation engine.
//!
//! This crate contains:
//! - Activities, event calendars and remote events
//! - Inbound request messages and the validated synchronization request
//! - Domain error type and Result definition
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - Depends only on `eventsync-common` and external crates
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
