//! # EventSync Worker
//!
//! Process wiring for the calendar reconciliation worker.
//!
//! This crate contains:
//! - The application context (dependency injection)
//! - The `eventsync` binary: runs the worker pool until Ctrl-C and offers
//!   dead-letter operator commands
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires the hexagonal architecture; holds no domain logic

pub mod context;

pub use context::AppContext;
