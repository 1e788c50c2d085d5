//! Shared test helpers for `eventsync-core` integration tests.
//!
//! Fixtures for activities and requests plus in-memory implementations of
//! every port the engine talks to.

#![allow(dead_code)]

pub mod fixtures;
pub mod harness;
pub mod mocks;
