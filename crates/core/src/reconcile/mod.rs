//! Reconciliation engine: correlate, convert, apply.

pub mod apply;
pub mod converter;
pub mod differ;

pub use apply::{ApplyEngine, ApplyReport};
pub use converter::{content_equals, EventConverter};
pub use differ::{reconcile, Reconciliation, UpdatePair};
