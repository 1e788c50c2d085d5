//! Request channel and failure channel implementations

pub mod memory;

pub use memory::{InMemoryFailureChannel, InMemoryRequestQueue};
