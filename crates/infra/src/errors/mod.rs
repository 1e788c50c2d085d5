//! Infrastructure error conversions.

mod conversions;

pub(crate) use conversions::status_error;
pub use conversions::{map_join_error, InfraError};
