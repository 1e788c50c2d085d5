//! Background request processing
//!
//! The worker pool follows explicit lifecycle management: join handles are
//! tracked, cancellation goes through a `CancellationToken` and shutdown is
//! bounded by a timeout.

mod errors;
pub mod worker;

pub use errors::WorkerError;
pub use worker::{SyncWorkerPool, WorkerPoolConfig};
