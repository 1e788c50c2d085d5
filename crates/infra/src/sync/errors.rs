//! Worker pool lifecycle errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("worker pool already running")]
    AlreadyRunning,

    #[error("worker pool not running")]
    NotRunning,

    #[error("{0} worker task(s) panicked")]
    Panicked(usize),

    #[error("{0} worker task(s) did not finish within the shutdown timeout")]
    ShutdownTimeout(usize),
}
