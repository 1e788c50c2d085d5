//! Request processing: decoding, synchronization and failure routing.

pub mod consumer;
pub mod errors;
pub mod ports;
pub mod request;
pub mod service;

pub use consumer::{ProcessOutcome, RequestConsumer};
pub use errors::{FailedOperation, OperationKind, PartialFailure, SyncFailure};
pub use ports::{ActivityRepository, FailureChannel, OrganisationRepository, RequestQueue};
pub use request::decode_request;
pub use service::{SyncReport, SyncService, SyncSettings};
