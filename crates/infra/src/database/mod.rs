//! SQLite implementations of the storage and messaging ports

pub mod activity_repository;
pub mod dlq_repository;
pub mod inbox_repository;
pub mod manager;
pub mod organisation_repository;

pub use activity_repository::SqliteActivityRepository;
pub use dlq_repository::SqliteFailureChannel;
pub use inbox_repository::SqliteRequestQueue;
pub use manager::{DbManager, SqliteConnection};
pub use organisation_repository::SqliteOrganisationRepository;
