//! Application context - wires the SQLite stores, the Google adapter and the
//! synchronization service into one place.

use std::sync::Arc;

use eventsync_core::sync::{ActivityRepository, OrganisationRepository};
use eventsync_core::{CalendarClientProvider, RequestConsumer, SyncService, SyncSettings};
use eventsync_domain::{Config, Result};
use eventsync_infra::{
    CredentialCache, DbManager, GoogleCalendarProvider, HttpClient, ServiceAccountAuthorizer,
    ServiceAccountCredentialSource, SqliteActivityRepository, SqliteFailureChannel,
    SqliteOrganisationRepository, SqliteRequestQueue, SyncWorkerPool, WorkerPoolConfig,
};
use tracing::info;

/// Holds every long-lived component of the worker process.
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub inbox: Arc<SqliteRequestQueue>,
    pub dead_letters: Arc<SqliteFailureChannel>,
    pub credentials: Arc<CredentialCache>,
    pub consumer: Arc<RequestConsumer>,
}

impl AppContext {
    /// Open the database, apply the schema and build the request pipeline.
    pub fn new(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database)?);
        db.run_migrations()?;

        let organisations: Arc<dyn OrganisationRepository> =
            Arc::new(SqliteOrganisationRepository::new(Arc::clone(&db)));
        let activities: Arc<dyn ActivityRepository> =
            Arc::new(SqliteActivityRepository::new(Arc::clone(&db)));
        let inbox = Arc::new(SqliteRequestQueue::new(Arc::clone(&db)));
        let dead_letters = Arc::new(SqliteFailureChannel::new(Arc::clone(&db)));

        let calendar = &config.calendar;
        let http = HttpClient::builder().timeout(calendar.request_timeout).build()?;
        let source = Arc::new(ServiceAccountCredentialSource::new(&calendar.credentials_dir));
        let authorizer =
            Arc::new(ServiceAccountAuthorizer::new(http.clone(), &calendar.token_url, source));
        let credentials = Arc::new(CredentialCache::new(
            authorizer,
            calendar.deployment.clone(),
            http,
            calendar.credential_ttl,
        ));
        let provider: Arc<dyn CalendarClientProvider> = Arc::new(GoogleCalendarProvider::new(
            Arc::clone(&credentials),
            &calendar.api_base_url,
            calendar.default_time_zone,
        ));

        let settings = SyncSettings {
            deployment: calendar.deployment.clone(),
            boundary_policy: calendar.boundary_policy,
            read_timeout: config.worker.read_timeout,
            write_timeout: config.worker.write_timeout,
            write_concurrency: config.worker.write_concurrency.max(1),
        };
        let service = Arc::new(SyncService::new(organisations, activities, provider, settings));
        let consumer = Arc::new(RequestConsumer::new(service, dead_letters.clone()));

        info!(
            db_path = %db.path().display(),
            deployment = %calendar.deployment,
            boundary_policy = %calendar.boundary_policy,
            "application context ready"
        );

        Ok(Self { config, db, inbox, dead_letters, credentials, consumer })
    }

    /// A stopped worker pool draining the inbox.
    pub fn worker_pool(&self) -> SyncWorkerPool {
        SyncWorkerPool::new(
            self.inbox.clone(),
            Arc::clone(&self.consumer),
            WorkerPoolConfig::from(&self.config.worker),
        )
    }
}
