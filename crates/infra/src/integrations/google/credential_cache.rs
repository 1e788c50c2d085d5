//! Per-organisation credential memoization and the calendar client provider.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use eventsync_core::calendar_ports::{Authorizer, CalendarClientProvider, RemoteCalendar};
use eventsync_domain::{Credential, CredentialKey, DeploymentTag, EventSyncError, Result};
use moka::future::Cache;
use moka::Expiry;
use tracing::{debug, info, instrument};

use super::client::GoogleCalendarClient;
use crate::http::HttpClient;

/// Tokens are refreshed this long before the provider says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const MAX_CACHED_ORGANISATIONS: u64 = 1_024;

/// Entry lifetime: the configured TTL, capped by the token's own expiry.
struct CredentialExpiry {
    ttl: Option<Duration>,
}

impl Expiry<CredentialKey, Credential> for CredentialExpiry {
    fn expire_after_create(
        &self,
        _key: &CredentialKey,
        credential: &Credential,
        _created_at: Instant,
    ) -> Option<Duration> {
        let until_expiry = credential.expires_at.map(|at| {
            (at - Utc::now()).to_std().unwrap_or(Duration::ZERO).saturating_sub(EXPIRY_MARGIN)
        });
        match (self.ttl, until_expiry) {
            (Some(ttl), Some(left)) => Some(ttl.min(left)),
            (ttl, left) => ttl.or(left),
        }
    }
}

/// Memoizes credentials per organisation, deployment, service and privilege
/// set. Concurrent misses for the same key share one authorization handshake.
pub struct CredentialCache {
    credentials: Cache<CredentialKey, Credential>,
    authorizer: Arc<dyn Authorizer>,
    environment: DeploymentTag,
    transport: HttpClient,
}

impl CredentialCache {
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        environment: DeploymentTag,
        transport: HttpClient,
        ttl: Option<Duration>,
    ) -> Self {
        let credentials = Cache::builder()
            .max_capacity(MAX_CACHED_ORGANISATIONS)
            .expire_after(CredentialExpiry { ttl })
            .build();
        Self { credentials, authorizer, environment, transport }
    }

    pub fn environment(&self) -> &DeploymentTag {
        &self.environment
    }

    #[instrument(skip(self), fields(environment = %self.environment))]
    pub async fn get_credential(&self, organisation: &str) -> Result<Credential> {
        let key = self.key(organisation);
        let authorizer = Arc::clone(&self.authorizer);
        let lookup_key = key.clone();

        self.credentials
            .try_get_with(key, async move {
                debug!(key = %lookup_key, "authorizing");
                authorizer.authorize(&lookup_key).await
            })
            .await
            .map_err(|shared: Arc<EventSyncError>| (*shared).clone())
    }

    /// The HTTP transport authorized clients are built on.
    pub fn transport(&self) -> HttpClient {
        self.transport.clone()
    }

    /// Drop the cached credential of `organisation`, e.g. after its service
    /// account key was rotated.
    pub async fn invalidate(&self, organisation: &str) {
        self.credentials.invalidate(&self.key(organisation)).await;
        info!(organisation, environment = %self.environment, "credential invalidated");
    }

    fn key(&self, organisation: &str) -> CredentialKey {
        CredentialKey::calendar(organisation, self.environment.clone())
    }
}

/// Hands out [`GoogleCalendarClient`]s authorized through the cache.
pub struct GoogleCalendarProvider {
    cache: Arc<CredentialCache>,
    api_base_url: String,
    default_zone: Tz,
}

impl GoogleCalendarProvider {
    pub fn new(cache: Arc<CredentialCache>, api_base_url: impl Into<String>, default_zone: Tz) -> Self {
        Self { cache, api_base_url: api_base_url.into(), default_zone }
    }

    pub fn cache(&self) -> &Arc<CredentialCache> {
        &self.cache
    }
}

#[async_trait]
impl CalendarClientProvider for GoogleCalendarProvider {
    async fn calendar_for(&self, organisation: &str) -> Result<Arc<dyn RemoteCalendar>> {
        let credential = self.cache.get_credential(organisation).await?;
        let client = GoogleCalendarClient::new(
            self.cache.transport(),
            &self.api_base_url,
            credential,
            self.default_zone,
        )?;
        Ok(Arc::new(client))
    }
}
