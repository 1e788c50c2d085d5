//! Service-account secrets on disk and the JWT-bearer token exchange.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use eventsync_core::calendar_ports::{Authorizer, CredentialSource};
use eventsync_domain::constants::{SERVICE_ACCOUNT_EMAIL_FILE, SERVICE_ACCOUNT_KEY_FILE};
use eventsync_domain::{Credential, CredentialKey, EventSyncError, Result, ServiceAccountSecret};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::InfraError;
use crate::http::{error_for_status, HttpClient};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3_600);

/// Reads `<root>/<organisation>/<service>/serviceAccountEmail.txt` and
/// `serviceKey.pem`.
#[derive(Debug, Clone)]
pub struct ServiceAccountCredentialSource {
    root: PathBuf,
}

impl ServiceAccountCredentialSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn directory(&self, organisation: &str, service: &str) -> Result<PathBuf> {
        let organisation_path = Path::new(organisation);
        let single_component = matches!(
            organisation_path.components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        );
        if organisation.trim().is_empty() || !single_component {
            return Err(EventSyncError::Auth(format!(
                "organisation name '{organisation}' cannot name a credential directory"
            )));
        }
        Ok(self.root.join(organisation).join(service))
    }
}

#[async_trait]
impl CredentialSource for ServiceAccountCredentialSource {
    async fn lookup(&self, organisation: &str, service: &str) -> Result<ServiceAccountSecret> {
        let dir = self.directory(organisation, service)?;
        let account_email = read_secret(&dir.join(SERVICE_ACCOUNT_EMAIL_FILE), organisation).await?;
        let private_key_pem = read_secret(&dir.join(SERVICE_ACCOUNT_KEY_FILE), organisation).await?;

        Ok(ServiceAccountSecret { account_email: account_email.trim().to_string(), private_key_pem })
    }
}

async fn read_secret(path: &Path, organisation: &str) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if !content.trim().is_empty() => Ok(content),
        Ok(_) => Err(EventSyncError::Auth(format!(
            "empty credential file {} for '{organisation}'",
            path.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(EventSyncError::Auth(format!(
            "no credentials for '{organisation}': {} is missing",
            path.display()
        ))),
        Err(e) => Err(InfraError::from(e).into()),
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges a signed service-account assertion for an access token.
pub struct ServiceAccountAuthorizer {
    http: HttpClient,
    token_url: String,
    source: Arc<dyn CredentialSource>,
}

impl ServiceAccountAuthorizer {
    pub fn new(http: HttpClient, token_url: impl Into<String>, source: Arc<dyn CredentialSource>) -> Self {
        Self { http, token_url: token_url.into(), source }
    }

    fn sign_assertion(&self, key: &CredentialKey, secret: &ServiceAccountSecret) -> Result<String> {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(ASSERTION_LIFETIME.as_secs()).unwrap_or(3_600);
        let claims = AssertionClaims {
            iss: &secret.account_email,
            scope: key.scope(),
            aud: &self.token_url,
            iat: now,
            exp: now + lifetime,
        };

        let signing_key = EncodingKey::from_rsa_pem(secret.private_key_pem.as_bytes())
            .map_err(|e| EventSyncError::from(InfraError::from(e)))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| InfraError::from(e).into())
    }
}

#[async_trait]
impl Authorizer for ServiceAccountAuthorizer {
    #[instrument(skip_all, fields(organisation = %key.organisation, environment = %key.environment))]
    async fn authorize(&self, key: &CredentialKey) -> Result<Credential> {
        let secret = self.source.lookup(&key.organisation, &key.service).await?;
        let assertion = self.sign_assertion(key, &secret)?;

        let request = self
            .http
            .request(Method::POST, self.token_url.as_str())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())]);
        let response = error_for_status(self.http.send(request).await?).await.map_err(|e| {
            if e.is_transient() {
                e
            } else {
                EventSyncError::Auth(format!("token exchange rejected for {}: {e}", key.organisation))
            }
        })?;
        let token: TokenResponse =
            response.json().await.map_err(|e| EventSyncError::from(InfraError::from(e)))?;

        let expires_at = token.expires_in.map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        debug!(account = %secret.account_email, ?expires_at, "access token issued");

        Ok(Credential { access_token: token.access_token, account: secret.account_email, expires_at })
    }
}
