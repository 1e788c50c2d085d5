//! Credentials for remote calendar access.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::calendar::DeploymentTag;
use crate::constants::{CALENDAR_SCOPE, CALENDAR_SERVICE};

/// Cache key of a credential: organisation, deployment, service and the
/// privilege set it grants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CredentialKey {
    pub organisation: String,
    pub environment: DeploymentTag,
    pub service: String,
    pub privileges: Vec<String>,
}

impl CredentialKey {
    /// Key for calendar write access, the only privilege set the engine uses.
    pub fn calendar(organisation: impl Into<String>, environment: DeploymentTag) -> Self {
        Self {
            organisation: organisation.into(),
            environment,
            service: CALENDAR_SERVICE.to_string(),
            privileges: vec![CALENDAR_SCOPE.to_string()],
        }
    }

    /// Space-separated scope string for token requests.
    pub fn scope(&self) -> String {
        self.privileges.join(" ")
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}_{}", self.organisation, self.environment, self.service, self.scope())
    }
}

/// Organisation-scoped secret material read from the credential source.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceAccountSecret {
    pub account_email: String,
    pub private_key_pem: String,
}

impl fmt::Debug for ServiceAccountSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountSecret")
            .field("account_email", &self.account_email)
            .field("private_key_pem", &"[redacted]")
            .finish()
    }
}

/// An access token obtained by the authorization handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub account: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Whether the token is expired, or will be within `margin`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        self.expires_at.is_some_and(|at| at - margin <= now)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[redacted]")
            .field("account", &self.account)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
