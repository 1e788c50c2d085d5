//! Configuration structures
//!
//! Loaded by `eventsync_infra::config`. Durations are written as human
//! strings (`"30s"`, `"2m"`).

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use eventsync_common::time::serde_duration;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TIME_ZONE;
use crate::impl_domain_status_conversions;
use crate::types::{DeploymentTag, WindowBoundaryPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_busy_timeout", with = "serde_duration")]
    pub busy_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent request workers.
    pub workers: usize,
    /// Sleep between polls of an empty request inbox.
    #[serde(with = "serde_duration")]
    pub poll_interval: Duration,
    /// How long a claimed request stays invisible to other workers.
    #[serde(with = "serde_duration")]
    pub lease: Duration,
    /// Upper bound for each local or remote read.
    #[serde(with = "serde_duration")]
    pub read_timeout: Duration,
    /// Upper bound for each remote create, update or delete.
    #[serde(with = "serde_duration")]
    pub write_timeout: Duration,
    /// Remote writes in flight per request.
    pub write_concurrency: usize,
    /// Grace period for in-flight requests at shutdown.
    #[serde(with = "serde_duration")]
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval: Duration::from_secs(1),
            lease: Duration::from_secs(300),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(15),
            write_concurrency: 4,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Deployment this process serves; scopes calendars and credentials.
    pub deployment: DeploymentTag,
    /// Root of `<organisation>/google/calendar/` secret directories.
    pub credentials_dir: PathBuf,
    #[serde(default)]
    pub boundary_policy: WindowBoundaryPolicy,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Optional lifetime for cached credentials; `None` keeps them until the
    /// token itself expires or the organisation is invalidated.
    #[serde(default, with = "serde_duration::option")]
    pub credential_ttl: Option<Duration>,
    #[serde(default = "default_request_timeout", with = "serde_duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_time_zone")]
    pub default_time_zone: Tz,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl_domain_status_conversions!(LogFormat {
    Pretty => "pretty",
    Json => "json",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

fn default_pool_size() -> u32 {
    8
}

fn default_busy_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_time_zone() -> Tz {
    DEFAULT_TIME_ZONE
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), pool_size: default_pool_size(), busy_timeout: default_busy_timeout() }
    }
}

impl CalendarConfig {
    pub fn new(deployment: DeploymentTag, credentials_dir: impl Into<PathBuf>) -> Self {
        Self {
            deployment,
            credentials_dir: credentials_dir.into(),
            boundary_policy: WindowBoundaryPolicy::default(),
            api_base_url: default_api_base_url(),
            token_url: default_token_url(),
            credential_ttl: None,
            request_timeout: default_request_timeout(),
            default_time_zone: default_time_zone(),
        }
    }
}
