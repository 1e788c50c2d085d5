//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Environment variables, when every required one is set
//! 2. Otherwise the first config file found by [`probe_config_paths`]
//! 3. JSON and TOML are both accepted (by file extension)
//!
//! ## Environment Variables
//! Required:
//! - `EVENTSYNC_DB_PATH`: SQLite database file
//! - `EVENTSYNC_DEPLOYMENT`: deployment tag (e.g. `Production`)
//! - `EVENTSYNC_CREDENTIALS_DIR`: root of the per-organisation secrets
//!
//! Optional (defaults as in [`Config`]):
//! - `EVENTSYNC_DB_POOL_SIZE`, `EVENTSYNC_DB_BUSY_TIMEOUT`
//! - `EVENTSYNC_WORKERS`, `EVENTSYNC_POLL_INTERVAL`, `EVENTSYNC_LEASE`,
//!   `EVENTSYNC_READ_TIMEOUT`, `EVENTSYNC_WRITE_TIMEOUT`,
//!   `EVENTSYNC_WRITE_CONCURRENCY`, `EVENTSYNC_SHUTDOWN_TIMEOUT`
//! - `EVENTSYNC_BOUNDARY_POLICY`, `EVENTSYNC_API_BASE_URL`,
//!   `EVENTSYNC_TOKEN_URL`, `EVENTSYNC_CREDENTIAL_TTL`,
//!   `EVENTSYNC_REQUEST_TIMEOUT`, `EVENTSYNC_TIME_ZONE`
//! - `EVENTSYNC_LOG_LEVEL`, `EVENTSYNC_LOG_FORMAT`
//!
//! Durations use the human form (`"30s"`, `"5m"`).
//!
//! ## File Locations
//! `eventsync.{toml,json}` then `config.{toml,json}`, in the working
//! directory, its parent, and next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use eventsync_common::time::parse_duration;
use eventsync_domain::{
    CalendarConfig, Config, DatabaseConfig, DeploymentTag, EventSyncError, LoggingConfig, Result,
    WorkerConfig,
};
use tracing::{debug, info};

const FILE_NAMES: [&str; 4] = ["eventsync.toml", "eventsync.json", "config.toml", "config.json"];

/// Load configuration from the environment, falling back to a config file.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            debug!(error = %e, "environment incomplete, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `EVENTSYNC_*` variables. Fails if a required
/// variable is missing or any value is malformed.
pub fn load_from_env() -> Result<Config> {
    let mut database = DatabaseConfig::new(env_var("EVENTSYNC_DB_PATH")?);
    let deployment = DeploymentTag::new(env_var("EVENTSYNC_DEPLOYMENT")?)?;
    let mut calendar = CalendarConfig::new(deployment, env_var("EVENTSYNC_CREDENTIALS_DIR")?);
    let mut worker = WorkerConfig::default();
    let mut logging = LoggingConfig::default();

    override_parsed(&mut database.pool_size, "EVENTSYNC_DB_POOL_SIZE")?;
    override_duration(&mut database.busy_timeout, "EVENTSYNC_DB_BUSY_TIMEOUT")?;

    override_parsed(&mut worker.workers, "EVENTSYNC_WORKERS")?;
    override_duration(&mut worker.poll_interval, "EVENTSYNC_POLL_INTERVAL")?;
    override_duration(&mut worker.lease, "EVENTSYNC_LEASE")?;
    override_duration(&mut worker.read_timeout, "EVENTSYNC_READ_TIMEOUT")?;
    override_duration(&mut worker.write_timeout, "EVENTSYNC_WRITE_TIMEOUT")?;
    override_parsed(&mut worker.write_concurrency, "EVENTSYNC_WRITE_CONCURRENCY")?;
    override_duration(&mut worker.shutdown_timeout, "EVENTSYNC_SHUTDOWN_TIMEOUT")?;

    override_parsed(&mut calendar.boundary_policy, "EVENTSYNC_BOUNDARY_POLICY")?;
    override_parsed(&mut calendar.api_base_url, "EVENTSYNC_API_BASE_URL")?;
    override_parsed(&mut calendar.token_url, "EVENTSYNC_TOKEN_URL")?;
    override_duration(&mut calendar.request_timeout, "EVENTSYNC_REQUEST_TIMEOUT")?;
    override_parsed(&mut calendar.default_time_zone, "EVENTSYNC_TIME_ZONE")?;
    if let Some(raw) = optional_env("EVENTSYNC_CREDENTIAL_TTL") {
        calendar.credential_ttl = Some(duration("EVENTSYNC_CREDENTIAL_TTL", &raw)?);
    }

    override_parsed(&mut logging.level, "EVENTSYNC_LOG_LEVEL")?;
    override_parsed(&mut logging.format, "EVENTSYNC_LOG_FORMAT")?;

    Ok(Config { database, worker, calendar, logging })
}

/// Load configuration from `path`, or from the first probed location.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) if p.exists() => p,
        Some(p) => {
            return Err(EventSyncError::Config(format!("config file not found: {}", p.display())))
        }
        None => probe_config_paths().ok_or_else(|| {
            EventSyncError::Config("no config file found in any of the standard locations".into())
        })?,
    };

    info!(path = %config_path.display(), "loading configuration from file");
    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| EventSyncError::Config(format!("cannot read {}: {e}", config_path.display())))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| EventSyncError::Config(format!("invalid TOML in {}: {e}", path.display()))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| EventSyncError::Config(format!("invalid JSON in {}: {e}", path.display()))),
        other => Err(EventSyncError::Config(format!("unsupported config format: {other}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.join(".."));
        roots.insert(0, cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|candidate| candidate.exists())
}

fn env_var(key: &str) -> Result<String> {
    optional_env(key)
        .ok_or_else(|| EventSyncError::Config(format!("missing required environment variable: {key}")))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn override_parsed<T>(target: &mut T, key: &str) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = optional_env(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| EventSyncError::Config(format!("invalid {key} '{raw}': {e}")))?;
    }
    Ok(())
}

fn override_duration(target: &mut Duration, key: &str) -> Result<()> {
    if let Some(raw) = optional_env(key) {
        *target = duration(key, &raw)?;
    }
    Ok(())
}

fn duration(key: &str, raw: &str) -> Result<Duration> {
    parse_duration(raw).map_err(|e| EventSyncError::Config(format!("invalid {key} '{raw}': {e}")))
}
