//! Environment configuration.
//!
//! This crate parses and applies the options that affect the storage and
//! temporal engine; options that only matter to an HTTP boundary layer
//! (ports, TLS, session secret, HTTP timeouts, rate limiting) are still
//! parsed into [`Config`] so boundary code sharing this struct has one
//! consistent source, but this crate never reads them itself.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Full environment configuration, mirroring the documented option table.
///
/// Serializable so a boundary layer can accept it as a JSON request body
/// (an admin-only "reconfigure" endpoint) or dump it for diagnostics,
/// independent of the `from_env` path this crate itself uses at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for `data/` (holding `entities.db`/`entities.db.wal`).
    /// Consumed by this crate. Env: `DATA_PATH`, default `./var`.
    pub data_path: PathBuf,

    /// Aggregation worker cadence. Consumed by this crate.
    /// Env: `METRICS_INTERVAL` seconds, default 30.
    pub metrics_interval: Duration,

    /// Retention pruning windows for raw/1-min/1-hour/1-day metric buckets.
    /// Consumed by this crate. Env: `METRICS_RETENTION_{RAW,1MIN,1HOUR,1DAY}`
    /// minutes, defaults 1440 / 10080 / 43200 / 525600.
    pub metrics_retention: RetentionWindows,

    /// Enables batched durability / reduced safety checks. Consumed by this
    /// crate. Env: `HIGH_PERFORMANCE`, default off.
    pub high_performance: bool,

    /// Log level for the `tracing` subscriber. Consumed by this crate.
    /// Env: `LOG_LEVEL`, default `info`.
    pub log_level: String,

    /// Inert fields read only by a boundary layer (HTTP ports, TLS, session
    /// secret, timeouts, rate limiting); parsed here but never acted on.
    pub boundary: BoundaryConfig,
}

/// Retention pruning windows, one per aggregation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionWindows {
    /// Raw sample retention, in minutes. Default 1440 (1 day).
    pub raw_minutes: u64,
    /// 1-minute bucket retention, in minutes. Default 10080 (7 days).
    pub one_min_minutes: u64,
    /// 1-hour bucket retention, in minutes. Default 43200 (30 days).
    pub one_hour_minutes: u64,
    /// 1-day bucket retention, in minutes. Default 525600 (365 days).
    pub one_day_minutes: u64,
}

impl Default for RetentionWindows {
    fn default() -> Self {
        Self {
            raw_minutes: 1440,
            one_min_minutes: 10080,
            one_hour_minutes: 43200,
            one_day_minutes: 525600,
        }
    }
}

/// Options consumed only by a boundary layer outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// `PORT`, default 8085.
    pub port: u16,
    /// `SSL_PORT`, default 8085.
    pub ssl_port: u16,
    /// `USE_SSL`, default off.
    pub use_ssl: bool,
    /// `SSL_CERT` path, if set.
    pub ssl_cert: Option<PathBuf>,
    /// `SSL_KEY` path, if set.
    pub ssl_key: Option<PathBuf>,
    /// `TOKEN_SECRET`; no safe default, must be overridden for real use.
    pub token_secret: Option<String>,
    /// `SESSION_TTL_HOURS`, default 2.
    pub session_ttl_hours: u64,
    /// `HTTP_READ_TIMEOUT` seconds, default 15.
    pub http_read_timeout: Duration,
    /// `HTTP_WRITE_TIMEOUT` seconds, default 15.
    pub http_write_timeout: Duration,
    /// `HTTP_IDLE_TIMEOUT` seconds, default 60.
    pub http_idle_timeout: Duration,
    /// `SHUTDOWN_TIMEOUT` seconds, default 30.
    pub shutdown_timeout: Duration,
    /// `ENABLE_RATE_LIMIT`, default off.
    pub enable_rate_limit: bool,
    /// `RATE_LIMIT_REQUESTS`, default 100.
    pub rate_limit_requests: u32,
    /// `RATE_LIMIT_WINDOW_MINUTES`, default 1.
    pub rate_limit_window_minutes: u64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            ssl_port: 8085,
            use_ssl: false,
            ssl_cert: None,
            ssl_key: None,
            token_secret: None,
            session_ttl_hours: 2,
            http_read_timeout: Duration::from_secs(15),
            http_write_timeout: Duration::from_secs(15),
            http_idle_timeout: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(30),
            enable_rate_limit: false,
            rate_limit_requests: 100,
            rate_limit_window_minutes: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./var"),
            metrics_interval: Duration::from_secs(30),
            metrics_retention: RetentionWindows::default(),
            high_performance: false,
            log_level: "info".to_string(),
            boundary: BoundaryConfig::default(),
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes"),
        Err(_) => default,
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Build a `Config` by reading environment variables, falling back to
    /// the documented defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_path: env::var("DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            metrics_interval: Duration::from_secs(env_parsed(
                "METRICS_INTERVAL",
                defaults.metrics_interval.as_secs(),
            )),
            metrics_retention: RetentionWindows {
                raw_minutes: env_parsed(
                    "METRICS_RETENTION_RAW",
                    defaults.metrics_retention.raw_minutes,
                ),
                one_min_minutes: env_parsed(
                    "METRICS_RETENTION_1MIN",
                    defaults.metrics_retention.one_min_minutes,
                ),
                one_hour_minutes: env_parsed(
                    "METRICS_RETENTION_1HOUR",
                    defaults.metrics_retention.one_hour_minutes,
                ),
                one_day_minutes: env_parsed(
                    "METRICS_RETENTION_1DAY",
                    defaults.metrics_retention.one_day_minutes,
                ),
            },
            high_performance: env_bool("HIGH_PERFORMANCE", defaults.high_performance),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            boundary: BoundaryConfig {
                port: env_parsed("PORT", defaults.boundary.port),
                ssl_port: env_parsed("SSL_PORT", defaults.boundary.ssl_port),
                use_ssl: env_bool("USE_SSL", defaults.boundary.use_ssl),
                ssl_cert: env::var("SSL_CERT").ok().map(PathBuf::from),
                ssl_key: env::var("SSL_KEY").ok().map(PathBuf::from),
                token_secret: env::var("TOKEN_SECRET").ok(),
                session_ttl_hours: env_parsed(
                    "SESSION_TTL_HOURS",
                    defaults.boundary.session_ttl_hours,
                ),
                http_read_timeout: Duration::from_secs(env_parsed(
                    "HTTP_READ_TIMEOUT",
                    defaults.boundary.http_read_timeout.as_secs(),
                )),
                http_write_timeout: Duration::from_secs(env_parsed(
                    "HTTP_WRITE_TIMEOUT",
                    defaults.boundary.http_write_timeout.as_secs(),
                )),
                http_idle_timeout: Duration::from_secs(env_parsed(
                    "HTTP_IDLE_TIMEOUT",
                    defaults.boundary.http_idle_timeout.as_secs(),
                )),
                shutdown_timeout: Duration::from_secs(env_parsed(
                    "SHUTDOWN_TIMEOUT",
                    defaults.boundary.shutdown_timeout.as_secs(),
                )),
                enable_rate_limit: env_bool(
                    "ENABLE_RATE_LIMIT",
                    defaults.boundary.enable_rate_limit,
                ),
                rate_limit_requests: env_parsed(
                    "RATE_LIMIT_REQUESTS",
                    defaults.boundary.rate_limit_requests,
                ),
                rate_limit_window_minutes: env_parsed(
                    "RATE_LIMIT_WINDOW_MINUTES",
                    defaults.boundary.rate_limit_window_minutes,
                ),
            },
        }
    }
}
