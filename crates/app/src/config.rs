//! Application configuration loaded from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

/// A configuration value that could not be used.
#[derive(Debug, Error)]
#[error("Invalid value for {var}: {value:?} ({reason})")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected \"pretty\" or \"json\", got {other:?}")),
        }
    }
}

/// Runtime configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset selects the
///   in-memory stores
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `METRICS_ADDR`: address of the Prometheus scrape listener; unset
///   disables the listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse(&var, "LOG_FORMAT")?.unwrap_or(defaults.log_format),
            database_url: var("DATABASE_URL"),
            max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            metrics_addr: parse(&var, "METRICS_ADDR")?,
        })
    }

    /// Returns true when events and records live in PostgreSQL.
    pub fn uses_database(&self) -> bool {
        self.database_url.is_some()
    }
}

fn parse<T>(
    lookup: impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e: T::Err| ConfigError {
                var,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            max_connections: 5,
            metrics_addr: None,
        }
    }
}
