// Application settings

use crate::{ConfigError, EnvLoader, Result};
use daybook_core::logging::{LogFormat, LogLevel};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Settings the server reads at startup.
///
/// | Variable | Default |
/// |---|---|
/// | `SERVER_ADDR` | `localhost:8080` |
/// | `SESSION_LIFETIME_SECS` | `43200` (12 hours) |
/// | `COOKIE_SECURE` | `true` |
/// | `STATIC_DIR` | `./ui/static` |
/// | `LOG_LEVEL` | `info` |
/// | `LOG_FORMAT` | `pretty` |
/// | `BCRYPT_COST` | `12` |
/// | `REDIS_URL` | unset (sessions kept in memory) |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server_addr: String,
    pub session_lifetime: Duration,
    /// Send the session cookie over HTTPS only
    pub cookie_secure: bool,
    pub static_dir: PathBuf,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    pub bcrypt_cost: u32,
    pub redis_url: Option<String>,
}

impl AppConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_map(&EnvLoader::default().load()?)
    }

    /// Read settings from a map keyed by lowercase variable name, as returned
    /// by [`EnvLoader::load`].
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            server_addr: vars
                .get("server_addr")
                .cloned()
                .unwrap_or(defaults.server_addr),
            session_lifetime: parse_or(vars, "session_lifetime_secs", None)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_lifetime),
            cookie_secure: parse_or(vars, "cookie_secure", Some(defaults.cookie_secure))?
                .unwrap_or(defaults.cookie_secure),
            static_dir: vars
                .get("static_dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            log_level: parse_or(vars, "log_level", Some(defaults.log_level))?
                .unwrap_or(defaults.log_level),
            log_format: parse_or(vars, "log_format", Some(defaults.log_format))?
                .unwrap_or(defaults.log_format),
            bcrypt_cost: parse_or(vars, "bcrypt_cost", Some(defaults.bcrypt_cost))?
                .unwrap_or(defaults.bcrypt_cost),
            redis_url: vars
                .get("redis_url")
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check ranges the types cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.server_addr.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "SERVER_ADDR must not be empty".to_string(),
            ));
        }
        if self.session_lifetime.is_zero() {
            return Err(ConfigError::ValidationError(
                "SESSION_LIFETIME_SECS must be positive".to_string(),
            ));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::ValidationError(format!(
                "BCRYPT_COST must be between 4 and 31, got {}",
                self.bcrypt_cost
            )));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: "localhost:8080".to_string(),
            session_lifetime: Duration::from_secs(12 * 60 * 60),
            cookie_secure: true,
            static_dir: PathBuf::from("./ui/static"),
            log_level: LogLevel::Info,
            log_format: LogFormat::Pretty,
            bcrypt_cost: 12,
            redis_url: None,
        }
    }
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &str, default: Option<T>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(key).map(|raw| raw.trim()) {
        None | Some("") => Ok(default),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
            ConfigError::ParseError(format!("{}={:?}: {}", key.to_uppercase(), raw, e))
        }),
    }
}
